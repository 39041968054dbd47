//! Ordered undo log enabling nested, frame-scoped rollback.
//!
//! Every mutation routed through the facade appends one entry carrying the
//! prior value it needs to undo itself. Snapshots are plain journal lengths;
//! reverting to a snapshot undoes every later entry in strict reverse order
//! and truncates. Entries never depend on entries appended after them, so a
//! revert aligned to any snapshot boundary is always well defined.

use crate::{access_list::AccessList, state_object::StateObject};
use alloy_primitives::{
    map::{HashMap, HashSet},
    Address, Bytes, Log, B256, U256,
};

/// Transient storage (EIP-1153), discarded at the end of every transaction.
pub type TransientStorage = HashMap<(Address, B256), U256>;

/// Opaque marker into the journal defining a revertible frame boundary.
///
/// Equal to the journal's entry count at the moment it was taken. Snapshots
/// nest arbitrarily; reverting to an outer snapshot implicitly discards all
/// inner ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot(pub(crate) usize);

/// Reversible mutation record.
///
/// Each variant carries exactly the prior value needed to undo itself plus
/// the address/key identifying what to restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// Action: balance overwritten.
    /// Revert: restore the previous balance.
    BalanceChange {
        /// Account whose balance changed.
        address: Address,
        /// Balance before the change.
        prev: U256,
    },
    /// Action: nonce overwritten.
    /// Revert: restore the previous nonce.
    NonceChange {
        /// Account whose nonce changed.
        address: Address,
        /// Nonce before the change.
        prev: u64,
    },
    /// Action: code and code hash overwritten.
    /// Revert: restore the previous bytecode.
    CodeChange {
        /// Account whose code changed.
        address: Address,
        /// Code hash before the change.
        prev_hash: B256,
        /// Code bytes before the change.
        prev_code: Bytes,
    },
    /// Action: dirty-overlay write of a storage slot.
    /// Revert: restore the previous overlay entry.
    StorageChange {
        /// Account whose storage changed.
        address: Address,
        /// Storage slot key.
        key: B256,
        /// Previous dirty-overlay entry; `None` means the slot was clean, in
        /// which case revert removes the overlay entry and reads fall back to
        /// the committed value.
        had_value: Option<U256>,
    },
    /// Action: account marked suicided, balance zeroed.
    /// Revert: restore the previous flag and balance.
    SuicideChange {
        /// Account that was marked.
        address: Address,
        /// Whether the account was already marked suicided.
        prev: bool,
        /// Balance before it was zeroed.
        prev_balance: U256,
    },
    /// Action: refund counter changed.
    /// Revert: restore the previous counter.
    RefundChange {
        /// Refund counter before the change.
        prev: u64,
    },
    /// Action: address marked warm in the access list.
    /// Revert: make the address cold again.
    AccessListAddAccount {
        /// Address that was warmed.
        address: Address,
    },
    /// Action: storage slot marked warm in the access list.
    /// Revert: make the slot cold again.
    AccessListAddSlot {
        /// Address of the warmed slot.
        address: Address,
        /// Key of the warmed slot.
        key: B256,
    },
    /// Action: state object constructed (first touch) or replaced (CREATE).
    /// Revert: drop the object, restoring the replaced one if any, so the
    /// address vanishes as if never read.
    AccountCreated {
        /// Address of the constructed object.
        address: Address,
        /// Object replaced by a CREATE-style reset; `None` means the address
        /// was untouched before.
        prev: Option<Box<StateObject>>,
    },
    /// Action: transient storage slot changed.
    /// Revert: restore the previous value.
    TransientStorageChange {
        /// Account whose transient storage changed.
        address: Address,
        /// Transient slot key.
        key: B256,
        /// Previous transient value.
        had_value: U256,
    },
    /// Action: log appended.
    /// Revert: pop the log.
    LogAdded,
}

impl JournalEntry {
    /// Applies the type-specific undo action against the owning state object
    /// or derived-state container.
    fn revert(
        self,
        objects: &mut HashMap<Address, StateObject>,
        logs: &mut Vec<Log>,
        refund: &mut u64,
        access_list: &mut AccessList,
        transient_storage: &mut TransientStorage,
    ) {
        match self {
            Self::BalanceChange { address, prev } => {
                objects
                    .get_mut(&address)
                    .expect("journaled account is loaded")
                    .set_balance(prev);
            }
            Self::NonceChange { address, prev } => {
                objects
                    .get_mut(&address)
                    .expect("journaled account is loaded")
                    .set_nonce(prev);
            }
            Self::CodeChange {
                address,
                prev_hash,
                prev_code,
            } => {
                objects
                    .get_mut(&address)
                    .expect("journaled account is loaded")
                    .set_code(prev_hash, prev_code);
            }
            Self::StorageChange {
                address,
                key,
                had_value,
            } => {
                objects
                    .get_mut(&address)
                    .expect("journaled account is loaded")
                    .revert_storage(key, had_value);
            }
            Self::SuicideChange {
                address,
                prev,
                prev_balance,
            } => {
                let object = objects
                    .get_mut(&address)
                    .expect("journaled account is loaded");
                object.set_suicided(prev);
                object.set_balance(prev_balance);
            }
            Self::RefundChange { prev } => {
                *refund = prev;
            }
            Self::AccessListAddAccount { address } => {
                access_list.remove_address(address);
            }
            Self::AccessListAddSlot { address, key } => {
                access_list.remove_slot(address, key);
            }
            Self::AccountCreated { address, prev } => match prev {
                Some(object) => {
                    objects.insert(address, *object);
                }
                None => {
                    objects.remove(&address);
                }
            },
            Self::TransientStorageChange {
                address,
                key,
                had_value,
            } => {
                if had_value.is_zero() {
                    transient_storage.remove(&(address, key));
                } else {
                    transient_storage.insert((address, key), had_value);
                }
            }
            Self::LogAdded => {
                logs.pop();
            }
        }
    }
}

/// The ordered log of reversible mutation records.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an undo record. Entries are opaque to all callers except the
    /// revert routine.
    #[inline]
    pub fn append(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Number of recorded entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the journal holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes a snapshot of the current journal length.
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.entries.len())
    }

    /// Addresses with at least one surviving account mutation. First-touch
    /// loads and derived-state entries do not count, so commit can skip
    /// objects that were only read. Reverted entries are drained from the
    /// journal and therefore never show up here.
    pub fn dirty_addresses(&self) -> HashSet<Address> {
        let mut addresses = HashSet::default();
        for entry in &self.entries {
            match entry {
                JournalEntry::BalanceChange { address, .. }
                | JournalEntry::NonceChange { address, .. }
                | JournalEntry::CodeChange { address, .. }
                | JournalEntry::StorageChange { address, .. }
                | JournalEntry::SuicideChange { address, .. }
                | JournalEntry::AccountCreated {
                    address,
                    prev: Some(_),
                } => {
                    addresses.insert(*address);
                }
                JournalEntry::AccountCreated { prev: None, .. }
                | JournalEntry::RefundChange { .. }
                | JournalEntry::AccessListAddAccount { .. }
                | JournalEntry::AccessListAddSlot { .. }
                | JournalEntry::TransientStorageChange { .. }
                | JournalEntry::LogAdded => {}
            }
        }
        addresses
    }

    /// Undoes every entry appended after `snapshot`, last-in first-out, then
    /// truncates the journal to the snapshot.
    ///
    /// A snapshot equal to the current length is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `snapshot` lies beyond the current journal length: the
    /// caller is reverting to a snapshot that was never taken or was already
    /// invalidated by an outer revert.
    pub fn revert_to(
        &mut self,
        snapshot: Snapshot,
        objects: &mut HashMap<Address, StateObject>,
        logs: &mut Vec<Log>,
        refund: &mut u64,
        access_list: &mut AccessList,
        transient_storage: &mut TransientStorage,
    ) {
        assert!(
            snapshot.0 <= self.entries.len(),
            "revert to snapshot {} beyond journal length {}",
            snapshot.0,
            self.entries.len()
        );
        for entry in self.entries.drain(snapshot.0..).rev() {
            entry.revert(objects, logs, refund, access_list, transient_storage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revert(journal: &mut Journal, snapshot: Snapshot) {
        let mut objects = HashMap::default();
        let mut logs = Vec::new();
        let mut refund = 0;
        let mut access_list = AccessList::new();
        let mut transient_storage = TransientStorage::default();
        journal.revert_to(
            snapshot,
            &mut objects,
            &mut logs,
            &mut refund,
            &mut access_list,
            &mut transient_storage,
        );
    }

    #[test]
    fn dirty_addresses_ignore_loads_and_derived_entries() {
        let mut journal = Journal::new();
        let loaded = Address::from([1; 20]);
        let mutated = Address::from([2; 20]);

        journal.append(JournalEntry::AccountCreated {
            address: loaded,
            prev: None,
        });
        journal.append(JournalEntry::AccessListAddAccount { address: loaded });
        journal.append(JournalEntry::LogAdded);
        journal.append(JournalEntry::NonceChange {
            address: mutated,
            prev: 0,
        });

        let dirty = journal.dirty_addresses();
        assert!(!dirty.contains(&loaded));
        assert!(dirty.contains(&mutated));
    }

    #[test]
    fn revert_to_current_length_is_noop() {
        let mut journal = Journal::new();
        journal.append(JournalEntry::RefundChange { prev: 0 });
        let snapshot = journal.snapshot();
        revert(&mut journal, snapshot);
        assert_eq!(journal.len(), 1);
    }

    #[test]
    #[should_panic(expected = "beyond journal length")]
    fn revert_past_journal_length_panics() {
        let mut journal = Journal::new();
        journal.append(JournalEntry::RefundChange { prev: 0 });
        let snapshot = journal.snapshot();
        let mut objects = HashMap::default();
        let mut logs = Vec::new();
        let mut refund = 0;
        let mut access_list = AccessList::new();
        let mut transient_storage = TransientStorage::default();
        // Truncate below the snapshot to fake an outer revert having already
        // invalidated it.
        journal.revert_to(
            Snapshot(0),
            &mut objects,
            &mut logs,
            &mut refund,
            &mut access_list,
            &mut transient_storage,
        );
        revert(&mut journal, snapshot);
    }
}
