//! The state database facade.

use crate::{
    access_list::AccessList,
    account::AccountRecord,
    backend::Backend,
    errors::StateError,
    journal::{Journal, JournalEntry, Snapshot, TransientStorage},
    state_object::StateObject,
    store::TxStateStore,
};
use alloy_primitives::{keccak256, map::HashMap, Address, Bytes, Log, B256, U256};
use statedb_kvstore::KvStore;

/// Single entry point the execution engine talks to.
///
/// Owns the set of live state objects, the journal, the persistent-store
/// adapters and the derived per-transaction state (logs, refund counter,
/// access list, transient storage). Every mutation appends its undo record to
/// the journal before it is applied, so reverting to any [`Snapshot`] restores
/// exactly the state touched after it.
///
/// One instance serves one top-level transaction: Fresh → Executing (nested
/// snapshots and reverts at any depth) → Committed ([`Self::commit`]) or
/// Discarded ([`Self::discard`]). Both outcomes consume the instance; a
/// discarded transaction leaves the persistent store untouched because all
/// writes are deferred to commit.
#[derive(Debug)]
pub struct StateDB<B, S> {
    backend: B,
    tx_store: TxStateStore<S>,
    objects: HashMap<Address, StateObject>,
    journal: Journal,
    logs: Vec<Log>,
    refund: u64,
    access_list: AccessList,
    transient_storage: TransientStorage,
}

impl<B: Backend, S: KvStore> StateDB<B, S> {
    /// Creates a fresh state database over the given backend and derived-state
    /// store adapter.
    pub fn new(backend: B, tx_store: TxStateStore<S>) -> Self {
        Self {
            backend,
            tx_store,
            objects: HashMap::default(),
            journal: Journal::new(),
            logs: Vec::new(),
            refund: 0,
            access_list: AccessList::new(),
            transient_storage: TransientStorage::default(),
        }
    }

    /// Ensures a live object exists for `address`, seeding it from the
    /// persistent store (default zero-value account if the store has no
    /// record). Construction is journaled so a revert makes the address
    /// vanish again as if never read.
    fn load_object(&mut self, address: Address) -> Result<(), StateError> {
        if self.objects.contains_key(&address) {
            return Ok(());
        }
        let account = self
            .backend
            .account(address)
            .map_err(StateError::store)?
            .unwrap_or_default();
        self.journal
            .append(JournalEntry::AccountCreated {
                address,
                prev: None,
            });
        self.objects.insert(address, StateObject::new(address, account));
        Ok(())
    }

    /// Returns the live object for `address`, constructing one on first
    /// touch.
    pub fn get_or_create_object(&mut self, address: Address) -> Result<&mut StateObject, StateError> {
        self.load_object(address)?;
        Ok(self.objects.get_mut(&address).expect("object loaded above"))
    }

    /// Returns whether an object for `address` is live in memory,
    /// independent of its emptiness.
    pub fn exist(&self, address: Address) -> bool {
        self.objects.contains_key(&address)
    }

    /// Returns whether the account is empty: zero nonce, zero balance and no
    /// code.
    pub fn empty(&mut self, address: Address) -> Result<bool, StateError> {
        Ok(self.get_or_create_object(address)?.empty())
    }

    /// Contract-creation reset: replaces the account with a fresh one that
    /// inherits the previous balance. The replaced object is journaled so a
    /// revert restores it wholesale.
    pub fn create_account(&mut self, address: Address) -> Result<(), StateError> {
        self.load_object(address)?;
        let prev = self
            .objects
            .insert(address, StateObject::new(address, AccountRecord::default()))
            .expect("object loaded above");
        let prev_balance = prev.balance();
        self.journal.append(JournalEntry::AccountCreated {
            address,
            prev: Some(Box::new(prev)),
        });
        if !prev_balance.is_zero() {
            self.set_balance(address, prev_balance);
        }
        Ok(())
    }

    // ---- account field access ------------------------------------------

    /// Current balance of the account.
    pub fn get_balance(&mut self, address: Address) -> Result<U256, StateError> {
        Ok(self.get_or_create_object(address)?.balance())
    }

    /// Current nonce of the account.
    pub fn get_nonce(&mut self, address: Address) -> Result<u64, StateError> {
        Ok(self.get_or_create_object(address)?.nonce())
    }

    /// Current code hash of the account.
    pub fn get_code_hash(&mut self, address: Address) -> Result<B256, StateError> {
        Ok(self.get_or_create_object(address)?.code_hash())
    }

    /// Bytecode of the account, empty for accounts without code.
    pub fn get_code(&mut self, address: Address) -> Result<Bytes, StateError> {
        self.load_object(address)?;
        let Self { objects, backend, .. } = self;
        objects
            .get_mut(&address)
            .expect("object loaded above")
            .code(backend)
    }

    /// Size of the account bytecode.
    pub fn get_code_size(&mut self, address: Address) -> Result<usize, StateError> {
        Ok(self.get_code(address)?.len())
    }

    /// Adds `amount` to the account balance. A zero amount is a no-op that
    /// must not generate a journal entry or touch an otherwise-empty account.
    pub fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.load_object(address)?;
        let balance = self
            .objects
            .get(&address)
            .expect("object loaded above")
            .balance();
        let new_balance = balance
            .checked_add(amount)
            .expect("balance addition overflows U256");
        self.set_balance(address, new_balance);
        Ok(())
    }

    /// Subtracts `amount` from the account balance. A zero amount is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the subtraction would take the balance below zero. Upstream
    /// gas and balance checks must make that impossible; wrapping silently
    /// would diverge state across replicas.
    pub fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.load_object(address)?;
        let balance = self
            .objects
            .get(&address)
            .expect("object loaded above")
            .balance();
        let new_balance = balance
            .checked_sub(amount)
            .expect("balance subtraction below zero");
        self.set_balance(address, new_balance);
        Ok(())
    }

    /// Journal-then-mutate balance write. The object must be loaded.
    fn set_balance(&mut self, address: Address, amount: U256) {
        let Self { objects, journal, .. } = self;
        let object = objects.get_mut(&address).expect("account is loaded");
        journal.append(JournalEntry::BalanceChange {
            address,
            prev: object.balance(),
        });
        object.set_balance(amount);
    }

    /// Sets the account nonce.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), StateError> {
        self.load_object(address)?;
        let Self { objects, journal, .. } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        journal.append(JournalEntry::NonceChange {
            address,
            prev: object.nonce(),
        });
        object.set_nonce(nonce);
        Ok(())
    }

    /// Sets the account bytecode, hashing it for the code hash. The previous
    /// code is loaded first so the journal entry can restore it.
    pub fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        self.load_object(address)?;
        let Self { objects, backend, journal, .. } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        let prev_hash = object.code_hash();
        let prev_code = object.code(backend)?;
        journal.append(JournalEntry::CodeChange {
            address,
            prev_hash,
            prev_code,
        });
        object.set_code(keccak256(&code), code);
        Ok(())
    }

    // ---- contract storage ----------------------------------------------

    /// Current value of a storage slot (dirty overlay first, then committed).
    pub fn get_state(&mut self, address: Address, key: B256) -> Result<U256, StateError> {
        self.load_object(address)?;
        let Self { objects, backend, .. } = self;
        objects
            .get_mut(&address)
            .expect("object loaded above")
            .get_state(backend, key)
    }

    /// Value of a storage slot as of the start of the transaction.
    pub fn get_committed_state(&mut self, address: Address, key: B256) -> Result<U256, StateError> {
        self.load_object(address)?;
        let Self { objects, backend, .. } = self;
        objects
            .get_mut(&address)
            .expect("object loaded above")
            .get_committed_state(backend, key)
    }

    /// Writes a storage slot. Writing the value the slot already holds is a
    /// no-op that must not affect journal depth.
    pub fn set_state(&mut self, address: Address, key: B256, value: U256) -> Result<(), StateError> {
        self.load_object(address)?;
        let Self { objects, backend, journal, .. } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        let prev = object.get_state(backend, key)?;
        if prev == value {
            return Ok(());
        }
        journal.append(JournalEntry::StorageChange {
            address,
            key,
            had_value: object.dirty_value(key),
        });
        object.write_storage(key, value);
        Ok(())
    }

    /// Current value of a transient storage slot (EIP-1153).
    pub fn get_transient_state(&self, address: Address, key: B256) -> U256 {
        self.transient_storage
            .get(&(address, key))
            .copied()
            .unwrap_or_default()
    }

    /// Writes a transient storage slot. Equal values are a no-op; a zero
    /// value removes the entry.
    pub fn set_transient_state(&mut self, address: Address, key: B256, value: U256) {
        let prev = self.get_transient_state(address, key);
        if prev == value {
            return;
        }
        self.journal.append(JournalEntry::TransientStorageChange {
            address,
            key,
            had_value: prev,
        });
        if value.is_zero() {
            self.transient_storage.remove(&(address, key));
        } else {
            self.transient_storage.insert((address, key), value);
        }
    }

    // ---- suicide -------------------------------------------------------

    /// Marks the account for removal at commit and zeroes its balance.
    pub fn suicide(&mut self, address: Address) -> Result<(), StateError> {
        self.load_object(address)?;
        let Self { objects, journal, .. } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        journal.append(JournalEntry::SuicideChange {
            address,
            prev: object.suicided(),
            prev_balance: object.balance(),
        });
        object.mark_suicided();
        object.set_balance(U256::ZERO);
        Ok(())
    }

    /// Returns whether the account is marked for removal at commit.
    pub fn has_suicided(&mut self, address: Address) -> Result<bool, StateError> {
        Ok(self.get_or_create_object(address)?.suicided())
    }

    // ---- logs ----------------------------------------------------------

    /// Appends a log. Order of the log sequence is emission order; a revert
    /// drops logs emitted after the snapshot en masse via journal replay.
    pub fn add_log(&mut self, log: Log) {
        self.journal.append(JournalEntry::LogAdded);
        self.logs.push(log);
    }

    /// Logs emitted so far, in emission order.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    // ---- refund counter ------------------------------------------------

    /// Adds to the gas refund counter.
    pub fn add_refund(&mut self, gas: u64) {
        self.journal.append(JournalEntry::RefundChange { prev: self.refund });
        self.refund += gas;
    }

    /// Subtracts from the gas refund counter.
    ///
    /// # Panics
    ///
    /// Panics if `gas` exceeds the current refund: that is a contract breach
    /// upstream, not a recoverable condition.
    pub fn sub_refund(&mut self, gas: u64) {
        self.journal.append(JournalEntry::RefundChange { prev: self.refund });
        if gas > self.refund {
            panic!("refund counter below zero (gas: {gas} > refund: {})", self.refund);
        }
        self.refund -= gas;
    }

    /// Current gas refund counter.
    pub fn get_refund(&self) -> u64 {
        self.refund
    }

    // ---- access list ---------------------------------------------------

    /// Marks `address` warm. Idempotent: only the first insertion journals,
    /// so "was this already warm" stays stable within a frame.
    pub fn add_address_to_access_list(&mut self, address: Address) {
        if self.access_list.add_address(address) {
            self.journal
                .append(JournalEntry::AccessListAddAccount { address });
        }
    }

    /// Marks the slot `(address, key)` warm, warming the address with it.
    /// Idempotent, journaling only first insertions.
    pub fn add_slot_to_access_list(&mut self, address: Address, key: B256) {
        let (address_added, slot_added) = self.access_list.add_slot(address, key);
        if address_added {
            self.journal
                .append(JournalEntry::AccessListAddAccount { address });
        }
        if slot_added {
            self.journal
                .append(JournalEntry::AccessListAddSlot { address, key });
        }
    }

    /// Returns whether `address` is warm.
    pub fn address_in_access_list(&self, address: Address) -> bool {
        self.access_list.contains_address(address)
    }

    /// Returns whether the slot `(address, key)` is warm.
    pub fn slot_in_access_list(&self, address: Address, key: B256) -> bool {
        self.access_list.contains_slot(address, key)
    }

    /// Transaction-prologue warming (EIP-2929/2930): sender, destination,
    /// precompiles and the declared access list all start warm.
    pub fn prepare_access_list(
        &mut self,
        sender: Address,
        destination: Option<Address>,
        precompiles: &[Address],
        access_list: &[(Address, Vec<B256>)],
    ) {
        self.add_address_to_access_list(sender);
        if let Some(destination) = destination {
            self.add_address_to_access_list(destination);
        }
        for address in precompiles {
            self.add_address_to_access_list(*address);
        }
        for (address, keys) in access_list {
            self.add_address_to_access_list(*address);
            for key in keys {
                self.add_slot_to_access_list(*address, *key);
            }
        }
    }

    // ---- frames --------------------------------------------------------

    /// Takes a snapshot marking the current frame boundary.
    pub fn snapshot(&self) -> Snapshot {
        self.journal.snapshot()
    }

    /// Reverts all state touched after `snapshot`, in strict reverse
    /// mutation order.
    ///
    /// # Panics
    ///
    /// Panics if the snapshot was never taken or was invalidated by an outer
    /// revert.
    pub fn revert_to_snapshot(&mut self, snapshot: Snapshot) {
        let Self {
            objects,
            journal,
            logs,
            refund,
            access_list,
            transient_storage,
            ..
        } = self;
        journal.revert_to(snapshot, objects, logs, refund, access_list, transient_storage);
    }

    /// Number of journal entries recorded so far. Callers compare pre/post
    /// lengths to observe whether an operation journaled.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    // ---- transaction end -----------------------------------------------

    /// Flushes all dirty objects and derived state through the store
    /// adapters. Terminal: consumes the instance.
    ///
    /// Objects are processed in address order and storage slots in key order,
    /// so independent re-executions of the same transaction produce identical
    /// write sequences. Objects without a surviving journaled mutation are
    /// skipped outright, keeping the write set minimal. Suicided and empty
    /// mutated accounts are pruned from the store. Storage slots whose dirty
    /// value equals the committed value are skipped. A store write error
    /// aborts the commit; no partial commit is ever retried here.
    pub fn commit(self) -> Result<(), StateError> {
        let Self {
            mut backend,
            mut tx_store,
            mut objects,
            journal,
            logs,
            refund,
            access_list,
            transient_storage: _,
        } = self;

        let dirty = journal.dirty_addresses();
        let mut addresses: Vec<Address> = objects.keys().copied().collect();
        addresses.sort_unstable();
        for address in addresses {
            let mut object = objects.remove(&address).expect("address came from the map");
            if !dirty.contains(&address) {
                continue;
            }
            if object.suicided() || object.empty() {
                backend.delete_account(address).map_err(StateError::store)?;
                if object.suicided() {
                    tx_store.set_suicided(address)?;
                }
                continue;
            }
            if object.dirty_code() {
                let code = object.code(&mut backend)?;
                backend
                    .set_code(object.code_hash(), &code)
                    .map_err(StateError::store)?;
            }
            backend
                .set_account(address, object.account())
                .map_err(StateError::store)?;
            for (key, value) in object.sorted_dirty_slots() {
                if object.origin_value(key) == Some(value) {
                    continue;
                }
                backend
                    .set_storage(address, key, value)
                    .map_err(StateError::store)?;
            }
        }

        for (index, log) in logs.iter().enumerate() {
            tx_store.append_log(index as u64, log)?;
        }
        if refund > 0 {
            tx_store.set_refund(refund)?;
        }
        for address in access_list.sorted_addresses() {
            tx_store.insert_access_list_address(address)?;
        }
        for (address, key) in access_list.sorted_slots() {
            tx_store.insert_access_list_slot(address, key)?;
        }
        Ok(())
    }

    /// Abandons the transaction without committing. The persistent store is
    /// untouched because all writes are deferred to commit.
    pub fn discard(self) {}
}
