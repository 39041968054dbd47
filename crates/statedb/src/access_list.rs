use alloy_primitives::{map::HashSet, Address, B256};

/// Warm address and storage-slot tracking for one transaction (EIP-2929).
///
/// Membership only ever grows through the facade; removal happens exclusively
/// through journal reverts, which is why the mutating methods are crate
/// private.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList {
    addresses: HashSet<Address>,
    slots: HashSet<(Address, B256)>,
}

impl AccessList {
    /// Creates an empty access list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `address` is warm.
    #[inline]
    pub fn contains_address(&self, address: Address) -> bool {
        self.addresses.contains(&address)
    }

    /// Returns whether the storage slot `(address, key)` is warm.
    #[inline]
    pub fn contains_slot(&self, address: Address, key: B256) -> bool {
        self.slots.contains(&(address, key))
    }

    /// Marks `address` warm. Returns true if it was cold before.
    pub(crate) fn add_address(&mut self, address: Address) -> bool {
        self.addresses.insert(address)
    }

    /// Marks the slot `(address, key)` warm, warming the address along with
    /// it. Returns `(address_was_cold, slot_was_cold)`.
    pub(crate) fn add_slot(&mut self, address: Address, key: B256) -> (bool, bool) {
        let address_added = self.addresses.insert(address);
        let slot_added = self.slots.insert((address, key));
        (address_added, slot_added)
    }

    pub(crate) fn remove_address(&mut self, address: Address) {
        self.addresses.remove(&address);
    }

    pub(crate) fn remove_slot(&mut self, address: Address, key: B256) {
        self.slots.remove(&(address, key));
    }

    /// Warm addresses ordered by address bytes, for deterministic flushing.
    pub(crate) fn sorted_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.addresses.iter().copied().collect();
        addresses.sort_unstable();
        addresses
    }

    /// Warm slots ordered by `(address, key)` bytes, for deterministic
    /// flushing.
    pub(crate) fn sorted_slots(&self) -> Vec<(Address, B256)> {
        let mut slots: Vec<(Address, B256)> = self.slots.iter().copied().collect();
        slots.sort_unstable();
        slots
    }
}
