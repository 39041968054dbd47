//! Key-value store boundary for the state database.
//!
//! The persistent store behind the state database is an authenticated,
//! byte-keyed store owned by the host state machine. This crate defines the
//! narrow surface the state database needs from it ([`KvStore`]), a namespacing
//! helper ([`PrefixStore`]) and an ordered in-memory implementation
//! ([`MemoryKv`]) used in tests and as a reference.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod memory;
mod prefix;

pub use memory::MemoryKv;
pub use prefix::PrefixStore;

use auto_impl::auto_impl;

/// Raw byte-keyed store interface.
///
/// Writes performed through this trait are expected to be durable once they
/// return `Ok`; the state database defers all of its writes to commit time and
/// treats any failure here as fatal for the transaction.
#[auto_impl(&mut, Box)]
pub trait KvStore {
    /// The store error type.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Gets the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sets `key` to `value`, overwriting any previous value.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error>;

    /// Deletes the value stored under `key`, if any.
    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error>;

    /// Returns whether `key` holds a value.
    fn has(&self, key: &[u8]) -> Result<bool, Self::Error> {
        Ok(self.get(key)?.is_some())
    }

    /// Returns all entries whose key starts with `prefix`, ordered by raw key
    /// bytes ascending.
    ///
    /// Deterministic forward iteration is part of the contract: range reads
    /// feed consensus-relevant state, so two stores holding the same entries
    /// must yield them in the same order.
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error>;
}
