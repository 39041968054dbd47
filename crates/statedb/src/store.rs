//! Store adapter for per-transaction derived state.
//!
//! Thin mapping from domain concepts (logs, refund counter, suicide markers,
//! access-list entries) onto namespaced key ranges in the backing store. Pure
//! get/set/iterate; rollback never reaches this layer because the facade only
//! flushes here at commit time.

use crate::errors::StateError;
use alloy_primitives::{Address, Log, B256};
use statedb_kvstore::{KvStore, PrefixStore};

/// Namespace byte for warm access-list addresses.
pub const ACCESS_LIST_ADDRESS_KEY: u8 = 0x01;
/// Namespace byte for warm access-list (address, slot) pairs.
pub const ACCESS_LIST_SLOT_KEY: u8 = 0x02;
/// Namespace byte for emitted logs.
pub const LOG_KEY: u8 = 0x03;
/// Namespace byte for the refund counter.
pub const REFUND_KEY: u8 = 0x04;
/// Namespace byte for suicided account markers.
pub const SUICIDED_KEY: u8 = 0x05;

/// Adapter between the facade's derived per-transaction state and the raw
/// key ranges of the backing store.
#[derive(Debug, Clone, Default)]
pub struct TxStateStore<S> {
    kv: S,
}

impl<S: KvStore> TxStateStore<S> {
    /// Creates an adapter over `kv`.
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    /// Shared view of the underlying store.
    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// Consumes the adapter, returning the underlying store.
    pub fn into_inner(self) -> S {
        self.kv
    }

    /// Persists a log under its big-endian emission index, so forward
    /// iteration over the range replays emission order.
    pub fn append_log(&mut self, index: u64, log: &Log) -> Result<(), StateError> {
        let raw = serde_json::to_vec(log).map_err(StateError::store)?;
        PrefixStore::new(&mut self.kv, LOG_KEY)
            .set(&index.to_be_bytes(), &raw)
            .map_err(StateError::store)
    }

    /// All persisted logs in emission order.
    pub fn logs(&mut self) -> Result<Vec<Log>, StateError> {
        let store = PrefixStore::new(&mut self.kv, LOG_KEY);
        let mut logs = Vec::new();
        for (key, raw) in store.iter().map_err(StateError::store)? {
            let log = serde_json::from_slice(&raw).map_err(|err| StateError::Corrupt {
                key,
                reason: err.to_string(),
            })?;
            logs.push(log);
        }
        Ok(logs)
    }

    /// Persists the refund counter as a fixed-width big-endian integer.
    pub fn set_refund(&mut self, gas: u64) -> Result<(), StateError> {
        PrefixStore::new(&mut self.kv, REFUND_KEY)
            .set(&[], &gas.to_be_bytes())
            .map_err(StateError::store)
    }

    /// The persisted refund counter, zero if unset.
    pub fn refund(&mut self) -> Result<u64, StateError> {
        let store = PrefixStore::new(&mut self.kv, REFUND_KEY);
        let Some(raw) = store.get(&[]).map_err(StateError::store)? else {
            return Ok(0);
        };
        let bytes: [u8; 8] = raw.as_slice().try_into().map_err(|_| StateError::Corrupt {
            key: Vec::new(),
            reason: format!("refund counter is {} bytes, expected 8", raw.len()),
        })?;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Marks an address as suicided.
    pub fn set_suicided(&mut self, address: Address) -> Result<(), StateError> {
        PrefixStore::new(&mut self.kv, SUICIDED_KEY)
            .set(address.as_slice(), &[1])
            .map_err(StateError::store)
    }

    /// Returns whether an address is marked suicided.
    pub fn is_suicided(&mut self, address: Address) -> Result<bool, StateError> {
        PrefixStore::new(&mut self.kv, SUICIDED_KEY)
            .has(address.as_slice())
            .map_err(StateError::store)
    }

    /// All suicided addresses in address byte order.
    pub fn suicided_addresses(&mut self) -> Result<Vec<Address>, StateError> {
        let store = PrefixStore::new(&mut self.kv, SUICIDED_KEY);
        let mut addresses = Vec::new();
        for (key, _) in store.iter().map_err(StateError::store)? {
            if key.len() != Address::len_bytes() {
                return Err(StateError::Corrupt {
                    reason: format!("suicided key is {} bytes, expected 20", key.len()),
                    key,
                });
            }
            addresses.push(Address::from_slice(&key));
        }
        Ok(addresses)
    }

    /// Records a warm access-list address.
    pub fn insert_access_list_address(&mut self, address: Address) -> Result<(), StateError> {
        PrefixStore::new(&mut self.kv, ACCESS_LIST_ADDRESS_KEY)
            .set(address.as_slice(), &[1])
            .map_err(StateError::store)
    }

    /// Returns whether an address was recorded warm.
    pub fn contains_access_list_address(&mut self, address: Address) -> Result<bool, StateError> {
        PrefixStore::new(&mut self.kv, ACCESS_LIST_ADDRESS_KEY)
            .has(address.as_slice())
            .map_err(StateError::store)
    }

    /// Records a warm access-list (address, slot) pair.
    pub fn insert_access_list_slot(
        &mut self,
        address: Address,
        key: B256,
    ) -> Result<(), StateError> {
        PrefixStore::new(&mut self.kv, ACCESS_LIST_SLOT_KEY)
            .set(&slot_key(address, key), &[1])
            .map_err(StateError::store)
    }

    /// Returns whether an (address, slot) pair was recorded warm.
    pub fn contains_access_list_slot(
        &mut self,
        address: Address,
        key: B256,
    ) -> Result<bool, StateError> {
        PrefixStore::new(&mut self.kv, ACCESS_LIST_SLOT_KEY)
            .has(&slot_key(address, key))
            .map_err(StateError::store)
    }
}

fn slot_key(address: Address, key: B256) -> Vec<u8> {
    let mut slot = Vec::with_capacity(Address::len_bytes() + B256::len_bytes());
    slot.extend_from_slice(address.as_slice());
    slot.extend_from_slice(key.as_slice());
    slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use statedb_kvstore::MemoryKv;

    fn store() -> TxStateStore<MemoryKv> {
        TxStateStore::new(MemoryKv::new())
    }

    fn log(marker: u8) -> Log {
        Log::new_unchecked(
            Address::from([marker; 20]),
            vec![B256::with_last_byte(marker)],
            Bytes::from(vec![marker]),
        )
    }

    #[test]
    fn logs_replay_in_emission_order() {
        let mut store = store();
        // Insert out of order; the big-endian index keys must still sort.
        store.append_log(1, &log(2)).unwrap();
        store.append_log(0, &log(1)).unwrap();
        store.append_log(2, &log(3)).unwrap();

        let logs = store.logs().unwrap();
        assert_eq!(logs, vec![log(1), log(2), log(3)]);
    }

    #[test]
    fn refund_round_trip() {
        let mut store = store();
        assert_eq!(store.refund().unwrap(), 0);
        store.set_refund(12_345).unwrap();
        assert_eq!(store.refund().unwrap(), 12_345);
    }

    #[test]
    fn suicided_addresses_are_byte_ordered() {
        let mut store = store();
        let high = Address::from([0xbb; 20]);
        let low = Address::from([0xaa; 20]);
        store.set_suicided(high).unwrap();
        store.set_suicided(low).unwrap();

        assert!(store.is_suicided(low).unwrap());
        assert_eq!(store.suicided_addresses().unwrap(), vec![low, high]);
    }

    #[test]
    fn access_list_entries() {
        let mut store = store();
        let address = Address::from([0x01; 20]);
        let key = B256::with_last_byte(5);

        assert!(!store.contains_access_list_address(address).unwrap());
        store.insert_access_list_address(address).unwrap();
        assert!(store.contains_access_list_address(address).unwrap());

        assert!(!store.contains_access_list_slot(address, key).unwrap());
        store.insert_access_list_slot(address, key).unwrap();
        assert!(store.contains_access_list_slot(address, key).unwrap());
    }

    #[test]
    fn corrupt_log_record_is_fatal() {
        let mut store = store();
        PrefixStore::new(&mut store.kv, LOG_KEY)
            .set(&0u64.to_be_bytes(), b"not json")
            .unwrap();
        assert!(matches!(store.logs(), Err(StateError::Corrupt { .. })));
    }
}
