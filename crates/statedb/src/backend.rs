//! Account record boundary of the persistent store.

use crate::{account::AccountRecord, errors::StateError};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::Decodable;
use auto_impl::auto_impl;
use statedb_kvstore::{KvStore, PrefixStore};

/// Namespace byte for RLP account records keyed by address.
pub const ACCOUNT_KEY: u8 = 0x06;
/// Namespace byte for code bytes keyed by code hash.
pub const CODE_KEY: u8 = 0x07;
/// Namespace byte for storage values keyed by address ++ slot key.
pub const STORAGE_KEY: u8 = 0x08;

/// Persistent account state consumed and produced by the state database.
///
/// Reads happen lazily during execution; writes happen exclusively inside
/// [`StateDB::commit`](crate::StateDB::commit), so an abandoned transaction
/// leaves the store untouched.
#[auto_impl(&mut, Box)]
pub trait Backend {
    /// The backend error type.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Gets the committed account record, `None` if the store has none.
    fn account(&mut self, address: Address) -> Result<Option<AccountRecord>, Self::Error>;

    /// Gets bytecode by its content hash, `None` if the store has none.
    fn code_by_hash(&mut self, code_hash: B256) -> Result<Option<Bytes>, Self::Error>;

    /// Gets the committed value of a storage slot, zero if unset.
    fn storage(&mut self, address: Address, key: B256) -> Result<U256, Self::Error>;

    /// Persists the account record.
    fn set_account(&mut self, address: Address, account: &AccountRecord)
        -> Result<(), Self::Error>;

    /// Removes the account record and every storage slot under the address.
    /// Code is left in place since it is shared by hash.
    fn delete_account(&mut self, address: Address) -> Result<(), Self::Error>;

    /// Persists bytecode keyed by its content hash.
    fn set_code(&mut self, code_hash: B256, code: &Bytes) -> Result<(), Self::Error>;

    /// Persists a storage slot. A zero value deletes the slot.
    fn set_storage(&mut self, address: Address, key: B256, value: U256)
        -> Result<(), Self::Error>;
}

/// [`Backend`] over prefixed ranges of a raw [`KvStore`].
///
/// Account records are RLP encoded under [`ACCOUNT_KEY`], code lives under
/// [`CODE_KEY`] keyed by hash, and storage values are stored as 32-byte
/// big-endian words under [`STORAGE_KEY`] keyed by address ++ slot key.
#[derive(Debug, Clone, Default)]
pub struct KvBackend<S> {
    kv: S,
}

impl<S: KvStore> KvBackend<S> {
    /// Creates a backend over `kv`.
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    /// Shared view of the underlying store.
    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// Consumes the backend, returning the underlying store.
    pub fn into_inner(self) -> S {
        self.kv
    }

    fn slot_key(address: Address, key: B256) -> Vec<u8> {
        let mut slot = Vec::with_capacity(Address::len_bytes() + B256::len_bytes());
        slot.extend_from_slice(address.as_slice());
        slot.extend_from_slice(key.as_slice());
        slot
    }
}

impl<S: KvStore> Backend for KvBackend<S> {
    type Error = StateError;

    fn account(&mut self, address: Address) -> Result<Option<AccountRecord>, Self::Error> {
        let store = PrefixStore::new(&mut self.kv, ACCOUNT_KEY);
        let Some(raw) = store.get(address.as_slice()).map_err(StateError::store)? else {
            return Ok(None);
        };
        let record = AccountRecord::decode(&mut raw.as_slice()).map_err(|err| {
            StateError::Corrupt {
                key: address.to_vec(),
                reason: err.to_string(),
            }
        })?;
        Ok(Some(record))
    }

    fn code_by_hash(&mut self, code_hash: B256) -> Result<Option<Bytes>, Self::Error> {
        let store = PrefixStore::new(&mut self.kv, CODE_KEY);
        Ok(store
            .get(code_hash.as_slice())
            .map_err(StateError::store)?
            .map(Bytes::from))
    }

    fn storage(&mut self, address: Address, key: B256) -> Result<U256, Self::Error> {
        let store = PrefixStore::new(&mut self.kv, STORAGE_KEY);
        let slot = Self::slot_key(address, key);
        let Some(raw) = store.get(&slot).map_err(StateError::store)? else {
            return Ok(U256::ZERO);
        };
        if raw.len() != B256::len_bytes() {
            return Err(StateError::Corrupt {
                key: slot,
                reason: format!("storage value is {} bytes, expected 32", raw.len()),
            });
        }
        Ok(U256::from_be_slice(&raw))
    }

    fn set_account(
        &mut self,
        address: Address,
        account: &AccountRecord,
    ) -> Result<(), Self::Error> {
        let encoded = alloy_rlp::encode(account);
        PrefixStore::new(&mut self.kv, ACCOUNT_KEY)
            .set(address.as_slice(), &encoded)
            .map_err(StateError::store)
    }

    fn delete_account(&mut self, address: Address) -> Result<(), Self::Error> {
        let mut store = PrefixStore::new(&mut self.kv, ACCOUNT_KEY);
        store.delete(address.as_slice()).map_err(StateError::store)?;

        let mut store = PrefixStore::new(&mut self.kv, STORAGE_KEY);
        let slots: Vec<Vec<u8>> = store
            .iter()
            .map_err(StateError::store)?
            .into_iter()
            .map(|(key, _)| key)
            .filter(|key| key.starts_with(address.as_slice()))
            .collect();
        for slot in slots {
            store.delete(&slot).map_err(StateError::store)?;
        }
        Ok(())
    }

    fn set_code(&mut self, code_hash: B256, code: &Bytes) -> Result<(), Self::Error> {
        PrefixStore::new(&mut self.kv, CODE_KEY)
            .set(code_hash.as_slice(), code)
            .map_err(StateError::store)
    }

    fn set_storage(&mut self, address: Address, key: B256, value: U256) -> Result<(), Self::Error> {
        let mut store = PrefixStore::new(&mut self.kv, STORAGE_KEY);
        let slot = Self::slot_key(address, key);
        if value.is_zero() {
            store.delete(&slot).map_err(StateError::store)
        } else {
            store
                .set(&slot, B256::from(value).as_slice())
                .map_err(StateError::store)
        }
    }
}
