use crate::{
    account::AccountRecord,
    backend::Backend,
    errors::StateError,
};
use alloy_primitives::{map::HashMap, Address, Bytes, B256, U256};

/// In-memory working copy of a single account.
///
/// Combines the committed account fields with a two-tier storage cache: an
/// origin cache holding values as of the start of the transaction (read
/// through from the backing store, never invalidated within the transaction)
/// and a dirty overlay holding uncommitted writes. Code bytes are materialized
/// lazily from the store on first access.
///
/// Objects are exclusively owned by the facade's address map; all journaled
/// mutation goes through the facade, which appends the undo record before
/// calling the crate-private setters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateObject {
    address: Address,
    account: AccountRecord,
    code: Option<Bytes>,
    /// Last known committed values, frozen at first read for the transaction.
    origin_storage: HashMap<B256, U256>,
    /// Uncommitted writes made during the current transaction.
    dirty_storage: HashMap<B256, U256>,
    dirty_code: bool,
    suicided: bool,
}

impl StateObject {
    pub(crate) fn new(address: Address, account: AccountRecord) -> Self {
        Self {
            address,
            account,
            code: None,
            origin_storage: HashMap::default(),
            dirty_storage: HashMap::default(),
            dirty_code: false,
            suicided: false,
        }
    }

    /// Address of the account.
    #[inline]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current (possibly dirty) balance.
    #[inline]
    pub fn balance(&self) -> U256 {
        self.account.balance
    }

    /// Current (possibly dirty) nonce.
    #[inline]
    pub fn nonce(&self) -> u64 {
        self.account.nonce
    }

    /// Current (possibly dirty) code hash.
    #[inline]
    pub fn code_hash(&self) -> B256 {
        self.account.code_hash
    }

    /// Returns whether the account is considered empty: zero nonce, zero
    /// balance and the empty-code hash.
    #[inline]
    pub fn empty(&self) -> bool {
        self.account.is_empty()
    }

    /// Returns whether the account is marked for removal at commit.
    #[inline]
    pub fn suicided(&self) -> bool {
        self.suicided
    }

    pub(crate) fn account(&self) -> &AccountRecord {
        &self.account
    }

    pub(crate) fn dirty_code(&self) -> bool {
        self.dirty_code
    }

    /// Idempotent flag set; the facade journals the change before calling.
    pub(crate) fn mark_suicided(&mut self) {
        self.suicided = true;
    }

    pub(crate) fn set_suicided(&mut self, suicided: bool) {
        self.suicided = suicided;
    }

    pub(crate) fn set_balance(&mut self, balance: U256) {
        self.account.balance = balance;
    }

    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.account.nonce = nonce;
    }

    pub(crate) fn set_code(&mut self, code_hash: B256, code: Bytes) {
        self.code = Some(code);
        self.account.code_hash = code_hash;
        self.dirty_code = true;
    }

    /// Current dirty-overlay entry for `key`, if any.
    pub(crate) fn dirty_value(&self, key: B256) -> Option<U256> {
        self.dirty_storage.get(&key).copied()
    }

    pub(crate) fn write_storage(&mut self, key: B256, value: U256) {
        self.dirty_storage.insert(key, value);
    }

    /// Restores the dirty overlay for `key` to its journaled previous shape.
    pub(crate) fn revert_storage(&mut self, key: B256, had_value: Option<U256>) {
        match had_value {
            Some(value) => {
                self.dirty_storage.insert(key, value);
            }
            None => {
                self.dirty_storage.remove(&key);
            }
        }
    }

    /// Queries the current state of `key`: the dirty value if present,
    /// otherwise the committed state.
    pub fn get_state<B: Backend>(&mut self, backend: &mut B, key: B256) -> Result<U256, StateError> {
        if let Some(value) = self.dirty_storage.get(&key) {
            return Ok(*value);
        }
        self.get_committed_state(backend, key)
    }

    /// Queries the committed state of `key` as of the start of the
    /// transaction, reading through the backing store on first access.
    pub fn get_committed_state<B: Backend>(
        &mut self,
        backend: &mut B,
        key: B256,
    ) -> Result<U256, StateError> {
        if let Some(value) = self.origin_storage.get(&key) {
            return Ok(*value);
        }
        let value = backend
            .storage(self.address, key)
            .map_err(StateError::store)?;
        self.origin_storage.insert(key, value);
        Ok(value)
    }

    /// Bytecode of the account, loaded from the store once and cached.
    /// Accounts with the empty-code hash yield empty bytes without a store
    /// round-trip.
    pub fn code<B: Backend>(&mut self, backend: &mut B) -> Result<Bytes, StateError> {
        if let Some(code) = &self.code {
            return Ok(code.clone());
        }
        if self.account.is_empty_code_hash() {
            self.code = Some(Bytes::new());
            return Ok(Bytes::new());
        }
        let code = backend
            .code_by_hash(self.account.code_hash)
            .map_err(StateError::store)?
            .ok_or(StateError::MissingCode(self.account.code_hash))?;
        self.code = Some(code.clone());
        Ok(code)
    }

    /// Size of the account bytecode, zero if none.
    pub fn code_size<B: Backend>(&mut self, backend: &mut B) -> Result<usize, StateError> {
        Ok(self.code(backend)?.len())
    }

    /// Committed (origin) value of `key`, if it was read this transaction.
    pub(crate) fn origin_value(&self, key: B256) -> Option<U256> {
        self.origin_storage.get(&key).copied()
    }

    /// Dirty slots ordered by key bytes, for deterministic commit order.
    pub(crate) fn sorted_dirty_slots(&self) -> Vec<(B256, U256)> {
        let mut slots: Vec<(B256, U256)> = self
            .dirty_storage
            .iter()
            .map(|(key, value)| (*key, *value))
            .collect();
        slots.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        slots
    }
}
