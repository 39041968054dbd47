//! In-memory, transaction-scoped EVM state database.
//!
//! Sits between an EVM execution engine and a byte-keyed persistent store.
//! During execution every account read is materialized into an in-memory
//! [`StateObject`] and every mutation is recorded in a [`Journal`] before it
//! is applied, so any prefix of the work can be rolled back by reverting to a
//! [`Snapshot`]. Nothing touches the persistent store until
//! [`StateDB::commit`], which flushes the surviving dirty state in a single
//! deterministic pass.
//!
//! The persistent side is split in two: the [`Backend`] trait covers account
//! records, code and contract storage, and [`TxStateStore`] covers the derived
//! per-transaction state (logs, refund counter, suicide markers, access-list
//! entries). Both ship with implementations over the raw
//! [`KvStore`](statedb_kvstore::KvStore) interface.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod access_list;
mod account;
mod backend;
mod errors;
mod journal;
mod state_object;
mod statedb;
mod store;

pub use access_list::AccessList;
pub use account::{AccountRecord, KECCAK_EMPTY};
pub use backend::{Backend, KvBackend, ACCOUNT_KEY, CODE_KEY, STORAGE_KEY};
pub use errors::StateError;
pub use journal::{Journal, JournalEntry, Snapshot, TransientStorage};
pub use state_object::StateObject;
pub use statedb::StateDB;
pub use store::{
    TxStateStore, ACCESS_LIST_ADDRESS_KEY, ACCESS_LIST_SLOT_KEY, LOG_KEY, REFUND_KEY, SUICIDED_KEY,
};
