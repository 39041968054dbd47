use alloy_primitives::B256;

/// Errors surfaced by the state database.
///
/// Only persistent-store failures appear here; they abort the transaction and
/// are never retried at this layer. Invariant violations (refund underflow,
/// balance underflow, reverting to a snapshot that was never taken) are
/// caller contract breaches and panic instead, since clamping them silently
/// would produce divergent state across replicas.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Persistent store read or write failed.
    #[error("store access failed: {0}")]
    Store(#[source] Box<dyn core::error::Error + Send + Sync>),
    /// A persisted record failed to deserialize. Indicates store corruption
    /// that correctness cannot route around.
    #[error("malformed record under key {key:x?}: {reason}")]
    Corrupt {
        /// Raw key of the offending record, without its namespace byte.
        key: Vec<u8>,
        /// Decoder error message.
        reason: String,
    },
    /// Bytecode referenced by an account record is missing from the store.
    #[error("missing code for hash {0}")]
    MissingCode(B256),
}

impl StateError {
    /// Wraps a store error.
    pub fn store<E: core::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Store(Box::new(err))
    }
}
