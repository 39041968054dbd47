use alloy_primitives::{b256, B256, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// Keccak-256 hash of empty code, the sentinel for accounts without bytecode.
pub const KECCAK_EMPTY: B256 =
    b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// Committed account fields as persisted in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct AccountRecord {
    /// Account nonce, strictly non-decreasing within a transaction.
    pub nonce: u64,
    /// Account balance. Never negative; subtraction below zero is a caller
    /// contract violation.
    pub balance: U256,
    /// Content hash of the account bytecode, [`KECCAK_EMPTY`] when absent.
    pub code_hash: B256,
}

impl Default for AccountRecord {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            code_hash: KECCAK_EMPTY,
        }
    }
}

impl AccountRecord {
    /// Returns whether the account is empty per the state-clearing rule:
    /// zero nonce, zero balance and no code. Empty accounts are pruned from
    /// the persistent store on commit.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.is_empty_code_hash()
    }

    /// Returns whether the code hash is the empty-code sentinel.
    #[inline]
    pub fn is_empty_code_hash(&self) -> bool {
        self.code_hash == KECCAK_EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;

    #[test]
    fn keccak_empty_matches_hash_of_nothing() {
        assert_eq!(keccak256([]), KECCAK_EMPTY);
    }

    #[test]
    fn emptiness() {
        let mut record = AccountRecord::default();
        assert!(record.is_empty());

        record.balance = U256::from(1);
        assert!(!record.is_empty());

        record.balance = U256::ZERO;
        record.nonce = 1;
        assert!(!record.is_empty());

        record.nonce = 0;
        record.code_hash = keccak256([0x60, 0x00]);
        assert!(!record.is_empty());
    }

    #[test]
    fn rlp_round_trip() {
        use alloy_rlp::Decodable;

        let record = AccountRecord {
            nonce: 7,
            balance: U256::from(1_000_000u64),
            code_hash: keccak256(b"code"),
        };
        let encoded = alloy_rlp::encode(&record);
        let decoded = AccountRecord::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, record);
    }
}
