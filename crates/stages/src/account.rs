use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// `PlainAccountState`'s value shape. Deliberately simpler than the hashed-state leaf
/// ([`ridge_trie::TrieAccount`]): plain state isn't hashed directly, so it has no need to carry
/// a storage root or code hash placeholder — the HashState stage fills those in when it derives
/// the hashed view this account feeds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlainAccount {
    pub nonce: u64,
    pub balance: U256,
}

impl PlainAccount {
    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("PlainAccount serialization is infallible")
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let account = PlainAccount { nonce: 42, balance: U256::from(1_000_000u64) };
        let decoded = PlainAccount::decode(&account.encode()).unwrap();
        assert_eq!(account, decoded);
    }
}
