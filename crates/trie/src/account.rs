use alloy_primitives::{B256, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// Minimal account leaf payload stored at an account's trie position.
///
/// Real account state also carries `code_hash`; this core only needs the fields the trie root
/// is sensitive to and that the collaborator stages actually maintain.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct TrieAccount {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: B256,
    pub code_hash: B256,
}

impl TrieAccount {
    pub const EMPTY_ROOT: B256 = alloy_trie::EMPTY_ROOT_HASH;

    pub fn rlp_bytes(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }
}

impl Default for TrieAccount {
    fn default() -> Self {
        Self { nonce: 0, balance: U256::ZERO, storage_root: Self::EMPTY_ROOT, code_hash: B256::ZERO }
    }
}
