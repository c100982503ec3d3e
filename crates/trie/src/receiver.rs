use alloy_primitives::B256;
use alloy_trie::{HashBuilder, Nibbles};

use crate::error::Result;

/// One record surfaced by a trie walk, in strictly ascending nibble-path order.
///
/// `AccountHash`/`StorageHash` stand in for an entire untouched subtree: the loader found a
/// cached hash covering this prefix in the `IntermediateTrieHash` bucket and chose not to
/// descend into it. `Cutoff` marks the end of a subtree the receiver should stop expecting
/// children for (used when interleaving a storage sub-walk inside the account walk).
#[derive(Debug, Clone)]
pub enum TrieItem {
    Account { nibbles: Nibbles, account_rlp: Vec<u8> },
    Storage { nibbles: Nibbles, value: Vec<u8> },
    AccountHash { nibbles: Nibbles, hash: B256 },
    StorageHash { nibbles: Nibbles, hash: B256 },
    Cutoff { nibbles: Nibbles },
}

/// Consumes a stream of [`TrieItem`]s in ascending path order and folds them into a root hash.
///
/// Kept as a trait (rather than hardwiring [`HashBuilder`] everywhere) so a caller can swap in
/// a recording receiver for tests that just wants the sequence of items a walk produced.
pub trait StreamReceiver {
    fn receive(&mut self, item: TrieItem) -> Result<()>;
    fn root(&mut self) -> Result<B256>;
}

/// Feeds every item straight into `alloy_trie`'s incremental hash builder, which does the real
/// RLP node encoding and Keccak hashing.
#[derive(Default)]
pub struct DefaultReceiver {
    builder: HashBuilder,
}

impl DefaultReceiver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamReceiver for DefaultReceiver {
    fn receive(&mut self, item: TrieItem) -> Result<()> {
        match item {
            TrieItem::Account { nibbles, account_rlp } => self.builder.add_leaf(nibbles, &account_rlp),
            TrieItem::Storage { nibbles, value } => self.builder.add_leaf(nibbles, &value),
            TrieItem::AccountHash { nibbles, hash } => self.builder.add_branch(nibbles, hash, false),
            TrieItem::StorageHash { nibbles, hash } => self.builder.add_branch(nibbles, hash, false),
            TrieItem::Cutoff { .. } => {}
        }
        Ok(())
    }

    fn root(&mut self) -> Result<B256> {
        Ok(self.builder.root())
    }
}
