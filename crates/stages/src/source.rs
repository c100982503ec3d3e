use alloy_primitives::{Address, B256, U256};
use ridge_primitives::BlockNumber;

/// An account's new state after a block, as seen by [`BlockSource::state_diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountUpdate {
    Upsert { nonce: u64, balance: U256 },
    Delete,
}

/// Everything the Execution stage needs to apply one block, standing in for what a real node
/// would get from executing the block's transactions against the EVM.
///
/// This is the ambient-stack seam networking and execution would occupy in a full node: the
/// staged-sync core this crate implements only needs *some* source of per-block state deltas to
/// drive change-sets and trie hashing, not a real devp2p client or EVM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDiff {
    pub accounts: Vec<(Address, AccountUpdate)>,
    pub storage: Vec<(Address, B256, U256)>,
}

/// Supplies headers, block hashes, and state diffs to the collaborator stages.
pub trait BlockSource: Send + Sync {
    /// Highest block number this source currently has available.
    fn tip(&self) -> BlockNumber;
    fn block_hash(&self, number: BlockNumber) -> Option<B256>;
    /// The canonical state root a correctly computed trie for this block must match, if this
    /// source tracks one (e.g. from a trusted header it downloaded).
    fn state_root(&self, number: BlockNumber) -> Option<B256>;
    fn state_diff(&self, number: BlockNumber) -> StateDiff;
}

/// An in-memory [`BlockSource`] used by tests and by any embedder that wants to drive the
/// pipeline over synthetic blocks without a real network stack.
#[derive(Default)]
pub struct InMemoryBlockSource {
    blocks: Vec<(B256, Option<B256>, StateDiff)>,
}

impl InMemoryBlockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a block, returning its assigned (1-based) block number.
    pub fn push_block(&mut self, hash: B256, state_root: Option<B256>, diff: StateDiff) -> BlockNumber {
        self.blocks.push((hash, state_root, diff));
        self.blocks.len() as BlockNumber
    }
}

impl BlockSource for InMemoryBlockSource {
    fn tip(&self) -> BlockNumber {
        self.blocks.len() as BlockNumber
    }

    fn block_hash(&self, number: BlockNumber) -> Option<B256> {
        self.blocks.get(number.checked_sub(1)? as usize).map(|(hash, _, _)| *hash)
    }

    fn state_root(&self, number: BlockNumber) -> Option<B256> {
        self.blocks.get(number.checked_sub(1)? as usize).and_then(|(_, root, _)| *root)
    }

    fn state_diff(&self, number: BlockNumber) -> StateDiff {
        self.blocks.get(number.saturating_sub(1) as usize).map(|(_, _, diff)| diff.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_block_assigns_sequential_one_based_numbers() {
        let mut source = InMemoryBlockSource::new();
        let first = source.push_block(B256::repeat_byte(1), None, StateDiff::default());
        let second = source.push_block(B256::repeat_byte(2), None, StateDiff::default());
        assert_eq!((first, second), (1, 2));
        assert_eq!(source.tip(), 2);
        assert_eq!(source.block_hash(1), Some(B256::repeat_byte(1)));
    }

    #[test]
    fn queries_beyond_tip_return_none_or_default() {
        let source = InMemoryBlockSource::new();
        assert_eq!(source.tip(), 0);
        assert_eq!(source.block_hash(1), None);
        assert_eq!(source.state_diff(1), StateDiff::default());
    }
}
