use std::sync::Arc;

use ridge_db_api::{CanonicalHeaders, Database, DbCursorRO, DbCursorRW, DbTx, DbTxMut, HeaderStateRoots};
use ridge_primitives::StageId;
use ridge_stages_api::{ExecInput, ExecOutput, StageDescriptor, UnwindInput, UnwindOutput};

use crate::source::BlockSource;

/// Indexes `CanonicalHeaders` (block number -> hash) and `HeaderStateRoots` (block number ->
/// state root) for every block the source has made available, up to the pipeline's target.
/// `IntermediateHashes` reads `HeaderStateRoots` back to check hash fidelity against what this
/// stage recorded.
pub fn block_hashes_stage<DB: Database + 'static>(source: Arc<dyn BlockSource>) -> StageDescriptor<DB> {
    StageDescriptor::new(
        StageId::BlockHashes,
        move |db, _state, input: ExecInput| {
            let reachable = source.tip().min(input.target);
            db.update(|tx| {
                for block in (input.checkpoint + 1)..=reachable {
                    let key = block.to_be_bytes();
                    if let Some(hash) = source.block_hash(block) {
                        tx.put::<CanonicalHeaders>(&key, hash.as_slice())?;
                    }
                    if let Some(root) = source.state_root(block) {
                        tx.put::<HeaderStateRoots>(&key, root.as_slice())?;
                    }
                }
                Ok(())
            })?;
            Ok(ExecOutput { block_number: reachable, done: reachable >= input.target })
        },
        |db, input: UnwindInput| {
            db.update(|tx| {
                let mut headers = tx.cursor_mut::<CanonicalHeaders>()?;
                let mut roots = tx.cursor_mut::<HeaderStateRoots>()?;
                for block in (input.unwind_to + 1)..=input.checkpoint {
                    let key = block.to_be_bytes();
                    if headers.seek_exact(&key)?.is_some() {
                        headers.delete_current()?;
                    }
                    if roots.seek_exact(&key)?.is_some() {
                        roots.delete_current()?;
                    }
                }
                Ok(())
            })?;
            Ok(UnwindOutput { block_number: input.unwind_to })
        },
    )
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use ridge_db::MemDatabase;
    use ridge_stages_api::{ExecInput, StageState, UnwindInput};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::source::{AccountUpdate, InMemoryBlockSource, StateDiff};

    fn source_with_blocks(n: u64) -> Arc<InMemoryBlockSource> {
        let mut source = InMemoryBlockSource::new();
        for i in 0..n {
            source.push_block(B256::repeat_byte((i + 1) as u8), Some(B256::repeat_byte(0xab)), StateDiff::default());
        }
        Arc::new(source)
    }

    #[test]
    fn indexes_canonical_hashes_and_state_roots() {
        let db = MemDatabase::open();
        let mut stage: StageDescriptor<MemDatabase> = block_hashes_stage(source_with_blocks(3));
        let state = StageState::new(&db, StageId::BlockHashes, CancellationToken::new());
        let output = stage.execute(&db, &state, ExecInput { target: 3, checkpoint: 0 }).unwrap();
        assert!(output.done);

        let hash = db.view(|tx| tx.get::<CanonicalHeaders>(&1u64.to_be_bytes())).unwrap();
        assert_eq!(hash, Some(B256::repeat_byte(1).to_vec()));
        let root = db.view(|tx| tx.get::<HeaderStateRoots>(&1u64.to_be_bytes())).unwrap();
        assert_eq!(root, Some(B256::repeat_byte(0xab).to_vec()));
    }

    #[test]
    fn unwind_removes_rolled_back_rows() {
        let db = MemDatabase::open();
        let mut stage: StageDescriptor<MemDatabase> = block_hashes_stage(source_with_blocks(3));
        let state = StageState::new(&db, StageId::BlockHashes, CancellationToken::new());
        stage.execute(&db, &state, ExecInput { target: 3, checkpoint: 0 }).unwrap();

        stage.unwind(&db, UnwindInput { unwind_to: 1, checkpoint: 3 }).unwrap();

        assert!(db.view(|tx| tx.get::<CanonicalHeaders>(&3u64.to_be_bytes())).unwrap().is_none());
        assert!(db.view(|tx| tx.get::<CanonicalHeaders>(&1u64.to_be_bytes())).unwrap().is_some());
    }
}
