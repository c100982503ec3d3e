use std::{collections::HashMap, sync::Arc};

use alloy_primitives::{Address, B256, U256};
use ridge_db_api::{Database, DbCursorRO, DbCursorRW, DbTx, DbTxMut, PlainAccountChangeSet, PlainAccountState, PlainStorageChangeSet, PlainStorageState};
use ridge_primitives::{BlockNumber, StageId};
use ridge_stages_api::{ExecInput, ExecOutput, Result, StageDescriptor, StageError, UnwindInput, UnwindOutput};
use tracing::debug;

use crate::{
    account::PlainAccount,
    keys::{
        account_changeset_key, decode_account_changeset_key, decode_storage_changeset_key, storage_changeset_key,
        storage_state_key,
    },
    source::{AccountUpdate, BlockSource, StateDiff},
};

/// Applies each block's [`StateDiff`] to `PlainAccountState`/`PlainStorageState`, recording the
/// pre-image of every touched slot in `PlainAccountChangeSet`/`PlainStorageChangeSet` so unwind
/// can restore it later.
///
/// The only collaborator stage whose output every downstream stage in this core actually
/// depends on — `HashState` and `IntermediateHashes` both read what this stage writes. Never
/// applies a diff for a block `source` hasn't actually produced: it caps its effective target at
/// `source.tip()` and reports `done = false` if that falls short, the same "stop at what's really
/// there" rule `headers_stage` follows, so a literal pipeline target ahead of the source never
/// gets silently marked done on empty no-op diffs.
pub fn execution_stage<DB: Database + 'static>(
    source: Arc<dyn BlockSource>,
    commit_threshold: u64,
) -> StageDescriptor<DB> {
    StageDescriptor::new(
        StageId::Execution,
        move |db, state, input: ExecInput| {
            let target = input.target.min(source.tip());
            let mut current = input.checkpoint;
            while current < target {
                if state.is_cancelled() {
                    return Err(StageError::Cancelled);
                }
                let batch_end = (current + commit_threshold).min(target);
                let tx = db.begin_mut()?;
                for block in (current + 1)..=batch_end {
                    let diff = source.state_diff(block);
                    apply_block(&tx, block, &diff)?;
                }
                tx.commit()?;
                current = batch_end;
                state.update(current)?;
                debug!(target: "sync::stages::execution", checkpoint = current, target, "applied block range");
            }
            Ok(ExecOutput { block_number: current, done: current >= input.target })
        },
        move |db, input: UnwindInput| {
            let tx = db.begin_mut()?;
            unwind_accounts(&tx, input.unwind_to, input.checkpoint)?;
            unwind_storage(&tx, input.unwind_to, input.checkpoint)?;
            tx.commit()?;
            Ok(UnwindOutput { block_number: input.unwind_to })
        },
    )
}

fn apply_block<Tx: DbTxMut>(tx: &Tx, block: BlockNumber, diff: &StateDiff) -> Result<()> {
    for (address, update) in &diff.accounts {
        let old = tx.get::<PlainAccountState>(address.as_slice())?.unwrap_or_default();
        tx.put::<PlainAccountChangeSet>(&account_changeset_key(block, *address), &old)?;
        match update {
            AccountUpdate::Upsert { nonce, balance } => {
                let account = PlainAccount { nonce: *nonce, balance: *balance };
                tx.put::<PlainAccountState>(address.as_slice(), &account.encode())?;
            }
            AccountUpdate::Delete => {
                tx.delete::<PlainAccountState>(address.as_slice())?;
            }
        }
    }
    for (address, slot, value) in &diff.storage {
        let key = storage_state_key(*address, *slot);
        let old = tx.get::<PlainStorageState>(&key)?.unwrap_or_else(|| U256::ZERO.to_be_bytes::<32>().to_vec());
        tx.put::<PlainStorageChangeSet>(&storage_changeset_key(block, *address, *slot), &old)?;
        tx.put::<PlainStorageState>(&key, &value.to_be_bytes::<32>())?;
    }
    Ok(())
}

fn unwind_accounts<Tx: DbTxMut>(tx: &Tx, unwind_to: BlockNumber, checkpoint: BlockNumber) -> Result<()> {
    let mut restore: HashMap<Address, Vec<u8>> = HashMap::new();
    let mut to_delete: Vec<Vec<u8>> = Vec::new();
    {
        let mut cursor = tx.cursor::<PlainAccountChangeSet>()?;
        let start = account_changeset_key(unwind_to + 1, Address::ZERO);
        let mut walker = cursor.walk(Some(&start))?;
        while let Some((key, old_value)) = walker.next()? {
            let (block, address) = decode_account_changeset_key(&key);
            if block > checkpoint {
                break;
            }
            restore.entry(address).or_insert(old_value);
            to_delete.push(key);
        }
    }
    let mut cursor = tx.cursor_mut::<PlainAccountChangeSet>()?;
    for key in to_delete {
        cursor.seek_exact(&key)?;
        cursor.delete_current()?;
    }
    for (address, old_value) in restore {
        if old_value.is_empty() {
            tx.delete::<PlainAccountState>(address.as_slice())?;
        } else {
            tx.put::<PlainAccountState>(address.as_slice(), &old_value)?;
        }
    }
    Ok(())
}

fn unwind_storage<Tx: DbTxMut>(tx: &Tx, unwind_to: BlockNumber, checkpoint: BlockNumber) -> Result<()> {
    let mut restore: HashMap<(Address, B256), Vec<u8>> = HashMap::new();
    let mut to_delete: Vec<Vec<u8>> = Vec::new();
    {
        let mut cursor = tx.cursor::<PlainStorageChangeSet>()?;
        let start = storage_changeset_key(unwind_to + 1, Address::ZERO, B256::ZERO);
        let mut walker = cursor.walk(Some(&start))?;
        while let Some((key, old_value)) = walker.next()? {
            let (block, address, slot) = decode_storage_changeset_key(&key);
            if block > checkpoint {
                break;
            }
            restore.entry((address, slot)).or_insert(old_value);
            to_delete.push(key);
        }
    }
    let mut cursor = tx.cursor_mut::<PlainStorageChangeSet>()?;
    for key in to_delete {
        cursor.seek_exact(&key)?;
        cursor.delete_current()?;
    }
    for ((address, slot), old_value) in restore {
        tx.put::<PlainStorageState>(&storage_state_key(address, slot), &old_value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ridge_db::MemDatabase;
    use ridge_stages_api::{ExecInput, StageState, UnwindInput};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::source::InMemoryBlockSource;

    fn source_with_upserts(n: u64) -> Arc<InMemoryBlockSource> {
        let mut source = InMemoryBlockSource::new();
        for i in 0..n {
            let addr = Address::repeat_byte((i + 1) as u8);
            let diff = StateDiff {
                accounts: vec![(addr, AccountUpdate::Upsert { nonce: i + 1, balance: U256::from(i) })],
                storage: Vec::new(),
            };
            source.push_block(B256::ZERO, None, diff);
        }
        Arc::new(source)
    }

    #[test]
    fn applies_every_block_up_to_target() {
        let db = MemDatabase::open();
        let mut stage: StageDescriptor<MemDatabase> = execution_stage(source_with_upserts(3), 100);
        let state = StageState::new(&db, StageId::Execution, CancellationToken::new());
        let output = stage.execute(&db, &state, ExecInput { target: 3, checkpoint: 0 }).unwrap();
        assert!(output.done);

        let addr = Address::repeat_byte(1);
        let stored = db.view(|tx| tx.get::<PlainAccountState>(addr.as_slice())).unwrap();
        assert!(stored.is_some());
    }

    #[test]
    fn unwind_restores_prior_account_value() {
        let db = MemDatabase::open();
        let mut stage: StageDescriptor<MemDatabase> = execution_stage(source_with_upserts(2), 100);
        let state = StageState::new(&db, StageId::Execution, CancellationToken::new());
        stage.execute(&db, &state, ExecInput { target: 2, checkpoint: 0 }).unwrap();

        let addr = Address::repeat_byte(1);
        assert!(db.view(|tx| tx.get::<PlainAccountState>(addr.as_slice())).unwrap().is_some());

        stage.unwind(&db, UnwindInput { unwind_to: 0, checkpoint: 2 }).unwrap();
        assert!(db.view(|tx| tx.get::<PlainAccountState>(addr.as_slice())).unwrap().is_none());
    }
}
