use std::collections::HashSet;

use alloy_primitives::{keccak256, Address, B256, U256};
use ridge_db_api::{
    Database, DbCursorRO, DbTx, DbTxMut, HashedAccountState, HashedStorageState, PlainAccountChangeSet,
    PlainAccountState, PlainStorageChangeSet, PlainStorageState,
};
use ridge_primitives::{BlockNumber, StageId};
use ridge_stages_api::{ExecInput, ExecOutput, Result, StageDescriptor, StageError, UnwindInput, UnwindOutput};
use ridge_trie::TrieAccount;

use crate::{
    account::PlainAccount,
    keys::{
        account_changeset_key, decode_account_changeset_key, decode_storage_changeset_key,
        storage_changeset_key, storage_state_key,
    },
};

/// Derives `HashedAccountState`/`HashedStorageState` from `PlainAccountState`/`PlainStorageState`
/// for every address and slot touched by the change-sets in the processed block range.
///
/// The account leaf stored here carries a placeholder storage root
/// ([`TrieAccount::EMPTY_ROOT`]); `IntermediateHashes` overwrites it with the real computed
/// root before hashing, so the value this stage writes is never itself consensus-visible.
pub fn hash_state_stage<DB: Database + 'static>() -> StageDescriptor<DB> {
    StageDescriptor::new(
        StageId::HashState,
        |db, _state, input: ExecInput| {
            let tx = db.begin_mut()?;
            rehash_range(&tx, input.checkpoint, input.target)?;
            tx.commit()?;
            Ok(ExecOutput::done(input.target))
        },
        |db, input: UnwindInput| {
            let tx = db.begin_mut()?;
            rehash_range(&tx, input.unwind_to, input.checkpoint)?;
            tx.commit()?;
            Ok(UnwindOutput { block_number: input.unwind_to })
        },
    )
}

/// Resyncs the hashed tables for every address/slot touched in blocks `(from, to]`, reading
/// whatever `PlainAccountState`/`PlainStorageState` currently holds for them. Used both to
/// advance (reading post-execution state) and to unwind (reading state `Execution`'s own unwind
/// already restored) — the operation is the same either way, just over a range read in the
/// opposite direction by the caller.
fn rehash_range<Tx: DbTxMut>(tx: &Tx, from: BlockNumber, to: BlockNumber) -> Result<()> {
    let mut touched_accounts: HashSet<Address> = HashSet::new();
    {
        let mut cursor = tx.cursor::<PlainAccountChangeSet>()?;
        let start = account_changeset_key(from + 1, Address::ZERO);
        let mut walker = cursor.walk(Some(&start))?;
        while let Some((key, _)) = walker.next()? {
            let (block, address) = decode_account_changeset_key(&key);
            if block > to {
                break;
            }
            touched_accounts.insert(address);
        }
    }
    for address in touched_accounts {
        let hashed = keccak256(address.as_slice());
        match tx.get::<PlainAccountState>(address.as_slice())? {
            Some(bytes) => {
                let plain = PlainAccount::decode(&bytes)
                    .map_err(|e| StageError::Other(format!("corrupt PlainAccountState: {e}")))?;
                let account = TrieAccount {
                    nonce: plain.nonce,
                    balance: plain.balance,
                    storage_root: TrieAccount::EMPTY_ROOT,
                    code_hash: B256::ZERO,
                };
                tx.put::<HashedAccountState>(hashed.as_slice(), &account.rlp_bytes())?;
            }
            None => tx.delete::<HashedAccountState>(hashed.as_slice())?,
        }
    }

    let mut touched_slots: HashSet<(Address, B256)> = HashSet::new();
    {
        let mut cursor = tx.cursor::<PlainStorageChangeSet>()?;
        let start = storage_changeset_key(from + 1, Address::ZERO, B256::ZERO);
        let mut walker = cursor.walk(Some(&start))?;
        while let Some((key, _)) = walker.next()? {
            let (block, address, slot) = decode_storage_changeset_key(&key);
            if block > to {
                break;
            }
            touched_slots.insert((address, slot));
        }
    }
    for (address, slot) in touched_slots {
        let hashed_address = keccak256(address.as_slice());
        let hashed_slot = keccak256(slot.as_slice());
        let mut hashed_key = hashed_address.to_vec();
        hashed_key.extend_from_slice(hashed_slot.as_slice());

        let value = tx
            .get::<PlainStorageState>(&storage_state_key(address, slot))?
            .map(|bytes| U256::from_be_bytes::<32>(bytes.try_into().unwrap_or([0u8; 32])));
        match value {
            Some(v) if !v.is_zero() => {
                tx.put::<HashedStorageState>(&hashed_key, &alloy_rlp::encode(v))?;
            }
            _ => tx.delete::<HashedStorageState>(&hashed_key)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ridge_db::MemDatabase;
    use ridge_stages_api::{ExecInput, StageState};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::keys::storage_state_key;

    #[test]
    fn derives_hashed_account_from_a_touched_plain_account() {
        let db = MemDatabase::open();
        let addr = Address::repeat_byte(0x42);
        db.update(|tx| {
            let account = PlainAccount { nonce: 7, balance: U256::from(9) };
            tx.put::<PlainAccountState>(addr.as_slice(), &account.encode())?;
            tx.put::<PlainAccountChangeSet>(&account_changeset_key(1, addr), &[])
        })
        .unwrap();

        let mut stage: StageDescriptor<MemDatabase> = hash_state_stage();
        let state = StageState::new(&db, StageId::HashState, CancellationToken::new());
        stage.execute(&db, &state, ExecInput { target: 1, checkpoint: 0 }).unwrap();

        let hashed = keccak256(addr.as_slice());
        let stored = db.view(|tx| tx.get::<HashedAccountState>(hashed.as_slice())).unwrap();
        assert!(stored.is_some());
    }

    #[test]
    fn zero_valued_storage_slot_is_omitted_from_hashed_state() {
        let db = MemDatabase::open();
        let addr = Address::repeat_byte(0x11);
        let slot = B256::repeat_byte(0x01);
        db.update(|tx| {
            tx.put::<PlainStorageState>(&storage_state_key(addr, slot), &[0u8; 32])?;
            tx.put::<PlainStorageChangeSet>(&storage_changeset_key(1, addr, slot), &[])
        })
        .unwrap();

        let mut stage: StageDescriptor<MemDatabase> = hash_state_stage();
        let state = StageState::new(&db, StageId::HashState, CancellationToken::new());
        stage.execute(&db, &state, ExecInput { target: 1, checkpoint: 0 }).unwrap();

        let mut hashed_key = keccak256(addr.as_slice()).to_vec();
        hashed_key.extend_from_slice(keccak256(slot.as_slice()).as_slice());
        let stored = db.view(|tx| tx.get::<HashedStorageState>(&hashed_key)).unwrap();
        assert!(stored.is_none());
    }
}
