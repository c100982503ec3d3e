use ridge_db_api::{DbError, DbTx, DbTxMut, Result, SyncStageProgress, SyncStageUnwind, Table};
use ridge_primitives::{BlockNumber, StageId};
use serde::{Deserialize, Serialize};

/// A stage's persisted resume state: the last block number it fully processed, plus whatever
/// opaque bookkeeping it needs to resume mid-phase (e.g. the intermediate-hashes stage records
/// which of its two passes it was in).
///
/// `data` is deliberately opaque to the pipeline driver — only the stage that wrote it knows how
/// to interpret it, matching the "tagged record, no subtyping" design: the driver never inspects
/// stage-specific state, it only persists and hands back the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageData {
    pub block_number: BlockNumber,
    pub data: Option<Vec<u8>>,
}

fn decode_error(reason: impl ToString) -> DbError {
    DbError::Decode { bucket: SyncStageProgress::NAME, reason: reason.to_string() }
}

pub fn load_progress<Tx: DbTx>(tx: &Tx, id: StageId) -> Result<StageData> {
    match tx.get::<SyncStageProgress>(&[id.as_key_byte()])? {
        Some(bytes) => bincode::deserialize(&bytes).map_err(decode_error),
        None => Ok(StageData::default()),
    }
}

pub fn save_progress<Tx: DbTxMut>(tx: &Tx, id: StageId, progress: &StageData) -> Result<()> {
    let bytes = bincode::serialize(progress).map_err(decode_error)?;
    tx.put::<SyncStageProgress>(&[id.as_key_byte()], &bytes)
}

/// One stage's persisted pending-unwind entry: the height it must unwind down to, plus whatever
/// opaque resume data its own unwind phase left behind. Mirrors [`StageData`] rather than sharing
/// it verbatim because the two fields mean different things (an unwind *target*, not progress
/// already reached).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnwindState {
    pub unwind_to: BlockNumber,
    pub data: Option<Vec<u8>>,
}

/// The unwind target the pipeline is mid-way through applying for `id`, if any. Persisted per
/// stage, keyed exactly like [`SyncStageProgress`], so a crash between "decided to unwind" and
/// "every stage has unwound past the target" resumes each stage's own pending entry independently
/// instead of sharing one global flag across the whole pipeline.
pub fn load_pending_unwind<Tx: DbTx>(tx: &Tx, id: StageId) -> Result<Option<UnwindState>> {
    match tx.get::<SyncStageUnwind>(&[id.as_key_byte()])? {
        Some(bytes) => bincode::deserialize(&bytes).map(Some).map_err(decode_error),
        None => Ok(None),
    }
}

pub fn save_pending_unwind<Tx: DbTxMut>(tx: &Tx, id: StageId, state: Option<&UnwindState>) -> Result<()> {
    match state {
        Some(state) => {
            let bytes = bincode::serialize(state).map_err(decode_error)?;
            tx.put::<SyncStageUnwind>(&[id.as_key_byte()], &bytes)
        }
        None => tx.delete::<SyncStageUnwind>(&[id.as_key_byte()]),
    }
}
