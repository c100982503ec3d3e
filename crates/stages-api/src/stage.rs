use ridge_db_api::Database;
use ridge_primitives::{BlockNumber, StageId};
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    progress::{load_progress, save_progress, StageData},
};

/// What a stage is asked to do on one pipeline tick.
#[derive(Debug, Clone, Copy)]
pub struct ExecInput {
    /// The block height the stage should try to reach. Bounded by the tip the downloading
    /// stages have reached and, for state-derived stages, by [`StageId::Execution`]'s own
    /// progress — a stage never runs ahead of the data it depends on.
    pub target: BlockNumber,
    /// The stage's own progress before this call.
    pub checkpoint: BlockNumber,
}

/// What a stage reports back after one tick.
#[derive(Debug, Clone, Copy)]
pub struct ExecOutput {
    pub block_number: BlockNumber,
    /// `true` once the stage has reached `target` and has nothing left to do until more data
    /// arrives upstream.
    pub done: bool,
}

impl ExecOutput {
    pub fn done(block_number: BlockNumber) -> Self {
        Self { block_number, done: true }
    }

    pub fn not_done(block_number: BlockNumber) -> Self {
        Self { block_number, done: false }
    }
}

/// What a stage is asked to undo.
#[derive(Debug, Clone, Copy)]
pub struct UnwindInput {
    /// Roll back to this height (exclusive: blocks `> unwind_to` are undone).
    pub unwind_to: BlockNumber,
    /// The stage's progress before unwinding.
    pub checkpoint: BlockNumber,
}

#[derive(Debug, Clone, Copy)]
pub struct UnwindOutput {
    pub block_number: BlockNumber,
}

/// A handle a stage's `exec` closure uses to persist progress mid-execution, independent of
/// when the closure itself returns to the driver.
///
/// Grounded on the observation that real staged-sync implementations already commit multiple
/// times inside one `execute()` call (e.g. once per ETL commit-threshold batch) rather than
/// only once at the end — `StageState` makes that pattern explicit instead of ad hoc.
pub struct StageState<'d, DB: Database> {
    db: &'d DB,
    id: StageId,
    cancel: CancellationToken,
}

impl<'d, DB: Database> StageState<'d, DB> {
    pub fn new(db: &'d DB, id: StageId, cancel: CancellationToken) -> Self {
        Self { db, id, cancel }
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Current persisted progress, including any opaque resume data a prior partial run left
    /// behind.
    pub fn progress(&self) -> Result<StageData> {
        Ok(self.db.view(|tx| load_progress(tx, self.id))?)
    }

    /// Persists `block_number` as the stage's new progress, clearing any opaque resume data —
    /// use this once a phase has fully completed.
    pub fn update(&self, block_number: BlockNumber) -> Result<()> {
        let progress = StageData { block_number, data: None };
        Ok(self.db.update(|tx| save_progress(tx, self.id, &progress))?)
    }

    /// Persists `block_number` together with opaque mid-phase resume data.
    pub fn update_with_data(&self, block_number: BlockNumber, data: Vec<u8>) -> Result<()> {
        let progress = StageData { block_number, data: Some(data) };
        Ok(self.db.update(|tx| save_progress(tx, self.id, &progress))?)
    }
}

type ExecFn<DB> = Box<dyn FnMut(&DB, &StageState<'_, DB>, ExecInput) -> Result<ExecOutput> + Send>;
type UnwindFn<DB> = Box<dyn FnMut(&DB, UnwindInput) -> Result<UnwindOutput> + Send>;

/// A stage as the pipeline sees it: an id plus two function pointers. No trait object, no
/// subtyping — the driver dispatches by calling the stored closures directly, and all
/// stage-specific state lives in the closures' captured environment.
pub struct StageDescriptor<DB: Database> {
    pub id: StageId,
    exec: ExecFn<DB>,
    unwind: UnwindFn<DB>,
}

impl<DB: Database + 'static> StageDescriptor<DB> {
    pub fn new(
        id: StageId,
        exec: impl FnMut(&DB, &StageState<'_, DB>, ExecInput) -> Result<ExecOutput> + Send + 'static,
        unwind: impl FnMut(&DB, UnwindInput) -> Result<UnwindOutput> + Send + 'static,
    ) -> Self {
        Self { id, exec: Box::new(exec), unwind: Box::new(unwind) }
    }

    pub fn execute(&mut self, db: &DB, state: &StageState<'_, DB>, input: ExecInput) -> Result<ExecOutput> {
        (self.exec)(db, state, input)
    }

    pub fn unwind(&mut self, db: &DB, input: UnwindInput) -> Result<UnwindOutput> {
        (self.unwind)(db, input)
    }
}
