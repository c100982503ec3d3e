use ridge_db_api::Database;
use ridge_primitives::{BlockNumber, StageId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    error::{Result, StageError},
    progress::{load_pending_unwind, load_progress, save_pending_unwind, save_progress, StageData, UnwindState},
    stage::{ExecInput, StageDescriptor, StageState, UnwindInput},
};

/// Drives a fixed, ordered list of stages to a target block height.
///
/// Resume protocol: on every [`Pipeline::run_to`] call, a pending unwind recorded by a
/// previous run that crashed mid-unwind is finished first, before any stage is asked to do
/// forward work. Only once no unwind is pending does the driver loop over stages in order.
pub struct Pipeline<DB: Database> {
    db: DB,
    stages: Vec<StageDescriptor<DB>>,
    cancel: CancellationToken,
}

impl<DB: Database + 'static> Pipeline<DB> {
    pub fn new(db: DB) -> Self {
        Self { db, stages: Vec::new(), cancel: CancellationToken::new() }
    }

    pub fn add_stage(&mut self, stage: StageDescriptor<DB>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn db(&self) -> &DB {
        &self.db
    }

    fn progress_of(&self, id: StageId) -> Result<BlockNumber> {
        Ok(self.db.view(|tx| load_progress(tx, id))?.block_number)
    }

    /// [`StageId::Execution`]'s own persisted progress. Stages in [`StageId::STATE_REQUIRED`]
    /// cap their effective target by this instead of trusting [`Pipeline::run_to`]'s literal
    /// target, since `PlainState` and the change-sets they read are only populated up to here.
    pub fn execution_at(&self) -> Result<BlockNumber> {
        self.progress_of(StageId::Execution)
    }

    /// Any pending unwind entry still on disk and the height it targets. Every stage's entry is
    /// written with the same `unwind_to` by [`Pipeline::unwind_to`], so finding one is enough to
    /// resume the whole unwind.
    fn pending_unwind(&self) -> Result<Option<BlockNumber>> {
        for stage in &self.stages {
            if let Some(state) = self.db.view(|tx| load_pending_unwind(tx, stage.id))? {
                return Ok(Some(state.unwind_to));
            }
        }
        Ok(None)
    }

    /// Runs the pipeline forward until every stage reports `done` at `target`, resuming any
    /// unwind left pending from a previous run first.
    pub fn run_to(&mut self, target: BlockNumber) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(StageError::Cancelled);
            }

            if let Some(unwind_to) = self.pending_unwind()? {
                info!(target: "sync::pipeline", unwind_to, "resuming unwind left pending by a previous run");
                self.unwind_to(unwind_to)?;
                continue;
            }

            let mut all_done = true;
            for idx in 0..self.stages.len() {
                if self.cancel.is_cancelled() {
                    return Err(StageError::Cancelled);
                }
                if !self.run_stage(idx, target)? {
                    all_done = false;
                }
            }
            if all_done {
                return Ok(());
            }
        }
    }

    /// The height a stage should run to this tick: the pipeline's requested target, capped by
    /// [`Pipeline::execution_at`] for any [`StageId::STATE_REQUIRED`] stage so it never reads
    /// `PlainState` or change-sets past what `Execution` has actually produced.
    fn effective_target(&self, id: StageId, target: BlockNumber) -> Result<BlockNumber> {
        if StageId::STATE_REQUIRED.contains(&id) {
            Ok(target.min(self.execution_at()?))
        } else {
            Ok(target)
        }
    }

    fn run_stage(&mut self, idx: usize, target: BlockNumber) -> Result<bool> {
        let id = self.stages[idx].id;
        let checkpoint = self.progress_of(id)?;
        let target = self.effective_target(id, target)?;
        if checkpoint >= target {
            return Ok(true);
        }
        let state = StageState::new(&self.db, id, self.cancel.clone());
        let input = ExecInput { target, checkpoint };
        debug!(target: "sync::pipeline", stage = %id, checkpoint, target, "executing stage");
        let output = self.stages[idx].execute(&self.db, &state, input)?;
        self.db.update(|tx| {
            save_progress(tx, id, &StageData { block_number: output.block_number, data: None })
        })?;
        Ok(output.done)
    }

    /// Unwinds every stage whose progress is ahead of `target`, in reverse pipeline order, so a
    /// later stage (further down the dependency chain) is always rolled back before the stage
    /// it derives data from. Records a pending entry for every stage up front so a crash partway
    /// through resumes from exactly where it left off, rather than from one shared flag that
    /// can't say which stages are already done.
    pub fn unwind_to(&mut self, target: BlockNumber) -> Result<()> {
        let ids: Vec<StageId> = self.stages.iter().map(|s| s.id).collect();
        self.db.update(|tx| {
            for &id in &ids {
                save_pending_unwind(tx, id, Some(&UnwindState { unwind_to: target, data: None }))?;
            }
            Ok(())
        })?;

        for idx in (0..self.stages.len()).rev() {
            if self.cancel.is_cancelled() {
                return Err(StageError::Cancelled);
            }
            let id = self.stages[idx].id;
            let checkpoint = self.progress_of(id)?;
            if checkpoint > target {
                info!(target: "sync::pipeline", stage = %id, from = checkpoint, to = target, "unwinding stage");
                let output = self.stages[idx].unwind(&self.db, UnwindInput { unwind_to: target, checkpoint })?;
                self.db.update(|tx| {
                    save_progress(tx, id, &StageData { block_number: output.block_number, data: None })
                })?;
            }
            self.db.update(|tx| save_pending_unwind(tx, id, None))?;
        }

        Ok(())
    }

    /// Whether every stage has already reached `target`.
    pub fn is_done(&self, target: BlockNumber) -> Result<bool> {
        for stage in &self.stages {
            if self.progress_of(stage.id)? < target {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
