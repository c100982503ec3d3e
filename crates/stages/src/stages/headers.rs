use std::sync::Arc;

use ridge_db_api::Database;
use ridge_primitives::StageId;
use ridge_stages_api::{ExecInput, ExecOutput, StageDescriptor, UnwindInput, UnwindOutput};

use crate::source::BlockSource;

/// Advances to whichever is lower: the pipeline's requested target, or how far `source` has
/// actually reached. Reports `done = false` when the source is the limiting factor, so the
/// driver knows to stop looping rather than spin forever waiting for headers that aren't there
/// yet — the real-network equivalent of "caught up to the peer's reported tip".
pub fn headers_stage<DB: Database + 'static>(source: Arc<dyn BlockSource>) -> StageDescriptor<DB> {
    StageDescriptor::new(
        StageId::Headers,
        move |_db, _state, input: ExecInput| {
            let reachable = source.tip().min(input.target);
            Ok(ExecOutput { block_number: reachable, done: reachable >= input.target })
        },
        |_db, input: UnwindInput| Ok(UnwindOutput { block_number: input.unwind_to }),
    )
}
