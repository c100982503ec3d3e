use ridge_db_api::Database;
use ridge_primitives::StageId;
use ridge_stages_api::StageDescriptor;

use super::minimal::minimal_stage;

/// Terminal, no-op stage marking a completed pass over the whole pipeline.
pub fn finish_stage<DB: Database + 'static>() -> StageDescriptor<DB> {
    minimal_stage(StageId::Finish)
}
