use std::sync::Arc;

use ridge_config::StageConfig;
use ridge_db_api::Database;
use ridge_primitives::StageId;
use ridge_stages_api::Pipeline;

use crate::{
    source::BlockSource,
    stages::{
        block_hashes_stage, execution_stage, finish_stage, hash_state_stage, headers_stage,
        intermediate_hashes_stage, minimal_stage,
    },
};

/// Assembles a [`Pipeline`] with every stage in [`StageId::ALL`] order.
///
/// `Bodies` and `Senders` have no real work to do without a network/EVM stack and are
/// represented by [`minimal_stage`]; `Execution` is the one collaborator `IntermediateHashes`
/// actually depends on, so it gets a real implementation driven by `source`. `HashState` must
/// run before `IntermediateHashes` so the trie pass sees a hashed view that already reflects the
/// range it's about to hash — see [`intermediate_hashes_stage`] for how unwind order is handled.
pub fn default_pipeline<DB: Database + 'static>(
    db: DB,
    source: Arc<dyn BlockSource>,
    config: &StageConfig,
) -> Pipeline<DB> {
    let mut pipeline = Pipeline::new(db);
    pipeline
        .add_stage(headers_stage(source.clone()))
        .add_stage(block_hashes_stage(source.clone()))
        .add_stage(minimal_stage(StageId::Bodies))
        .add_stage(minimal_stage(StageId::Senders))
        .add_stage(execution_stage(source, config.execution.commit_threshold))
        .add_stage(hash_state_stage())
        .add_stage(intermediate_hashes_stage(config.intermediate_hashes.commit_threshold))
        .add_stage(minimal_stage(StageId::AccountHistoryIndex))
        .add_stage(minimal_stage(StageId::StorageHistoryIndex))
        .add_stage(minimal_stage(StageId::TxLookup))
        .add_stage(minimal_stage(StageId::TxPool))
        .add_stage(finish_stage());
    pipeline
}
