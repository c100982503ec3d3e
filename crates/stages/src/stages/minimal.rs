use ridge_db_api::Database;
use ridge_primitives::StageId;
use ridge_stages_api::{ExecInput, ExecOutput, StageDescriptor, UnwindInput, UnwindOutput};

/// A stage with no state of its own: it only tracks progress up to `target` and undoes nothing
/// on unwind beyond moving its own checkpoint back.
///
/// Stands in for the several collaborator stages this core doesn't need to make "real" to
/// exercise the staged-sync/ETL/trie core correctly (Bodies, Senders, the history indexers,
/// TxLookup, TxPool, Finish) — each would do real work in front of a real EVM/network stack,
/// but none of them feed anything this core's invariants depend on.
pub fn minimal_stage<DB: Database + 'static>(id: StageId) -> StageDescriptor<DB> {
    StageDescriptor::new(
        id,
        |_db, _state, input: ExecInput| Ok(ExecOutput::done(input.target)),
        |_db, input: UnwindInput| Ok(UnwindOutput { block_number: input.unwind_to }),
    )
}
