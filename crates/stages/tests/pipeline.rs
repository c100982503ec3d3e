use std::sync::Arc;

use alloy_primitives::{Address, U256};
use ridge_config::StageConfig;
use ridge_db::MemDatabase;
use ridge_db_api::Database;
use ridge_primitives::StageId;
use ridge_stages::{default_pipeline, AccountUpdate, InMemoryBlockSource, StateDiff};

fn source_with_blocks(n: u64) -> Arc<InMemoryBlockSource> {
    let mut source = InMemoryBlockSource::new();
    for i in 0..n {
        let addr = Address::repeat_byte((i + 1) as u8);
        let diff = StateDiff {
            accounts: vec![(addr, AccountUpdate::Upsert { nonce: i + 1, balance: U256::from(i + 1) })],
            storage: Vec::new(),
        };
        source.push_block([0u8; 32].into(), None, diff);
    }
    Arc::new(source)
}

#[test]
fn full_pipeline_runs_every_stage_to_target() {
    let db = MemDatabase::open();
    let source = source_with_blocks(5);
    let config = StageConfig::default();
    let mut pipeline = default_pipeline(db, source, &config);

    pipeline.run_to(5).unwrap();

    assert!(pipeline.is_done(5).unwrap());
    // Running again to the same target must be a no-op.
    pipeline.run_to(5).unwrap();
    assert!(pipeline.is_done(5).unwrap());
}

#[test]
fn pipeline_unwind_then_resume_reaches_target_again() {
    let db = MemDatabase::open();
    let source = source_with_blocks(5);
    let config = StageConfig::default();
    let mut pipeline = default_pipeline(db, source, &config);

    pipeline.run_to(5).unwrap();
    pipeline.unwind_to(2).unwrap();
    assert!(pipeline.is_done(2).unwrap());
    assert!(!pipeline.is_done(5).unwrap());

    pipeline.run_to(5).unwrap();
    assert!(pipeline.is_done(5).unwrap());
}

#[test]
fn execution_state_is_queryable_after_run() {
    let db = MemDatabase::open();
    let source = source_with_blocks(3);
    let config = StageConfig::default();
    let mut pipeline = default_pipeline(db, source, &config);
    pipeline.run_to(3).unwrap();

    let addr = Address::repeat_byte(1);
    let found = pipeline
        .db()
        .view(|tx| {
            use ridge_db_api::{DbTx, PlainAccountState};
            tx.get::<PlainAccountState>(addr.as_slice())
        })
        .unwrap();
    assert!(found.is_some(), "block 1's account update should be reflected in PlainAccountState");
}

#[test]
fn unwind_restores_account_state_touched_only_by_rolled_back_blocks() {
    let db = MemDatabase::open();
    let source = source_with_blocks(3);
    let config = StageConfig::default();
    let mut pipeline = default_pipeline(db, source, &config);
    pipeline.run_to(3).unwrap();
    pipeline.unwind_to(0).unwrap();

    let addr = Address::repeat_byte(1);
    let found = pipeline
        .db()
        .view(|tx| {
            use ridge_db_api::{DbTx, PlainAccountState};
            tx.get::<PlainAccountState>(addr.as_slice())
        })
        .unwrap();
    assert!(found.is_none(), "unwinding to genesis must remove every account this run created");
    let progress = pipeline
        .db()
        .view(|tx| ridge_stages_api::load_progress(tx, StageId::Execution))
        .unwrap();
    assert_eq!(progress.block_number, 0);
}
