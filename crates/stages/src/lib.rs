//! Concrete stage implementations and the default pipeline assembly.
//!
//! [`stages::headers_stage`], [`stages::block_hashes_stage`], [`stages::execution_stage`],
//! [`stages::hash_state_stage`], and [`stages::intermediate_hashes_stage`] carry real state;
//! the bodies/senders/history indexers/tx-pool/finish stages behind [`stages::minimal_stage`]
//! exist only to round out the pipeline without a real network or EVM.

mod account;
mod keys;
mod sets;
mod source;
mod stages;

pub use sets::default_pipeline;
pub use source::{AccountUpdate, BlockSource, InMemoryBlockSource, StateDiff};
pub use stages::{
    block_hashes_stage, execution_stage, finish_stage, hash_state_stage, headers_stage,
    intermediate_hashes_stage, minimal_stage,
};
