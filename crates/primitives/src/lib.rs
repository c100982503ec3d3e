//! Primitive types shared by every layer of the staged-sync core.

mod stage_id;

pub use stage_id::StageId;

/// A block height. The genesis block is `0`.
pub type BlockNumber = u64;
