//! Disk-spilling extract/transform/load engine.
//!
//! Stages with output too large to sort in memory (change-sets, history indexes, intermediate
//! trie hashes) route their writes through here instead of a plain cursor-put loop: records are
//! buffered up to a byte budget, spilled to a sorted run file on disk once the budget is hit,
//! and finally k-way merged back into ascending key order for the load phase. This keeps peak
//! memory bounded regardless of how many blocks a stage processes in one pass.

mod buffer;
mod collector;
mod error;
mod spill;
mod transform;

pub use buffer::{Buffer, PlainTextBuffer, SortableAppendBuffer, SortableBuffer, DEFAULT_BUFFER_SIZE, HASH_COLLECTOR_BUFFER_SIZE};
pub use collector::Collector;
pub use error::{EtlError, Result};
pub use transform::{transform, TransformArgs};
