//! Reference adapter for [`ridge_db_api::Database`].
//!
//! This is not meant to compete with a production embedded engine (MDBX, RocksDB, etc) — it
//! holds everything in an `Arc<Mutex<_>>` of `BTreeMap`s and clones a whole-database snapshot
//! per transaction. The staged-sync core only ever needs correctness and clear transaction
//! boundaries from its KV store, not throughput, so a reference adapter is all this crate aims
//! to be.

mod cursor;
mod gc;
mod memory;

pub use gc::GcHandle;
pub use memory::{MemDatabase, MemTx, MemTxMut};
