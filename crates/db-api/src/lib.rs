//! Trait-only abstraction over an embedded, transactional, ordered byte-keyed store.
//!
//! The staged-sync core is deliberately written against this interface instead of a concrete
//! storage engine, which it treats as an abstract transactional ordered byte-map. [`ridge_db`]
//! provides one reference adapter.

mod cursor;
mod database;
mod error;
mod table;
mod transaction;

pub use cursor::{DbCursorRO, DbCursorRW, Walker};
pub use database::Database;
pub use error::{DbError, Result};
pub use table::{
    CanonicalHeaders, HashedAccountState, HashedStorageState, HeaderStateRoots,
    IntermediateTrieHash, PlainAccountChangeSet, PlainAccountState, PlainStorageChangeSet,
    PlainStorageState, SyncStageProgress, SyncStageUnwind, Table,
};
pub use transaction::{DbTx, DbTxMut};
