use crate::{
    cursor::{DbCursorRO, DbCursorRW},
    error::Result,
    table::Table,
};

/// A read-only view of the store, valid for the lifetime of the transaction.
pub trait DbTx {
    /// Cursor type returned for any table. Concrete adapters use a single cursor type
    /// parameterized by the bucket name at runtime; the [`Table`] type parameter only
    /// disambiguates at the call site.
    type Cursor<'tx, T: Table>: DbCursorRO<T>
    where
        Self: 'tx;

    /// Point lookup. `Ok(None)` means the key is absent — this is never an error.
    fn get<T: Table>(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Open a cursor over `T`.
    fn cursor<T: Table>(&self) -> Result<Self::Cursor<'_, T>>;

    /// Release the transaction's resources without committing (a no-op for read-only
    /// transactions, but still required so cancellation can free the MVCC snapshot promptly).
    fn abort(self);
}

/// A read/write transaction. Writes are only durable once [`DbTxMut::commit`] returns `Ok`.
pub trait DbTxMut: DbTx {
    /// Read/write cursor type.
    type CursorMut<'tx, T: Table>: DbCursorRW<T>
    where
        Self: 'tx;

    /// Insert or overwrite `key -> value`.
    fn put<T: Table>(&self, key: &[u8], value: &[u8]) -> Result<()>;
    /// Remove `key`, if present. Removing an absent key is not an error.
    fn delete<T: Table>(&self, key: &[u8]) -> Result<()>;
    /// Remove every entry in `T`.
    fn clear<T: Table>(&self) -> Result<()>;
    /// Open a read/write cursor over `T`.
    fn cursor_mut<T: Table>(&self) -> Result<Self::CursorMut<'_, T>>;

    /// Durably commit every write issued through this transaction.
    ///
    /// Per the concurrency model, a write transaction is the unit of atomicity between a
    /// stage's own resume-state write (`StageData`) and whatever data it produced in the same
    /// call — both must land in the same `commit()`.
    fn commit(self) -> Result<()>;
}
