use crate::{
    error::Result,
    transaction::{DbTx, DbTxMut},
};

/// A transactional, ordered byte-keyed, byte-valued map partitioned into named buckets.
///
/// This is the entire surface the staged-sync core needs from the underlying storage engine.
/// A production embedded engine (an LMDB/MDBX-family store) implements this trait directly;
/// [`ridge_db`](https://docs.rs/ridge-db) ships a reference in-process adapter sufficient to
/// run the driver and its tests.
pub trait Database: Send + Sync {
    /// Read-only transaction type.
    type Tx: DbTx;
    /// Read/write transaction type.
    type TxMut: DbTxMut;

    /// Begin a read-only transaction.
    fn begin(&self) -> Result<Self::Tx>;
    /// Begin a read/write transaction.
    fn begin_mut(&self) -> Result<Self::TxMut>;

    /// Run `f` inside a read-only transaction, aborting it afterwards regardless of outcome.
    fn view<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Self::Tx) -> Result<R>,
    {
        let tx = self.begin()?;
        let result = f(&tx);
        tx.abort();
        result
    }

    /// Run `f` inside a read/write transaction, committing on `Ok` and leaving the
    /// transaction to drop (discarding writes) on `Err`.
    fn update<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Self::TxMut) -> Result<R>,
    {
        let tx = self.begin_mut()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}
