use std::{
    cell::RefCell,
    sync::{Arc, Mutex, OnceLock},
};

use ridge_db_api::{Database, DbError, DbTx, DbTxMut, Result, Table};

use crate::{
    cursor::{Buckets, MemCursor, MemCursorMut},
    gc::GcHandle,
};

fn empty_bucket() -> &'static crate::cursor::BucketMap {
    static EMPTY: OnceLock<crate::cursor::BucketMap> = OnceLock::new();
    EMPTY.get_or_init(Default::default)
}

/// Reference in-process [`Database`] adapter: every bucket lives in a `BTreeMap` guarded by a
/// single mutex, and each transaction works against a cloned snapshot taken at `begin`/
/// `begin_mut` time.
///
/// This gives read transactions true snapshot isolation (a concurrent writer can never mutate
/// what a reader already observed) at the cost of an O(total size) clone per transaction — an
/// acceptable adapter-only tradeoff for the volumes this core's own tests exercise.
pub struct MemDatabase {
    state: Arc<Mutex<Buckets>>,
    gc: GcHandle,
}

impl MemDatabase {
    /// Opens a fresh, empty database and starts its background GC task.
    pub fn open() -> Self {
        Self { state: Arc::new(Mutex::new(Buckets::default())), gc: GcHandle::spawn() }
    }

    /// Signals the GC task to stop and waits for it to exit.
    ///
    /// Mirrors the lifecycle design note: `start on open, signal on close, join before close
    /// returns`.
    pub async fn close(self) {
        self.gc.shutdown().await;
    }
}

impl Default for MemDatabase {
    fn default() -> Self {
        Self::open()
    }
}

impl Database for MemDatabase {
    type Tx = MemTx;
    type TxMut = MemTxMut;

    fn begin(&self) -> Result<Self::Tx> {
        let snapshot = self.state.lock().expect("MemDatabase mutex poisoned").clone();
        Ok(MemTx { snapshot })
    }

    fn begin_mut(&self) -> Result<Self::TxMut> {
        let snapshot = self.state.lock().expect("MemDatabase mutex poisoned").clone();
        Ok(MemTxMut { writes: RefCell::new(snapshot), state: Arc::clone(&self.state) })
    }
}

/// Read-only transaction: an owned snapshot of every bucket as of `begin()`.
pub struct MemTx {
    snapshot: Buckets,
}

impl DbTx for MemTx {
    type Cursor<'tx, T: Table> = MemCursor<'tx, T>;

    fn get<T: Table>(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.snapshot.get(T::NAME).and_then(|m| m.get(key)).cloned())
    }

    fn cursor<T: Table>(&self) -> Result<Self::Cursor<'_, T>> {
        let map = self.snapshot.get(T::NAME).unwrap_or_else(|| empty_bucket());
        Ok(MemCursor::new(map))
    }

    fn abort(self) {}
}

/// Read/write transaction: a mutable snapshot that replaces the database's committed state
/// wholesale on [`DbTxMut::commit`].
pub struct MemTxMut {
    writes: RefCell<Buckets>,
    state: Arc<Mutex<Buckets>>,
}

impl DbTx for MemTxMut {
    type Cursor<'tx, T: Table> = MemCursorMut<'tx, T>;

    fn get<T: Table>(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.writes.borrow().get(T::NAME).and_then(|m| m.get(key)).cloned())
    }

    fn cursor<T: Table>(&self) -> Result<Self::Cursor<'_, T>> {
        Ok(MemCursorMut::new(&self.writes))
    }

    fn abort(self) {}
}

impl DbTxMut for MemTxMut {
    type CursorMut<'tx, T: Table> = MemCursorMut<'tx, T>;

    fn put<T: Table>(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.writes.borrow_mut().entry(T::NAME).or_default().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete<T: Table>(&self, key: &[u8]) -> Result<()> {
        if let Some(m) = self.writes.borrow_mut().get_mut(T::NAME) {
            m.remove(key);
        }
        Ok(())
    }

    fn clear<T: Table>(&self) -> Result<()> {
        self.writes.borrow_mut().entry(T::NAME).or_default().clear();
        Ok(())
    }

    fn cursor_mut<T: Table>(&self) -> Result<Self::CursorMut<'_, T>> {
        Ok(MemCursorMut::new(&self.writes))
    }

    fn commit(self) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| DbError::Io("mutex poisoned".to_string()))?;
        *state = self.writes.into_inner();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridge_db_api::{DbCursorRO, SyncStageProgress};

    #[test]
    fn put_then_read_back_across_transactions() {
        let db = MemDatabase::open();
        db.update(|tx| tx.put::<SyncStageProgress>(b"k", b"v")).unwrap();
        let got = db.view(|tx| tx.get::<SyncStageProgress>(b"k")).unwrap();
        assert_eq!(got, Some(b"v".to_vec()));
    }

    #[test]
    fn uncommitted_writes_are_invisible() {
        let db = MemDatabase::open();
        let tx = db.begin_mut().unwrap();
        tx.put::<SyncStageProgress>(b"k", b"v").unwrap();
        tx.abort();
        let got = db.view(|tx| tx.get::<SyncStageProgress>(b"k")).unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn cursor_walks_in_key_order() {
        let db = MemDatabase::open();
        db.update(|tx| {
            tx.put::<SyncStageProgress>(b"b", b"2")?;
            tx.put::<SyncStageProgress>(b"a", b"1")?;
            tx.put::<SyncStageProgress>(b"c", b"3")?;
            Ok(())
        })
        .unwrap();

        let keys = db
            .view(|tx| {
                let mut cursor = tx.cursor::<SyncStageProgress>()?;
                let mut walker = cursor.walk(None)?;
                let mut keys = Vec::new();
                while let Some((k, _)) = walker.next()? {
                    keys.push(k);
                }
                Ok(keys)
            })
            .unwrap();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn read_snapshot_is_isolated_from_concurrent_write() {
        let db = MemDatabase::open();
        db.update(|tx| tx.put::<SyncStageProgress>(b"k", b"v1")).unwrap();

        let reader = db.begin().unwrap();
        db.update(|tx| tx.put::<SyncStageProgress>(b"k", b"v2")).unwrap();

        assert_eq!(reader.get::<SyncStageProgress>(b"k").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(db.view(|tx| tx.get::<SyncStageProgress>(b"k")).unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn gc_handle_shuts_down_cleanly() {
        let db = MemDatabase::open();
        db.close().await;
    }
}
