use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    marker::PhantomData,
    ops::Bound,
};

use ridge_db_api::{DbCursorRO, DbCursorRW, DbError, Result, Table};

pub(crate) type BucketMap = BTreeMap<Vec<u8>, Vec<u8>>;
pub(crate) type Buckets = HashMap<&'static str, BucketMap>;

/// Read-only cursor over a snapshot `BTreeMap`.
pub struct MemCursor<'tx, T: Table> {
    map: &'tx BucketMap,
    pos: Option<Vec<u8>>,
    _marker: PhantomData<T>,
}

impl<'tx, T: Table> MemCursor<'tx, T> {
    pub(crate) fn new(map: &'tx BucketMap) -> Self {
        Self { map, pos: None, _marker: PhantomData }
    }
}

impl<T: Table> DbCursorRO<T> for MemCursor<'_, T> {
    fn first(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let entry = self.map.iter().next().map(|(k, v)| (k.clone(), v.clone()));
        self.pos = entry.as_ref().map(|(k, _)| k.clone());
        Ok(entry)
    }

    fn seek(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let entry = self
            .map
            .range((Bound::Included(key.to_vec()), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()));
        self.pos = entry.as_ref().map(|(k, _)| k.clone());
        Ok(entry)
    }

    fn seek_exact(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let entry = self.map.get(key).map(|v| (key.to_vec(), v.clone()));
        self.pos = entry.as_ref().map(|(k, _)| k.clone());
        Ok(entry)
    }

    fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let Some(cur) = self.pos.clone() else { return self.first() };
        let entry = self
            .map
            .range((Bound::Excluded(cur), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()));
        self.pos = entry.as_ref().map(|(k, _)| k.clone());
        Ok(entry)
    }

    fn current(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match &self.pos {
            Some(k) => Ok(self.map.get(k).map(|v| (k.clone(), v.clone()))),
            None => Ok(None),
        }
    }

    fn last(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let entry = self.map.iter().next_back().map(|(k, v)| (k.clone(), v.clone()));
        self.pos = entry.as_ref().map(|(k, _)| k.clone());
        Ok(entry)
    }
}

/// Read/write cursor over the transaction-local bucket map, mutating it in place.
///
/// Holds a reference to the *whole* [`Buckets`] map (not just its own bucket) because the
/// transaction keeps every bucket behind a single `RefCell` — simpler than per-bucket interior
/// mutability and sufficient since the driver never runs two stages concurrently.
pub struct MemCursorMut<'tx, T: Table> {
    buckets: &'tx RefCell<Buckets>,
    pos: Option<Vec<u8>>,
    _marker: PhantomData<T>,
}

impl<'tx, T: Table> MemCursorMut<'tx, T> {
    pub(crate) fn new(buckets: &'tx RefCell<Buckets>) -> Self {
        Self { buckets, pos: None, _marker: PhantomData }
    }
}

impl<T: Table> DbCursorRO<T> for MemCursorMut<'_, T> {
    fn first(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let entry = self
            .buckets
            .borrow()
            .get(T::NAME)
            .and_then(|m| m.iter().next().map(|(k, v)| (k.clone(), v.clone())));
        self.pos = entry.as_ref().map(|(k, _)| k.clone());
        Ok(entry)
    }

    fn seek(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let entry = self.buckets.borrow().get(T::NAME).and_then(|m| {
            m.range((Bound::Included(key.to_vec()), Bound::Unbounded))
                .next()
                .map(|(k, v)| (k.clone(), v.clone()))
        });
        self.pos = entry.as_ref().map(|(k, _)| k.clone());
        Ok(entry)
    }

    fn seek_exact(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let entry = self
            .buckets
            .borrow()
            .get(T::NAME)
            .and_then(|m| m.get(key).map(|v| (key.to_vec(), v.clone())));
        self.pos = entry.as_ref().map(|(k, _)| k.clone());
        Ok(entry)
    }

    fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let Some(cur) = self.pos.clone() else { return self.first() };
        let entry = self.buckets.borrow().get(T::NAME).and_then(|m| {
            m.range((Bound::Excluded(cur), Bound::Unbounded))
                .next()
                .map(|(k, v)| (k.clone(), v.clone()))
        });
        self.pos = entry.as_ref().map(|(k, _)| k.clone());
        Ok(entry)
    }

    fn current(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match &self.pos {
            Some(k) => {
                Ok(self.buckets.borrow().get(T::NAME).and_then(|m| m.get(k)).map(|v| (k.clone(), v.clone())))
            }
            None => Ok(None),
        }
    }

    fn last(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let entry = self
            .buckets
            .borrow()
            .get(T::NAME)
            .and_then(|m| m.iter().next_back().map(|(k, v)| (k.clone(), v.clone())));
        self.pos = entry.as_ref().map(|(k, _)| k.clone());
        Ok(entry)
    }
}

impl<T: Table> DbCursorRW<T> for MemCursorMut<'_, T> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.buckets.borrow_mut().entry(T::NAME).or_default().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        {
            let buckets = self.buckets.borrow();
            if let Some(last) = buckets.get(T::NAME).and_then(|m| m.keys().next_back()) {
                if last.as_slice() >= key {
                    return Err(DbError::Decode {
                        bucket: T::NAME,
                        reason: "append() called out of order".to_string(),
                    });
                }
            }
        }
        self.buckets.borrow_mut().entry(T::NAME).or_default().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete_current(&mut self) -> Result<()> {
        if let Some(k) = &self.pos {
            if let Some(m) = self.buckets.borrow_mut().get_mut(T::NAME) {
                m.remove(k);
            }
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.buckets.borrow_mut().entry(T::NAME).or_default().clear();
        self.pos = None;
        Ok(())
    }
}
