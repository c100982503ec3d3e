use crate::{error::Result, table::Table};

/// Read-only cursor over a [`Table`]'s key space, honoring the owning transaction's
/// cancellation signal on every step.
pub trait DbCursorRO<T: Table> {
    /// Seek to the first entry.
    fn first(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
    /// Seek to the first entry with a key `>= key`.
    fn seek(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
    /// Seek to the entry with exactly this key.
    fn seek_exact(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
    /// Advance to the next entry in key order.
    fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
    /// The entry the cursor currently rests on, if any.
    fn current(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
    /// The last entry in the table, used to seed reverse walks.
    fn last(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// Walk forward from `start_key` (inclusive), or from the first entry if `None`.
    ///
    /// Returns an iterator-like [`Walker`] rather than a real `Iterator` so that callers can
    /// propagate [`crate::error::DbError`] (including `Cancelled`) instead of panicking mid-walk.
    fn walk(&mut self, start_key: Option<&[u8]>) -> Result<Walker<'_, T, Self>>
    where
        Self: Sized,
    {
        let first = match start_key {
            Some(k) => self.seek(k)?,
            None => self.first()?,
        };
        Ok(Walker { cursor: self, next: first, _marker: std::marker::PhantomData })
    }
}

/// Read/write cursor, additionally able to mutate the table in place.
pub trait DbCursorRW<T: Table>: DbCursorRO<T> {
    /// Insert or overwrite `key -> value`. May be used out of key order; prefer
    /// [`DbCursorRW::append`] when writing in ascending order for efficiency.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    /// Insert `key -> value`, asserting `key` is greater than every key written so far.
    fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    /// Delete the entry the cursor currently rests on.
    fn delete_current(&mut self) -> Result<()>;
    /// Clear every entry in the table.
    fn clear(&mut self) -> Result<()>;
}

/// Lazy forward iterator produced by [`DbCursorRO::walk`].
///
/// Modeled as an explicit struct (rather than relying on `impl Iterator`) so it can be polled
/// inside suspension-point checks per the concurrency model: every `next()` call is a natural
/// place to test a [`tokio_util::sync::CancellationToken`] before doing more KV work.
pub struct Walker<'c, T: Table, C: DbCursorRO<T> + ?Sized> {
    cursor: &'c mut C,
    next: Option<(Vec<u8>, Vec<u8>)>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Table, C: DbCursorRO<T> + ?Sized> Walker<'_, T, C> {
    /// Returns the next `(key, value)` pair, or `None` once the table is exhausted.
    pub fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let current = self.next.take();
        if current.is_some() {
            self.next = self.cursor.next()?;
        }
        Ok(current)
    }
}
