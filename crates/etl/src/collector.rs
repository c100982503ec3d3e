use std::path::PathBuf;

use ridge_db_api::{DbTxMut, Table};
use tracing::debug;

use crate::{
    buffer::Buffer,
    error::Result,
    spill::{write_run, MergeStream, RunReader},
};

/// Accumulates `(key, value)` pairs, spilling bounded-size sorted runs to `tmp_dir` once the
/// in-memory buffer fills, then replays everything back out in global sorted order.
///
/// This is the "load-only" half of the ETL pipeline described for standalone collectors (e.g.
/// the intermediate-hash loader writes directly through a [`Collector`] without a paired
/// `Transform` extract phase).
pub struct Collector<B: Buffer> {
    buffer: B,
    buffer_cap: usize,
    tmp_dir: PathBuf,
    runs: Vec<PathBuf>,
    total_entries: usize,
}

impl<B: Buffer> Collector<B> {
    pub fn new(tmp_dir: impl Into<PathBuf>, buffer_cap: usize) -> Self {
        Self { buffer: B::default(), buffer_cap, tmp_dir: tmp_dir.into(), runs: Vec::new(), total_entries: 0 }
    }

    /// Records one key/value pair, spilling the current buffer to a run file if it is now full.
    pub fn collect(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.buffer.insert(key, value);
        self.total_entries += 1;
        if self.buffer.size_bytes() >= self.buffer_cap {
            self.spill()?;
        }
        Ok(())
    }

    fn spill(&mut self) -> Result<()> {
        let buffer = std::mem::replace(&mut self.buffer, B::default());
        let sorted = buffer.into_sorted();
        if sorted.is_empty() {
            return Ok(());
        }
        debug!(target: "sync::etl::collector", entries = sorted.len(), "spilling buffer to run file");
        let path = write_run(&self.tmp_dir, &sorted)?;
        self.runs.push(path);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.total_entries
    }

    pub fn is_empty(&self) -> bool {
        self.total_entries == 0
    }

    /// Merges every spilled run with the remaining in-memory buffer and writes the result into
    /// `dst` through `tx`, calling `on_commit` after every `commit_every` records so the caller
    /// can persist a resume checkpoint in the same transaction.
    pub fn load<Tx, Dst, F>(self, tx: &Tx, commit_every: usize, mut on_commit: F) -> Result<()>
    where
        Tx: DbTxMut,
        Dst: Table,
        F: FnMut(&[u8], bool) -> Result<()>,
    {
        let tail = self.buffer.into_sorted();
        let readers = self
            .runs
            .into_iter()
            .map(RunReader::open)
            .collect::<Result<Vec<_>>>()?;
        let mut merge = MergeStream::new(readers, tail)?;

        let mut since_commit = 0usize;
        let mut last_key: Option<Vec<u8>> = None;
        while let Some((key, value)) = merge.next()? {
            tx.put::<Dst>(&key, &value)?;
            since_commit += 1;
            last_key = Some(key);
            if commit_every > 0 && since_commit >= commit_every {
                on_commit(last_key.as_deref().unwrap(), false)?;
                since_commit = 0;
            }
        }
        if let Some(key) = last_key {
            on_commit(&key, true)?;
        } else {
            on_commit(&[], true)?;
        }
        Ok(())
    }
}
