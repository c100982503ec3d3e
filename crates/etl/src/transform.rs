use std::path::PathBuf;

use ridge_db_api::{DbCursorRO, DbTx, DbTxMut, Table};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    buffer::Buffer,
    collector::Collector,
    error::{EtlError, Result},
};

/// Parameters controlling one `transform` run.
pub struct TransformArgs {
    /// Resume the extract phase's source-bucket walk from this key (exclusive), if set.
    pub extract_start_key: Option<Vec<u8>>,
    /// Number of destination records to write before calling `on_commit` again.
    pub commit_every: usize,
    /// Cooperative cancellation, checked once per extracted source record.
    pub cancel: CancellationToken,
}

impl Default for TransformArgs {
    fn default() -> Self {
        Self { extract_start_key: None, commit_every: 10_000, cancel: CancellationToken::new() }
    }
}

/// Extracts every record at or after `extract_start_key` from `Src`, feeds each through
/// `extract`, spills the buffered results to `tmp_dir`, then merges and loads them into `Dst`
/// through `tx`.
///
/// `extract` receives the source key/value and a `&mut Collector` it may call zero or more
/// times — most stages emit exactly one transformed record per source record, but e.g. the
/// storage history indexer emits one record per (account, slot) touched within a source
/// change-set entry.
///
/// `on_commit` is invoked after every `args.commit_every` loaded records (and once more at the
/// very end with `is_done = true`) so the caller can persist a `StageData` checkpoint in the
/// same transaction as the records it describes.
pub fn transform<Tx, Src, Dst, B, E, L>(
    tx: &Tx,
    tmp_dir: impl Into<PathBuf>,
    buffer_cap: usize,
    args: TransformArgs,
    mut extract: E,
    mut on_commit: L,
) -> Result<()>
where
    Tx: DbTxMut,
    Src: Table,
    Dst: Table,
    B: Buffer,
    E: FnMut(&[u8], &[u8], &mut Collector<B>) -> Result<()>,
    L: FnMut(&[u8], bool) -> Result<()>,
{
    let mut collector: Collector<B> = Collector::new(tmp_dir, buffer_cap);

    let mut cursor = tx.cursor::<Src>()?;
    let mut entry = match &args.extract_start_key {
        Some(start) => match cursor.seek(start)? {
            Some((k, _)) if k.as_slice() == start.as_slice() => cursor.next()?,
            other => other,
        },
        None => cursor.first()?,
    };

    let mut extracted = 0usize;
    while let Some((key, value)) = entry {
        if args.cancel.is_cancelled() {
            return Err(EtlError::Cancelled);
        }
        extract(&key, &value, &mut collector)?;
        extracted += 1;
        entry = cursor.next()?;
    }
    debug!(target: "sync::etl::transform", extracted, "extract phase complete");

    collector.load::<Tx, Dst, _>(tx, args.commit_every, &mut on_commit)
}

#[cfg(test)]
mod tests {
    use ridge_db::MemDatabase;
    use ridge_db_api::{Database, PlainAccountChangeSet, PlainAccountState};

    use super::*;
    use crate::buffer::SortableBuffer;

    #[test]
    fn transform_extracts_sorts_and_loads() {
        let db = MemDatabase::open();
        db.update(|tx| {
            tx.put::<PlainAccountChangeSet>(b"\x00\x00\x00\x00\x00\x00\x00\x01-addr-a", b"old-a")?;
            tx.put::<PlainAccountChangeSet>(b"\x00\x00\x00\x00\x00\x00\x00\x02-addr-b", b"old-b")?;
            Ok(())
        })
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut commits = Vec::new();
        db.update(|tx| {
            transform::<_, PlainAccountChangeSet, PlainAccountState, SortableBuffer, _, _>(
                tx,
                dir.path(),
                1, // force a spill per record to exercise the merge path
                TransformArgs::default(),
                |key, value, collector| {
                    let addr = key[8..].to_vec();
                    collector.collect(addr, value.to_vec())?;
                    Ok(())
                },
                |k, done| {
                    commits.push((k.to_vec(), done));
                    Ok(())
                },
            )
            .map_err(|_| ridge_db_api::DbError::Cancelled)
        })
        .unwrap();

        let state = db
            .view(|tx| {
                let mut cursor = tx.cursor::<PlainAccountState>()?;
                let mut walker = cursor.walk(None)?;
                let mut out = Vec::new();
                while let Some(entry) = walker.next()? {
                    out.push(entry);
                }
                Ok(out)
            })
            .unwrap();

        assert_eq!(
            state,
            vec![(b"-addr-a".to_vec(), b"old-a".to_vec()), (b"-addr-b".to_vec(), b"old-b".to_vec())]
        );
        assert!(commits.last().unwrap().1);
    }

    #[test]
    fn transform_honors_cancellation() {
        let db = MemDatabase::open();
        db.update(|tx| tx.put::<PlainAccountChangeSet>(b"k", b"v")).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = db.update(|tx| {
            let args = TransformArgs { cancel: cancel.clone(), ..TransformArgs::default() };
            transform::<_, PlainAccountChangeSet, PlainAccountState, SortableBuffer, _, _>(
                tx,
                dir.path(),
                DEFAULT_TEST_BUFFER,
                args,
                |_, _, _| Ok(()),
                |_, _| Ok(()),
            )
            .map_err(|_| ridge_db_api::DbError::Cancelled)
        });
        assert!(result.is_err());
    }

    const DEFAULT_TEST_BUFFER: usize = 1024;
}
