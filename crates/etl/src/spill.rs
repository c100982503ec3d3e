use std::{
    cmp::Reverse,
    collections::BinaryHeap,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use tempfile::Builder;

use crate::error::{EtlError, Result};

/// Writes a sequence of sorted `(key, value)` pairs to a temp file as a sorted run, framed as
/// `u32 len(key) || key || u32 len(value) || value` records.
pub(crate) fn write_run(dir: &Path, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<PathBuf> {
    let file = Builder::new().prefix("ridge-etl-").suffix(".run").tempfile_in(dir)?;
    let (file, path) = file.keep().map_err(|e| EtlError::Io(e.error))?;
    let mut writer = BufWriter::new(file);
    for (k, v) in entries {
        writer.write_all(&(k.len() as u32).to_le_bytes())?;
        writer.write_all(k)?;
        writer.write_all(&(v.len() as u32).to_le_bytes())?;
        writer.write_all(v)?;
    }
    writer.flush()?;
    Ok(path)
}

/// Streaming reader over one sorted run file, used as a source in the k-way merge.
pub(crate) struct RunReader {
    reader: BufReader<File>,
    path: PathBuf,
}

impl RunReader {
    pub(crate) fn open(path: PathBuf) -> Result<Self> {
        let file = File::open(&path)?;
        Ok(Self { reader: BufReader::new(file), path })
    }

    fn read_len(&mut self) -> Result<Option<u32>> {
        let mut buf = [0u8; 4];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => Ok(Some(u32::from_le_bytes(buf))),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_exact_len(&mut self, len: u32) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        self.reader.read_exact(&mut buf).map_err(|_| EtlError::Corrupt)?;
        Ok(buf)
    }

    pub(crate) fn next_entry(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let Some(klen) = self.read_len()? else { return Ok(None) };
        let key = self.read_exact_len(klen)?;
        let vlen = self.read_len()?.ok_or(EtlError::Corrupt)?;
        let value = self.read_exact_len(vlen)?;
        Ok(Some((key, value)))
    }
}

impl Drop for RunReader {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

struct HeapEntry {
    key: Vec<u8>,
    value: Vec<u8>,
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// K-way merges a set of already-sorted sources (spilled run files plus the final in-memory
/// tail) into a single ascending stream, yielding one `(key, value)` pair at a time so the
/// caller never has to hold more than one record from each source in memory at once.
pub(crate) struct MergeStream {
    sources: Vec<Option<RunReader>>,
    tail: Vec<(Vec<u8>, Vec<u8>)>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl MergeStream {
    pub(crate) fn new(runs: Vec<RunReader>, mut tail: Vec<(Vec<u8>, Vec<u8>)>) -> Result<Self> {
        tail.reverse(); // pop() takes from the back; reverse once so we pop in ascending order
        let mut sources: Vec<Option<RunReader>> = runs.into_iter().map(Some).collect();
        let mut heap = BinaryHeap::new();
        for (i, src) in sources.iter_mut().enumerate() {
            if let Some(reader) = src {
                if let Some((key, value)) = reader.next_entry()? {
                    heap.push(Reverse(HeapEntry { key, value, source: i }));
                }
            }
        }
        let tail_source = sources.len();
        sources.push(None); // placeholder slot for the in-memory tail, never read through RunReader
        let mut stream = Self { sources, tail, heap };
        if let Some((key, value)) = stream.tail.pop() {
            stream.heap.push(Reverse(HeapEntry { key, value, source: tail_source }));
        }
        Ok(stream)
    }

    fn tail_source(&self) -> usize {
        self.sources.len() - 1
    }

    pub(crate) fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let Some(Reverse(top)) = self.heap.pop() else { return Ok(None) };
        let tail_source = self.tail_source();
        if top.source == tail_source {
            if let Some((key, value)) = self.tail.pop() {
                self.heap.push(Reverse(HeapEntry { key, value, source: tail_source }));
            }
        } else if let Some(reader) = &mut self.sources[top.source] {
            if let Some((key, value)) = reader.next_entry()? {
                self.heap.push(Reverse(HeapEntry { key, value, source: top.source }));
            }
        }
        Ok(Some((top.key, top.value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_stream_interleaves_runs_and_tail_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let run_a = write_run(dir.path(), &[(b"a".to_vec(), b"1".to_vec()), (b"d".to_vec(), b"4".to_vec())]).unwrap();
        let run_b = write_run(dir.path(), &[(b"b".to_vec(), b"2".to_vec())]).unwrap();
        let readers = vec![RunReader::open(run_a).unwrap(), RunReader::open(run_b).unwrap()];
        let mut merge = MergeStream::new(readers, vec![(b"c".to_vec(), b"3".to_vec())]).unwrap();

        let mut out = Vec::new();
        while let Some(entry) = merge.next().unwrap() {
            out.push(entry);
        }
        assert_eq!(
            out,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec()),
                (b"c".to_vec(), b"3".to_vec()),
                (b"d".to_vec(), b"4".to_vec()),
            ]
        );
    }
}
