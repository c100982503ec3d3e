use rayon::slice::ParallelSliceMut;

/// Default in-memory bound for a change-set collector before it spills to disk.
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024 * 1024;

/// Smaller bound used for collectors that only ever hold compact intermediate-hash records.
pub const HASH_COLLECTOR_BUFFER_SIZE: usize = 256 * 1024;

fn entry_size(k: &[u8], v: &[u8]) -> usize {
    k.len() + v.len() + 2 * std::mem::size_of::<usize>()
}

/// A bounded in-memory buffer that collects `(key, value)` pairs until it is full, then
/// produces them in sorted order to be spilled to a run file.
///
/// The three variants differ only in how they resolve duplicate keys within a single buffer
/// load, matching the merge semantics the destination bucket actually needs.
pub trait Buffer: Default {
    /// Records one key/value pair observed during extraction.
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>);

    /// Approximate heap footprint of everything buffered so far.
    fn size_bytes(&self) -> usize;

    /// Consumes the buffer, returning its contents sorted by key and with duplicate keys
    /// resolved per the buffer's merge semantics.
    fn into_sorted(self) -> Vec<(Vec<u8>, Vec<u8>)>;
}

/// Last-write-wins buffer: when the same key is inserted twice, the later insertion's value
/// survives. This is the semantics change-set and plain-state loads need — later change-sets in
/// a block range override earlier ones for the same account/slot.
#[derive(Default)]
pub struct SortableBuffer {
    entries: Vec<(Vec<u8>, Vec<u8>, u64)>,
    bytes: usize,
    seq: u64,
}

impl Buffer for SortableBuffer {
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.bytes += entry_size(&key, &value);
        self.seq += 1;
        self.entries.push((key, value, self.seq));
    }

    fn size_bytes(&self) -> usize {
        self.bytes
    }

    fn into_sorted(self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut entries = self.entries;
        entries.par_sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.2.cmp(&b.2)));
        let mut out: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(entries.len());
        for (k, v, _) in entries {
            if out.last().is_some_and(|(last_k, _)| *last_k == k) {
                out.last_mut().unwrap().1 = v;
            } else {
                out.push((k, v));
            }
        }
        out
    }
}

/// Append-only buffer: values for the same key are concatenated in insertion order rather than
/// overwritten. Used for history-index buckets, where each load appends another block number to
/// an account's or storage slot's existing index list.
#[derive(Default)]
pub struct SortableAppendBuffer {
    entries: Vec<(Vec<u8>, Vec<u8>, u64)>,
    bytes: usize,
    seq: u64,
}

impl Buffer for SortableAppendBuffer {
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.bytes += entry_size(&key, &value);
        self.seq += 1;
        self.entries.push((key, value, self.seq));
    }

    fn size_bytes(&self) -> usize {
        self.bytes
    }

    fn into_sorted(self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut entries = self.entries;
        entries.par_sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.2.cmp(&b.2)));
        let mut out: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        for (k, v, _) in entries {
            if out.last().is_some_and(|(last_k, _)| *last_k == k) {
                out.last_mut().unwrap().1.extend_from_slice(&v);
            } else {
                out.push((k, v));
            }
        }
        out
    }
}

/// Plain buffer: keys are expected to already be unique (e.g. intermediate trie-hash records
/// produced by a single walk). Duplicate keys are kept as separate entries rather than merged —
/// a duplicate here means the caller's invariant was violated, and losing data silently would
/// be worse than a harmless extra record that the load phase's `put` will simply overwrite.
#[derive(Default)]
pub struct PlainTextBuffer {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    bytes: usize,
}

impl Buffer for PlainTextBuffer {
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.bytes += entry_size(&key, &value);
        self.entries.push((key, value));
    }

    fn size_bytes(&self) -> usize {
        self.bytes
    }

    fn into_sorted(self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut entries = self.entries;
        entries.par_sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
