/// Identifier for a stage in the staged-sync pipeline.
///
/// Identity is stable: a stage's `ID` never changes meaning once assigned, and new stages are
/// appended at the end of [`StageId::ALL`] rather than inserted, so that a byte-encoded
/// [`StageId`] persisted on disk from an older binary still decodes correctly.
///
/// For custom or experimental stages, use [`StageId::Other`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StageId {
    /// Downloads block headers from the local head to the network tip.
    Headers,
    /// Indexes canonical block hash -> block number lookups.
    BlockHashes,
    /// Downloads block bodies (transactions, ommers) for already-known headers.
    Bodies,
    /// Recovers and stores transaction sender addresses.
    Senders,
    /// Executes blocks against `PlainState`, the authoritative upper bound for every
    /// stage that derives state from it.
    Execution,
    /// Maintains the incremental Merkle-Patricia trie root from change-sets.
    IntermediateHashes,
    /// Produces hashed account/storage views used by the trie stages.
    HashState,
    /// Indexes account change-set history for point-in-time account queries.
    AccountHistoryIndex,
    /// Indexes storage change-set history for point-in-time storage queries.
    StorageHistoryIndex,
    /// Indexes transaction hash -> block number lookups.
    TxLookup,
    /// Reconciles the mempool with newly canonical blocks.
    TxPool,
    /// Terminal, no-op stage marking a completed pass over the whole pipeline.
    Finish,
    /// A stage outside the fixed enumeration, identified by a caller-provided string.
    ///
    /// Prefix with a reverse-domain-style tag (`"com.example.my-stage"`) to avoid clashing
    /// with other integrators' custom stages.
    Other(&'static str),
}

impl StageId {
    /// All built-in stages, in pipeline order.
    pub const ALL: [Self; 12] = [
        Self::Headers,
        Self::BlockHashes,
        Self::Bodies,
        Self::Senders,
        Self::Execution,
        Self::HashState,
        Self::IntermediateHashes,
        Self::AccountHistoryIndex,
        Self::StorageHistoryIndex,
        Self::TxLookup,
        Self::TxPool,
        Self::Finish,
    ];

    /// Stages that read or write derived state and therefore require `PlainState` and
    /// change-sets to already be populated by [`StageId::Execution`].
    pub const STATE_REQUIRED: [Self; 6] = [
        Self::HashState,
        Self::IntermediateHashes,
        Self::AccountHistoryIndex,
        Self::StorageHistoryIndex,
        Self::TxLookup,
        Self::TxPool,
    ];

    /// A short, stable byte tag used as the key prefix in `SyncStageProgress` /
    /// `SyncStageUnwind`. `Other` stages hash their string to a tag in the high range so they
    /// never collide with a built-in stage added in a future release.
    pub const fn as_key_byte(&self) -> u8 {
        match self {
            Self::Headers => 0,
            Self::BlockHashes => 1,
            Self::Bodies => 2,
            Self::Senders => 3,
            Self::Execution => 4,
            Self::IntermediateHashes => 5,
            Self::HashState => 6,
            Self::AccountHistoryIndex => 7,
            Self::StorageHistoryIndex => 8,
            Self::TxLookup => 9,
            Self::TxPool => 10,
            Self::Finish => 11,
            Self::Other(s) => {
                // FNV-1a over the name, folded into the high range (192..=255) so custom
                // stages stay out of the built-in stages' 0..12 reservation. Collisions
                // between two custom stage names are possible but rare enough not to justify
                // a non-const hash map here.
                let bytes = s.as_bytes();
                let mut hash: u32 = 0x811c9dc5;
                let mut i = 0;
                while i < bytes.len() {
                    hash ^= bytes[i] as u32;
                    hash = hash.wrapping_mul(0x01000193);
                    i += 1;
                }
                192 + (hash % 64) as u8
            }
        }
    }

    /// Returns the stage id formatted as a string.
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Headers => "Headers",
            Self::BlockHashes => "BlockHashes",
            Self::Bodies => "Bodies",
            Self::Senders => "Senders",
            Self::Execution => "Execution",
            Self::IntermediateHashes => "IntermediateHashes",
            Self::HashState => "HashState",
            Self::AccountHistoryIndex => "AccountHistoryIndex",
            Self::StorageHistoryIndex => "StorageHistoryIndex",
            Self::TxLookup => "TxLookup",
            Self::TxPool => "TxPool",
            Self::Finish => "Finish",
            Self::Other(s) => s,
        }
    }

    /// Returns `true` for stages that download data over the (out-of-scope) network.
    pub const fn is_downloading_stage(&self) -> bool {
        matches!(self, Self::Headers | Self::Bodies)
    }

    /// Returns `true` if this is the terminal [`StageId::Finish`] stage.
    pub const fn is_finish(&self) -> bool {
        matches!(self, Self::Finish)
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
