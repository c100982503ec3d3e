/// Marker for a named bucket and the shape of the keys/values stored in it.
///
/// Tables are zero-sized types; the KV adapter never constructs one, it only uses
/// [`Table::NAME`] to find the underlying bucket and treats keys/values as raw bytes.
/// Higher layers (stages, ETL, trie) are responsible for encoding/decoding.
pub trait Table: Send + Sync + 'static {
    /// Bucket name as it appears in the underlying store. Stable across releases.
    const NAME: &'static str;
}

macro_rules! table {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl Table for $name {
            const NAME: &'static str = stringify!($name);
        }
    };
}

table!(
    /// `stageID byte -> bigEndianU64(blockNumber) || stageData`.
    SyncStageProgress
);
table!(
    /// `stageID byte -> bigEndianU64(unwindTo) || stageData`, one row per stage; presence of a
    /// row for a given stage indicates a pending unwind for that stage specifically.
    SyncStageUnwind
);
table!(
    /// `compressedNibblePath -> 32-byte keccak256`; empty value is a tombstone.
    IntermediateTrieHash
);
table!(
    /// `8-byte big-endian block number || address -> prior account bytes`.
    PlainAccountChangeSet
);
table!(
    /// `8-byte big-endian block number || address || slot -> prior storage value`.
    PlainStorageChangeSet
);
table!(
    /// `address -> current account bytes`. Authoritative current state.
    PlainAccountState
);
table!(
    /// `address || incarnation || slot -> current storage value`. Authoritative current state.
    PlainStorageState
);
table!(
    /// `blockNumber -> canonical block hash`.
    CanonicalHeaders
);
table!(
    /// `blockNumber -> StateRoot`, used by Intermediate-Hashes to verify hash fidelity.
    HeaderStateRoots
);
table!(
    /// `keccak256(address) -> current account bytes`, populated by the `HashState` stage.
    HashedAccountState
);
table!(
    /// `keccak256(address) || slot -> current storage value`, populated by `HashState`.
    HashedStorageState
);
