/// Errors surfaced by the KV abstraction.
///
/// This is deliberately small: the core only ever needs to distinguish "the key wasn't there"
/// (never fatal — callers interpret it) from "something about the store itself is broken"
/// (always fatal) and "the operation was interrupted by a cancellation signal".
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The requested bucket has not been registered with the store.
    #[error("unknown bucket: {0}")]
    UnknownBucket(&'static str),
    /// Attempted to write through a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnly,
    /// The transaction was already committed or aborted.
    #[error("transaction already closed")]
    TxClosed,
    /// A cancellation signal fired while a cursor walk or commit was in flight.
    #[error("operation cancelled")]
    Cancelled,
    /// Stored bytes could not be decoded into the expected type.
    #[error("corrupt value in bucket {bucket}: {reason}")]
    Decode {
        /// Bucket the corrupt value was read from.
        bucket: &'static str,
        /// Human-readable decode failure.
        reason: String,
    },
    /// Catch-all for the underlying storage engine's own I/O errors.
    #[error("storage I/O error: {0}")]
    Io(String),
}

/// Sentinel used by callers that want to tell "absent" apart from "zero-length value present".
///
/// [`DbError`] intentionally has no `NotFound` variant: per the error-handling design, a missing
/// key is never an error condition at the KV layer, only `Option::None` from `get`/`seek`.
pub type Result<T> = std::result::Result<T, DbError>;
