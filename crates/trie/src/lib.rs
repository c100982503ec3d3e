//! Incremental state-root computation over the hashed-state tables.
//!
//! Two entry points: [`TrieLoader::regenerate`] walks every account and every storage slot from
//! scratch (used once, when no prior intermediate-hash cache can be trusted), and
//! [`TrieLoader::increment`] reuses cached per-account facts for anything a [`RetainList`]
//! doesn't mark as touched. Both delegate the actual RLP node encoding and Keccak hashing to
//! `alloy_trie`'s [`alloy_trie::HashBuilder`] rather than re-deriving it here.

mod account;
mod error;
mod loader;
mod nibbles;
mod receiver;
mod retain;

pub use account::TrieAccount;
pub use error::{Result, TrieError};
pub use loader::{cache_key_to_nibbles, TrieLoader};
pub use nibbles::{decode_key, encode_key, Nibbles};
pub use receiver::{DefaultReceiver, StreamReceiver, TrieItem};
pub use retain::RetainList;
