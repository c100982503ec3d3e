use std::collections::BTreeSet;

use alloy_primitives::B256;
use alloy_trie::Nibbles;

use crate::nibbles::encode_key;

fn has_prefix(set: &BTreeSet<Vec<u8>>, prefix: &[u8]) -> bool {
    set.range(prefix.to_vec()..).next().is_some_and(|k| k.starts_with(prefix))
}

/// The set of hashed-state paths that changed since the last increment and therefore must be
/// walked down to leaf level, rather than substituted with a previously cached subtree hash.
///
/// Built from the account and storage change-sets covering the block range an increment run is
/// processing: every account or slot touched by those change-sets invalidates the cached hash
/// along its entire root-to-leaf path.
#[derive(Default)]
pub struct RetainList {
    accounts: BTreeSet<Vec<u8>>,
    storage: BTreeSet<Vec<u8>>,
}

impl RetainList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&mut self, hashed_address: B256) {
        self.accounts.insert(encode_key(&Nibbles::unpack(hashed_address)));
    }

    pub fn add_storage(&mut self, hashed_address: B256, hashed_slot: B256) {
        let mut path = Vec::with_capacity(128);
        path.extend_from_slice(&encode_key(&Nibbles::unpack(hashed_address)));
        path.extend_from_slice(&encode_key(&Nibbles::unpack(hashed_slot)));
        self.storage.insert(path);
    }

    pub fn account_changed(&self, hashed_address: B256) -> bool {
        self.accounts.contains(&encode_key(&Nibbles::unpack(hashed_address)))
    }

    pub fn storage_changed(&self, hashed_address: B256, hashed_slot: B256) -> bool {
        let mut path = encode_key(&Nibbles::unpack(hashed_address));
        path.extend_from_slice(&encode_key(&Nibbles::unpack(hashed_slot)));
        self.storage.contains(&path)
    }

    /// Whether any slot under this account changed, regardless of which one.
    pub fn any_storage_changed_under(&self, hashed_address: B256) -> bool {
        has_prefix(&self.storage, &encode_key(&Nibbles::unpack(hashed_address)))
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.storage.is_empty()
    }

    /// The cache-key-encoded nibble path of every account this retain list marks changed.
    /// Used by the incremental loader to find accounts whose change-set entry means "deleted"
    /// rather than "updated" — they won't turn up walking the live hashed-account table, so the
    /// loader has to check this set explicitly to evict their stale cache row.
    pub fn changed_account_keys(&self) -> impl Iterator<Item = &[u8]> {
        self.accounts.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_changed_accounts_and_storage_independently() {
        let mut retain = RetainList::new();
        let a = B256::repeat_byte(0xaa);
        let b = B256::repeat_byte(0xbb);
        let slot = B256::repeat_byte(0x01);
        retain.add_account(a);
        retain.add_storage(b, slot);

        assert!(retain.account_changed(a));
        assert!(!retain.account_changed(b));
        assert!(retain.storage_changed(b, slot));
        assert!(retain.any_storage_changed_under(b));
        assert!(!retain.any_storage_changed_under(a));
    }
}
