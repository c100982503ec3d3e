use alloy_primitives::{keccak256, B256};
use alloy_trie::Nibbles;
use ridge_db_api::{
    DbCursorRO, DbCursorRW, DbTx, DbTxMut, HashedAccountState, HashedStorageState, IntermediateTrieHash,
};
use tracing::debug;

use crate::{
    account::TrieAccount,
    error::Result,
    nibbles::{decode_key, encode_key},
    receiver::{DefaultReceiver, StreamReceiver, TrieItem},
    retain::RetainList,
};

/// Computes (or incrementally recomputes) the global state root from the hashed-state tables,
/// caching one 32-byte leaf hash per account in the `IntermediateTrieHash` bucket so a later
/// increment can skip re-walking and re-hashing an account whose own record and whose storage
/// are both untouched since the cache was written.
///
/// This deliberately caches at per-account granularity rather than at arbitrary trie-node
/// prefixes: a full erigon-style node cache would let an increment skip whole groups of
/// untouched accounts that share a branch prefix too, but that needs a real nibble-indexed node
/// store rather than the two-column flat bucket this core keeps.
pub struct TrieLoader;

impl TrieLoader {
    /// Full rebuild: walks every account and every slot, ignoring and overwriting any existing
    /// cache. Used for the entry phase when no prior intermediate-hash state can be trusted.
    pub fn regenerate<Tx: DbTxMut>(tx: &Tx) -> Result<B256> {
        tx.clear::<IntermediateTrieHash>()?;
        Self::run(tx, None)
    }

    /// Incremental recompute: reuses the cached leaf hash wherever `retain` shows neither the
    /// account nor its storage changed, and evicts the cache row of any account `retain` marks
    /// changed that no longer exists — the account-deletion case, which never turns up in the
    /// live walk below and so would otherwise linger forever and desync from what a full
    /// [`TrieLoader::regenerate`] over the same state would produce.
    pub fn increment<Tx: DbTxMut>(tx: &Tx, retain: &RetainList) -> Result<B256> {
        let root = Self::run(tx, Some(retain))?;
        Self::evict_deleted_accounts(tx, retain)?;
        Ok(root)
    }

    fn evict_deleted_accounts<Tx: DbTxMut>(tx: &Tx, retain: &RetainList) -> Result<()> {
        let mut cache_cursor = tx.cursor_mut::<IntermediateTrieHash>()?;
        for cache_key in retain.changed_account_keys() {
            let hashed_address = B256::from_slice(&decode_key(cache_key).pack());
            if tx.get::<HashedAccountState>(hashed_address.as_slice())?.is_none()
                && cache_cursor.seek_exact(cache_key)?.is_some()
            {
                cache_cursor.delete_current()?;
            }
        }
        Ok(())
    }

    fn run<Tx: DbTxMut>(tx: &Tx, retain: Option<&RetainList>) -> Result<B256> {
        let mut receiver = DefaultReceiver::new();
        let mut accounts = tx.cursor::<HashedAccountState>()?;
        let mut cache_cursor = tx.cursor_mut::<IntermediateTrieHash>()?;

        let mut walker = accounts.walk(None)?;
        let mut visited = 0usize;
        let mut reused = 0usize;
        while let Some((hashed_address_bytes, account_rlp_raw)) = walker.next()? {
            visited += 1;
            let hashed_address = B256::from_slice(&hashed_address_bytes);
            let nibbles = Nibbles::unpack(hashed_address);
            let cache_key = encode_key(&nibbles);

            let cached_hash =
                cache_cursor.seek_exact(&cache_key)?.and_then(|(_, v)| (v.len() == 32).then(|| B256::from_slice(&v)));

            let can_reuse = cached_hash.is_some()
                && retain.is_some_and(|r| !r.account_changed(hashed_address) && !r.any_storage_changed_under(hashed_address));

            if can_reuse {
                reused += 1;
                receiver.receive(TrieItem::AccountHash { nibbles, hash: cached_hash.unwrap() })?;
                continue;
            }

            let storage_root = Self::compute_storage_root(tx, hashed_address)?;

            let mut account = decode_account(&account_rlp_raw);
            account.storage_root = storage_root;
            let account_rlp = account.rlp_bytes();
            let leaf_hash = keccak256(&account_rlp);

            receiver.receive(TrieItem::Account { nibbles, account_rlp })?;
            cache_cursor.put(&cache_key, leaf_hash.as_slice())?;
        }

        debug!(target: "sync::trie::loader", visited, reused, "account trie pass complete");
        receiver.root()
    }

    fn compute_storage_root<Tx: DbTx>(tx: &Tx, hashed_address: B256) -> Result<B256> {
        let mut storage = tx.cursor::<HashedStorageState>()?;
        let mut receiver = DefaultReceiver::new();
        let mut walker = storage.walk(Some(hashed_address.as_slice()))?;
        let mut any = false;
        while let Some((key, value)) = walker.next()? {
            if !key.starts_with(hashed_address.as_slice()) {
                break;
            }
            any = true;
            let hashed_slot = B256::from_slice(&key[32..]);
            let nibbles = Nibbles::unpack(hashed_slot);
            receiver.receive(TrieItem::Storage { nibbles, value })?;
        }
        if !any {
            return Ok(TrieAccount::EMPTY_ROOT);
        }
        receiver.root()
    }
}

fn decode_account(rlp: &[u8]) -> TrieAccount {
    // The hashed-account bucket stores the account shape this core itself produced during the
    // Execution/HashState stages, so a decode failure here means the pipeline wrote a corrupt
    // record rather than something a caller can recover from.
    let mut buf = rlp;
    alloy_rlp::Decodable::decode(&mut buf).unwrap_or_default()
}

/// Standalone decoder for a single nibble-path cache key, exposed for stages that need to
/// reason about which paths a cache entry covers (e.g. unwind, which must invalidate exactly
/// the accounts whose change-set falls within the unwound range).
pub fn cache_key_to_nibbles(key: &[u8]) -> Nibbles {
    decode_key(key)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use ridge_db::MemDatabase;
    use ridge_db_api::{Database, DbError};

    use super::*;

    fn account_rlp(nonce: u64) -> Vec<u8> {
        TrieAccount { nonce, balance: U256::from(1), ..Default::default() }.rlp_bytes()
    }

    #[test]
    fn regenerate_and_increment_agree_when_nothing_changed() {
        let db = MemDatabase::open();
        let addr_a = B256::repeat_byte(0x11);
        let addr_b = B256::repeat_byte(0x22);
        let slot = B256::repeat_byte(0x01);

        db.update(|tx| {
            tx.put::<HashedAccountState>(addr_a.as_slice(), &account_rlp(1))?;
            tx.put::<HashedAccountState>(addr_b.as_slice(), &account_rlp(2))?;
            let mut key = addr_a.to_vec();
            key.extend_from_slice(slot.as_slice());
            tx.put::<HashedStorageState>(&key, &[0x2a])?;
            Ok(())
        })
        .unwrap();

        let root1 =
            db.update(|tx| TrieLoader::regenerate(tx).map_err(|_| DbError::Cancelled)).unwrap();

        let root2 = db
            .update(|tx| TrieLoader::increment(tx, &RetainList::new()).map_err(|_| DbError::Cancelled))
            .unwrap();

        assert_eq!(root1, root2, "increment with an empty retain list must reproduce the regenerated root");
    }

    #[test]
    fn increment_reflects_a_changed_account() {
        let db = MemDatabase::open();
        let addr_a = B256::repeat_byte(0x11);

        db.update(|tx| tx.put::<HashedAccountState>(addr_a.as_slice(), &account_rlp(1))).unwrap();
        let root1 =
            db.update(|tx| TrieLoader::regenerate(tx).map_err(|_| DbError::Cancelled)).unwrap();

        db.update(|tx| tx.put::<HashedAccountState>(addr_a.as_slice(), &account_rlp(2))).unwrap();
        let mut retain = RetainList::new();
        retain.add_account(addr_a);
        let root2 =
            db.update(|tx| TrieLoader::increment(tx, &retain).map_err(|_| DbError::Cancelled)).unwrap();

        assert_ne!(root1, root2);
    }

    #[test]
    fn increment_evicts_cache_row_of_a_deleted_account() {
        let db = MemDatabase::open();
        let addr_a = B256::repeat_byte(0x11);
        let addr_b = B256::repeat_byte(0x22);

        db.update(|tx| {
            tx.put::<HashedAccountState>(addr_a.as_slice(), &account_rlp(1))?;
            tx.put::<HashedAccountState>(addr_b.as_slice(), &account_rlp(2))
        })
        .unwrap();
        db.update(|tx| TrieLoader::regenerate(tx).map_err(|_| DbError::Cancelled)).unwrap();

        db.update(|tx| tx.delete::<HashedAccountState>(addr_a.as_slice())).unwrap();
        let mut retain = RetainList::new();
        retain.add_account(addr_a);
        db.update(|tx| TrieLoader::increment(tx, &retain).map_err(|_| DbError::Cancelled)).unwrap();

        let cache_key = encode_key(&Nibbles::unpack(addr_a));
        let cached = db.view(|tx| tx.get::<IntermediateTrieHash>(&cache_key)).unwrap();
        assert!(cached.is_none(), "deleted account's cache row must not survive an increment pass");

        let regenerated =
            db.update(|tx| TrieLoader::regenerate(tx).map_err(|_| DbError::Cancelled)).unwrap();
        let incremented =
            db.update(|tx| TrieLoader::increment(tx, &RetainList::new()).map_err(|_| DbError::Cancelled)).unwrap();
        assert_eq!(regenerated, incremented, "regenerate and increment must agree after a deletion");
    }
}
