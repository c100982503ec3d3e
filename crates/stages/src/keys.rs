use alloy_primitives::{Address, B256};
use ridge_primitives::BlockNumber;

/// `PlainAccountChangeSet`/`PlainStorageChangeSet` keys are ordered by block number first so a
/// range scan over "every change in blocks (from, to]" is a single forward cursor walk.
pub fn account_changeset_key(block: BlockNumber, address: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + 20);
    key.extend_from_slice(&block.to_be_bytes());
    key.extend_from_slice(address.as_slice());
    key
}

pub fn decode_account_changeset_key(key: &[u8]) -> (BlockNumber, Address) {
    let block = BlockNumber::from_be_bytes(key[0..8].try_into().expect("8-byte block prefix"));
    let address = Address::from_slice(&key[8..28]);
    (block, address)
}

pub fn storage_changeset_key(block: BlockNumber, address: Address, slot: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + 20 + 32);
    key.extend_from_slice(&block.to_be_bytes());
    key.extend_from_slice(address.as_slice());
    key.extend_from_slice(slot.as_slice());
    key
}

pub fn decode_storage_changeset_key(key: &[u8]) -> (BlockNumber, Address, B256) {
    let block = BlockNumber::from_be_bytes(key[0..8].try_into().expect("8-byte block prefix"));
    let address = Address::from_slice(&key[8..28]);
    let slot = B256::from_slice(&key[28..60]);
    (block, address, slot)
}

pub fn storage_state_key(address: Address, slot: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(20 + 32);
    key.extend_from_slice(address.as_slice());
    key.extend_from_slice(slot.as_slice());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_changeset_key_round_trips() {
        let addr = Address::repeat_byte(0x42);
        let key = account_changeset_key(7, addr);
        assert_eq!(decode_account_changeset_key(&key), (7, addr));
    }

    #[test]
    fn account_changeset_keys_sort_by_block_first() {
        let low = account_changeset_key(1, Address::repeat_byte(0xff));
        let high = account_changeset_key(2, Address::repeat_byte(0x00));
        assert!(low < high);
    }
}
