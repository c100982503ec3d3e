pub use alloy_trie::Nibbles;

/// Encodes a nibble path as an [`IntermediateTrieHash`](ridge_db_api::IntermediateTrieHash)
/// bucket key: one byte per nibble (each in `0..16`), in path order.
///
/// This is the "compressed" encoding relative to storing a full hashed key: a path only as long
/// as the trie depth actually visited, rather than always 32 or 64 bytes. Plain byte-per-nibble
/// (not 2-per-byte packing) is deliberate — it keeps prefix comparisons a simple `starts_with`
/// on the encoded bytes, which the incremental loader's subtree-skip logic depends on.
pub fn encode_key(nibbles: &Nibbles) -> Vec<u8> {
    nibbles.to_vec()
}

pub fn decode_key(bytes: &[u8]) -> Nibbles {
    Nibbles::from_nibbles_unchecked(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let nibbles = Nibbles::unpack([0xab, 0xcd]);
        let encoded = encode_key(&nibbles);
        assert_eq!(decode_key(&encoded), nibbles);
    }

    #[test]
    fn shorter_prefix_sorts_before_its_children() {
        let parent = encode_key(&Nibbles::from_nibbles_unchecked([1]));
        let child = encode_key(&Nibbles::from_nibbles_unchecked([1, 0]));
        assert!(parent < child);
        assert!(child.starts_with(&parent));
    }
}
