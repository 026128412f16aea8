//! 32-bit content checksums for dedup row addressing.
//!
//! Items and shops are deduplicated by content: a CRC32 over their identifying
//! fields is stored in an indexed `hash` column and used to narrow the lookup
//! to a handful of candidate rows; the exact-match columns in the WHERE clause
//! then resolve checksum collisions. The unsigned CRC32 is stored as a signed
//! 32-bit integer, which every supported backend can index natively.

/// Computes the CRC32 checksum over the given parts, separated by `delimiter`.
///
/// The checksum is built over the UTF-8 bytes of the parts. An empty
/// delimiter concatenates the parts directly, so that for example the hash of
/// an item with no data equals the hash of its type alone.
///
/// Returns the unsigned 32-bit checksum reinterpreted as a signed 32-bit
/// integer.
pub fn content_hash<S: AsRef<str>>(delimiter: &str, parts: &[S]) -> i32 {
    let mut hasher = crc32fast::Hasher::new();
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            hasher.update(delimiter.as_bytes());
        }
        hasher.update(part.as_ref().as_bytes());
    }
    hasher.finalize() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_delimiter_concatenates() {
        // With no delimiter, ["ab", "c"] and ["a", "bc"] hash identically.
        assert_eq!(content_hash("", &["ab", "c"]), content_hash("", &["a", "bc"]));
    }

    #[test]
    fn type_only_hash_matches_empty_data() {
        // An item whose data is stored as the empty string must hash the
        // same as its type alone.
        assert_eq!(content_hash("", &["emerald", ""]), content_hash("", &["emerald"]));
    }

    #[test]
    fn delimiter_separates_parts() {
        assert_ne!(content_hash("|", &["ab", "c"]), content_hash("|", &["a", "bc"]));
    }

    #[test]
    fn known_collision_pair() {
        // "plumless" and "buckeroo" are a classic CRC32 collision; the
        // storage layer relies on exact-match columns to tell them apart.
        assert_eq!(content_hash("", &["plumless"]), content_hash("", &["buckeroo"]));
        assert_ne!("plumless", "buckeroo");
    }

    #[test]
    fn no_parts_hashes_to_zero() {
        let empty: &[&str] = &[];
        assert_eq!(content_hash("|", empty), 0);
    }
}
