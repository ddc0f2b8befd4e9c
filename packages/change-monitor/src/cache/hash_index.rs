//! Content digests and the per-run set of digests already handled.

use std::collections::HashSet;

use crate::types::document::ContentHash;

/// Trim every line and drop blank ones.
///
/// Callers hash the normalized text when reflowed markup should not count
/// as a change. Case and inner whitespace are preserved.
pub fn normalize_content(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Documents reconciled in the current run, keyed by source, URL and digest.
///
/// A fast path only: a hit means this exact URL was already classified
/// with this content during the run, so the backend already holds the
/// result. Identical content under another URL is never a hit; every
/// distinct URL still goes through the backend lookup.
#[derive(Debug, Default)]
pub struct HashIndex {
    seen: HashSet<(String, String, ContentHash)>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// SHA-256 of the content, exactly as given.
    pub fn digest(content: &str) -> ContentHash {
        ContentHash::of(content)
    }

    pub fn seen(&self, source_name: &str, url: &str, hash: &ContentHash) -> bool {
        self.seen
            .contains(&(source_name.to_string(), url.to_string(), hash.clone()))
    }

    /// Returns `false` if this document and digest were already recorded.
    pub fn record(&mut self, source_name: &str, url: &str, hash: ContentHash) -> bool {
        self.seen
            .insert((source_name.to_string(), url.to_string(), hash))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_digest_is_case_and_whitespace_sensitive() {
        assert_ne!(HashIndex::digest("Title"), HashIndex::digest("title"));
        assert_ne!(HashIndex::digest("a b"), HashIndex::digest("a  b"));
        assert_eq!(HashIndex::digest("v1").as_str().len(), 64);
    }

    #[test]
    fn test_normalize_trims_lines_and_drops_blanks() {
        let raw = "  <h1>Programm</h1>  \n\n\t\n  Frist:  31.12.  \r\n";
        assert_eq!(normalize_content(raw), "<h1>Programm</h1>\nFrist:  31.12.");
    }

    #[test]
    fn test_seen_and_record() {
        let mut index = HashIndex::new();
        let hash = HashIndex::digest("v1");
        assert!(!index.seen("A", "https://a.example/1", &hash));
        assert!(index.record("A", "https://a.example/1", hash.clone()));
        assert!(index.seen("A", "https://a.example/1", &hash));
        assert!(!index.record("A", "https://a.example/1", hash.clone()));

        index.reset();
        assert!(!index.seen("A", "https://a.example/1", &hash));
    }

    #[test]
    fn test_same_content_under_other_url_is_not_seen() {
        let mut index = HashIndex::new();
        let hash = HashIndex::digest("same");
        index.record("A", "https://a.example/1", hash.clone());

        assert!(!index.seen("A", "https://a.example/mirror", &hash));
        assert!(!index.seen("B", "https://a.example/1", &hash));
        assert!(!index.seen("A", "https://a.example/1", &HashIndex::digest("other")));
    }

    proptest! {
        #[test]
        fn digest_is_stable(content in ".*") {
            prop_assert_eq!(HashIndex::digest(&content), HashIndex::digest(&content));
        }

        #[test]
        fn single_byte_difference_changes_digest(content in "[a-z]{1,64}", pos in 0usize..64) {
            let pos = pos % content.len();
            let mut bytes = content.clone().into_bytes();
            bytes[pos] = if bytes[pos] == b'z' { b'a' } else { bytes[pos] + 1 };
            let altered = String::from_utf8(bytes).unwrap();
            prop_assert_ne!(HashIndex::digest(&content), HashIndex::digest(&altered));
        }

        #[test]
        fn normalize_is_idempotent(content in "[ a-z\\n\\t]*") {
            let once = normalize_content(&content);
            prop_assert_eq!(normalize_content(&once), once.clone());
        }
    }
}
