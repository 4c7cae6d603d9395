//! Identifier-set cache.
//!
//! Sibling identifier sets are derived data, keyed by (unit id, content
//! hash). Sets are extracted from NORMALIZED source, the same form the
//! pipeline scans for the new unit, so names the normalizer synthesizes
//! (an anonymous default export's entry name) occupy on the sibling side
//! too. Everything lives in memory: artifacts are self-contained and no
//! cross-process cache is required for correctness.

use crate::extract::{extract_identifiers, ExtractedIdentifiers};
use crate::normalize::normalize_source;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

struct CacheEntry {
    hash: String,
    identifiers: ExtractedIdentifiers,
}

#[derive(Default)]
pub struct IdentifierCache {
    entries: HashMap<String, CacheEntry>,
}

impl IdentifierCache {
    pub fn new() -> Self {
        IdentifierCache::default()
    }

    pub fn compute_hash(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Returns the cached set for (unit_id, source), normalizing and
    /// extracting on miss or on a stale hash. The hash keys on the raw
    /// source so callers never pre-normalize.
    pub fn get_or_extract(&mut self, unit_id: &str, source: &str) -> &ExtractedIdentifiers {
        let hash = Self::compute_hash(source);
        let stale = match self.entries.get(unit_id) {
            Some(entry) => entry.hash != hash,
            None => true,
        };
        if stale {
            let normalized = normalize_source(source);
            self.entries.insert(
                unit_id.to_string(),
                CacheEntry {
                    hash,
                    identifiers: extract_identifiers(&normalized.code),
                },
            );
        }
        &self.entries[unit_id].identifiers
    }

    pub fn invalidate(&mut self, unit_id: &str) {
        self.entries.remove(unit_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_and_stale_invalidation() {
        let mut cache = IdentifierCache::new();

        let ids = cache.get_or_extract("u1", "const A = 1;");
        assert!(ids.declares("A"));
        assert_eq!(cache.len(), 1);

        // Same source: served from cache, still correct.
        assert!(cache.get_or_extract("u1", "const A = 1;").declares("A"));

        // Changed source under the same id: hash mismatch forces re-extract.
        let ids = cache.get_or_extract("u1", "const B = 2;");
        assert!(ids.declares("B"));
        assert!(!ids.declares("A"));
    }

    #[test]
    fn test_sets_reflect_normalized_source() {
        let mut cache = IdentifierCache::new();
        let ids = cache.get_or_extract("u1", "export default function () { return null; }");
        assert!(
            ids.declares(crate::normalize::ANONYMOUS_ENTRY),
            "synthesized entry name must occupy the sibling set"
        );
    }

    #[test]
    fn test_invalidate() {
        let mut cache = IdentifierCache::new();
        cache.get_or_extract("u1", "const A = 1;");
        cache.invalidate("u1");
        assert!(cache.is_empty());
    }
}
