//! Conflict detection against accepted siblings.
//!
//! Resolution is unidirectional: the new unit adapts, accepted siblings are
//! never touched. A sibling's effective identifier set is extracted from
//! its normalized source (matching the form the new unit is scanned in)
//! with its own past renames applied, so removing a sibling from the
//! composition releases the names only it held.

use crate::artifact::CompiledArtifact;
use crate::cache::IdentifierCache;
use crate::extract::ExtractedIdentifiers;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Read-only view of the identifiers every accepted sibling occupies.
/// Built once per batch; all units in a batch must share one snapshot.
#[derive(Debug, Clone, Default)]
pub struct SiblingSnapshot {
    names: HashSet<String>,
}

impl SiblingSnapshot {
    pub fn empty() -> Self {
        SiblingSnapshot::default()
    }

    pub fn from_artifacts(siblings: &[CompiledArtifact], cache: &mut IdentifierCache) -> Self {
        let mut names = HashSet::new();
        for artifact in siblings {
            let extracted = cache.get_or_extract(&artifact.unit_id, &artifact.source_text);
            let renames: HashMap<&str, &str> = artifact
                .conflicts
                .iter()
                .map(|c| (c.identifier.as_str(), c.resolved_name.as_str()))
                .collect();
            for name in extracted.collidable_names() {
                match renames.get(name) {
                    Some(resolved) => names.insert((*resolved).to_string()),
                    None => names.insert(name.to_string()),
                };
            }
        }
        SiblingSnapshot { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Order-independent digest of the occupied names. Combined with a
    /// unit's content hash this forms a memoization key for callers.
    pub fn signature(&self) -> String {
        let mut sorted: Vec<&str> = self.names.iter().map(|s| s.as_str()).collect();
        sorted.sort_unstable();
        let mut hasher = Sha256::new();
        for name in sorted {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Colliding names in the new unit's declaration order. Capability names
/// never appear: they resolve to host objects on both sides.
pub fn detect_conflicts(unit: &ExtractedIdentifiers, snapshot: &SiblingSnapshot) -> Vec<String> {
    unit.collidable_names()
        .into_iter()
        .filter(|name| snapshot.contains(name))
        .map(|name| name.to_string())
        .collect()
}
