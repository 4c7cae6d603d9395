//! Data model for the compilation pipeline.
//!
//! Units and artifacts are immutable: an edit produces a new
//! `CompilationUnit`, a recompile produces a new `CompiledArtifact`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// What kind of source a unit carries. Only scenes are compiled today;
/// the kind travels with the unit so hosts can route artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    Scene,
    Overlay,
}

impl Default for UnitKind {
    fn default() -> Self {
        UnitKind::Scene
    }
}

/// One independently authored piece of scene source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationUnit {
    pub id: String,
    pub project_id: String,
    pub source_text: String,
    #[serde(default)]
    pub kind: UnitKind,
    #[serde(default)]
    pub created_at_ms: Option<u64>,
}

impl CompilationUnit {
    pub fn new(id: &str, project_id: &str, source_text: &str) -> Self {
        CompilationUnit {
            id: id.to_string(),
            project_id: project_id.to_string(),
            source_text: source_text.to_string(),
            kind: UnitKind::Scene,
            created_at_ms: now_ms(),
        }
    }

    /// sha256 of the source text. Callers memoize compiles by
    /// (content hash, sibling signature).
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source_text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Per-unit rename suffix: stable across recompiles of the same unit,
    /// distinct across units. First 8 hex chars of sha256 of the id.
    pub fn rename_token(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..8].to_string()
    }
}

/// Audit trail of one resolved collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub identifier: String,
    pub resolved_name: String,
    pub source_unit_id: String,
}

/// Which execution contract the wrapped code honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractVersion {
    /// Capabilities read from well-known globals; the wrapper emits a
    /// `const X = window.X;` prelude.
    V1,
    /// Capabilities arrive as named callable parameters in the shared
    /// order; no prelude, no global reads.
    V2,
}

impl Default for ContractVersion {
    fn default() -> Self {
        ContractVersion::V2
    }
}

/// The executable result of compiling one unit. Replaced, never mutated,
/// on recompilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifact {
    pub unit_id: String,
    pub executable_code: Option<String>,
    pub source_text: String,
    #[serde(default)]
    pub compiled_at_ms: Option<u64>,
    pub compilation_error: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<ConflictRecord>,
    pub is_fallback: bool,
    pub artifact_version: ContractVersion,
}

pub(crate) fn now_ms() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64)
}
