//! Compilation orchestrator.
//!
//! Sequences normalize → transpile → conflict check/resolve → wrap under a
//! caller-selected policy. Permissive mode always yields a usable artifact
//! (at worst a labeled fallback); strict mode surfaces the error instead.
//! The orchestrator never re-invokes the expensive upstream generation
//! step; whether to regenerate is exclusively the caller's decision, and
//! this pipeline exists to minimize how often that is ever needed.

use crate::artifact::{now_ms, CompilationUnit, CompiledArtifact, ConflictRecord, ContractVersion};
use crate::cache::IdentifierCache;
use crate::conflict::{detect_conflicts, SiblingSnapshot};
use crate::error::CompileError;
use crate::extract::extract_identifiers;
use crate::fallback::generate_fallback;
use crate::normalize::normalize_source;
use crate::rename::resolve_conflicts;
use crate::transpile::transpile;
use crate::wrap::{resolve_entry, wrap_executable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileMode {
    /// Always yield a usable artifact; failures become fallbacks.
    Permissive,
    /// Surface failures as structured rejections. Recommended for export.
    Strict,
}

/// Pipeline states, in order. `Succeeded` and `Fallback` both carry a
/// usable artifact; `Rejected` carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompileState {
    Received,
    Normalizing,
    Transpiling,
    ConflictChecking,
    Wrapping,
    Succeeded,
    Fallback,
    Rejected,
}

#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub mode: CompileMode,
    pub version: ContractVersion,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            mode: CompileMode::Permissive,
            version: ContractVersion::V2,
        }
    }
}

/// Compile one unit against a sibling set. Convenience wrapper that
/// snapshots `siblings` first; batch callers build the snapshot once.
pub fn compile(
    unit: &CompilationUnit,
    siblings: &[CompiledArtifact],
    options: CompileOptions,
) -> Result<CompiledArtifact, CompileError> {
    let mut cache = IdentifierCache::new();
    let snapshot = SiblingSnapshot::from_artifacts(siblings, &mut cache);
    compile_with_snapshot(unit, &snapshot, options)
}

/// Compile one unit against a pre-built snapshot. Pure and synchronous;
/// safe to call from many threads with the same snapshot.
pub fn compile_with_snapshot(
    unit: &CompilationUnit,
    snapshot: &SiblingSnapshot,
    options: CompileOptions,
) -> Result<CompiledArtifact, CompileError> {
    let mut state = CompileState::Received;
    debug!(unit_id = %unit.id, state = ?state, "compile start");

    state = CompileState::Normalizing;
    debug!(unit_id = %unit.id, state = ?state, "normalizing");
    let normalized = normalize_source(&unit.source_text);

    state = CompileState::Transpiling;
    debug!(unit_id = %unit.id, state = ?state, "transpiling");
    let transpiled = match transpile(&normalized.code, &unit.id) {
        Ok(code) => code,
        Err(err) => return finish_failed(unit, err, options),
    };

    state = CompileState::ConflictChecking;
    debug!(unit_id = %unit.id, state = ?state, "transpile ok");
    let identifiers = extract_identifiers(&normalized.code);
    if identifiers.degraded {
        // Safe by omission: zero identifiers found means zero conflicts
        // detected, never a blocked compilation.
        warn!(unit_id = %unit.id, "identifier extraction degraded");
    }

    let collisions = detect_conflicts(&identifiers, snapshot);
    let (final_code, final_identifiers, records) = if collisions.is_empty() {
        (transpiled, identifiers, vec![])
    } else {
        debug!(unit_id = %unit.id, ?collisions, "resolving conflicts");
        let outcome =
            match resolve_conflicts(&normalized.code, &collisions, &unit.rename_token(), &unit.id) {
                Ok(outcome) => outcome,
                Err(err) => return finish_failed(unit, err, options),
            };
        // One re-transpile of the renamed source; a second failure here
        // falls through to policy like the first.
        let retranspiled = match transpile(&outcome.source, &unit.id) {
            Ok(code) => code,
            Err(err) => return finish_failed(unit, err, options),
        };
        let renamed_identifiers = extract_identifiers(&outcome.source);
        (retranspiled, renamed_identifiers, outcome.records)
    };

    state = CompileState::Wrapping;
    debug!(unit_id = %unit.id, state = ?state, "wrapping");
    let entry_hint = mapped_entry(normalized.default_entry.as_deref(), &records);
    let entry = match resolve_entry(&final_identifiers, entry_hint.as_deref(), &unit.id) {
        Ok(entry) => entry,
        Err(err) => return finish_failed(unit, err, options),
    };

    let executable = wrap_executable(&final_code, &entry, options.version, &final_identifiers);

    state = CompileState::Succeeded;
    debug!(unit_id = %unit.id, state = ?state, conflicts = records.len(), "compile done");
    Ok(CompiledArtifact {
        unit_id: unit.id.clone(),
        executable_code: Some(executable),
        source_text: unit.source_text.clone(),
        compiled_at_ms: now_ms(),
        compilation_error: None,
        conflicts: records,
        is_fallback: false,
        artifact_version: options.version,
    })
}

/// Compile a batch in parallel against one consistent snapshot. Output
/// order matches input order. Two units in one batch are never siblings
/// of each other: accepting both is the caller's follow-up, one at a time.
pub fn compile_batch(
    units: &[CompilationUnit],
    siblings: &[CompiledArtifact],
    options: CompileOptions,
) -> Vec<Result<CompiledArtifact, CompileError>> {
    let mut cache = IdentifierCache::new();
    let snapshot = SiblingSnapshot::from_artifacts(siblings, &mut cache);
    units
        .par_iter()
        .map(|unit| compile_with_snapshot(unit, &snapshot, options))
        .collect()
}

/// Default-export target after conflict resolution: the entry may itself
/// have been one of the renamed identifiers.
fn mapped_entry(entry: Option<&str>, records: &[ConflictRecord]) -> Option<String> {
    entry.map(|name| {
        records
            .iter()
            .find(|r| r.identifier == name)
            .map(|r| r.resolved_name.clone())
            .unwrap_or_else(|| name.to_string())
    })
}

fn finish_failed(
    unit: &CompilationUnit,
    err: CompileError,
    options: CompileOptions,
) -> Result<CompiledArtifact, CompileError> {
    match options.mode {
        CompileMode::Strict => {
            warn!(unit_id = %unit.id, code = err.code(), state = ?CompileState::Rejected, "compile rejected");
            Err(err)
        }
        CompileMode::Permissive => {
            warn!(unit_id = %unit.id, code = err.code(), state = ?CompileState::Fallback, "falling back");
            let message = err.to_string();
            let executable = generate_fallback(
                &unit.id,
                Some(&message),
                &unit.rename_token(),
                options.version,
            );
            Ok(CompiledArtifact {
                unit_id: unit.id.clone(),
                executable_code: Some(executable),
                source_text: unit.source_text.clone(),
                compiled_at_ms: now_ms(),
                compilation_error: Some(message),
                conflicts: vec![],
                is_fallback: true,
                artifact_version: options.version,
            })
        }
    }
}
