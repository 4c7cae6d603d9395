//! Executable wrapping and entry resolution.
//!
//! Compiled code is turned into a callable from text by the host
//! (`new Function(...)`), which does not implicitly export a value, so the
//! wrapper guarantees the last statement is `return <Entry>;`. Both
//! contract versions share one parameter order; v1 additionally reads the
//! capabilities from well-known globals in a prelude.

use crate::artifact::ContractVersion;
use crate::error::CompileError;
use crate::extract::ExtractedIdentifiers;

/// Shared capability parameter/declaration order for both contract
/// versions. A v2 host builds `new Function("React", "SceneKit", code)`
/// and supplies them positionally.
pub const CONTRACT_PARAMS: [&str; 2] = ["React", "SceneKit"];

/// Pick the unit's entry: the resolved default-export target when one was
/// captured, otherwise the sole top-level callable. Never guesses.
pub fn resolve_entry(
    identifiers: &ExtractedIdentifiers,
    default_entry: Option<&str>,
    unit_id: &str,
) -> Result<String, CompileError> {
    if let Some(entry) = default_entry {
        if identifiers.declares(entry) {
            return Ok(entry.to_string());
        }
        // A default export pointing at nothing the unit declares is not
        // something to guess around.
        return Err(CompileError::EntryAmbiguous {
            unit_id: unit_id.to_string(),
            candidates: vec![entry.to_string()],
        });
    }

    let candidates = identifiers.entry_candidates();
    match candidates.as_slice() {
        [only] => Ok((*only).to_string()),
        _ => Err(CompileError::EntryAmbiguous {
            unit_id: unit_id.to_string(),
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
        }),
    }
}

/// Append the execution-contract glue to transpiled, conflict-free code.
pub fn wrap_executable(
    code: &str,
    entry: &str,
    version: ContractVersion,
    identifiers: &ExtractedIdentifiers,
) -> String {
    let mut out = String::with_capacity(code.len() + 128);

    if version == ContractVersion::V1 {
        for param in CONTRACT_PARAMS {
            // A unit that declares one of these itself wins; emitting the
            // prelude binding anyway would throw on redeclaration.
            if !identifiers.declares(param) {
                out.push_str(&format!("const {} = window.{};\n", param, param));
            }
        }
    }

    out.push_str(code);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&format!("return {};\n", entry));
    out
}
