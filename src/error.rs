//! Compilation error taxonomy.
//!
//! Every variant except extraction degradation is recoverable via the
//! fallback path in permissive mode; strict mode surfaces them to the
//! caller as a structured rejection.

use thiserror::Error;

pub const ERR_TRANSPILE: &str = "SC-ERR-TRANSPILE";
pub const ERR_CONFLICT_UNRESOLVED: &str = "SC-ERR-CONFLICT";
pub const ERR_ENTRY_AMBIGUOUS: &str = "SC-ERR-ENTRY";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    /// The source never became executable code: syntax problems in the
    /// generated or edited text.
    #[error("transpile failed for unit {unit_id}: {message}")]
    TranspileError { unit_id: String, message: String },

    /// A collision could not be safely renamed; shipping the rewrite
    /// would risk a corrupted artifact.
    #[error("could not safely rename {identifiers:?} in unit {unit_id}")]
    ConflictUnresolved {
        unit_id: String,
        identifiers: Vec<String>,
    },

    /// No unambiguous entry identifier. The wrapper never guesses.
    #[error("no unambiguous entry for unit {unit_id}; candidates: {candidates:?}")]
    EntryAmbiguous {
        unit_id: String,
        candidates: Vec<String>,
    },
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::TranspileError { .. } => ERR_TRANSPILE,
            CompileError::ConflictUnresolved { .. } => ERR_CONFLICT_UNRESOLVED,
            CompileError::EntryAmbiguous { .. } => ERR_ENTRY_AMBIGUOUS,
        }
    }

    pub fn unit_id(&self) -> &str {
        match self {
            CompileError::TranspileError { unit_id, .. }
            | CompileError::ConflictUnresolved { unit_id, .. }
            | CompileError::EntryAmbiguous { unit_id, .. } => unit_id,
        }
    }
}
