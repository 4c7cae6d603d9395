//! # Scene Compiler Ground Truth
//!
//! Turns untrusted generated scene source (TS/JSX) into executable
//! artifacts that coexist in one shared host scope.
//!
//! ## Pipeline Invariants
//!
//! 1. **Totality (permissive mode)**: `compile` always yields a usable
//!    artifact. A unit that cannot be compiled gets a labeled fallback
//!    component; the pipeline never asks upstream to regenerate.
//!
//! 2. **Structured rejection (strict mode)**: a failed compile returns a
//!    coded [`CompileError`] naming the unit and the failing stage, and
//!    nothing else.
//!
//! 3. **Isolation**: compiling one unit never touches its siblings.
//!    Collisions are resolved by renaming inside the NEW unit only,
//!    suffixed with that unit's stable token.
//!
//! 4. **Reference integrity**: when a top-level name is renamed, every
//!    reference in the unit follows (declarations, call sites, JSX tags,
//!    object shorthand) while inner shadowing bindings stay untouched.
//!
//! 5. **Contract honesty**: wrapped code's last statement is
//!    `return <Entry>;`. V1 artifacts read capabilities from well-known
//!    globals via a prelude; V2 artifacts receive them as parameters in
//!    [`CONTRACT_PARAMS`] order and never read globals.
//!
//! 6. **Determinism**: identical source compiled against an identical
//!    sibling set yields byte-identical executable code. Timestamps are
//!    metadata and excluded from that guarantee.
//!
//! 7. **Safe degradation**: identifier extraction that cannot parse a
//!    unit reports nothing rather than guessing, so a degraded scan can
//!    miss a conflict but can never block a compile.

pub mod artifact;
pub mod cache;
pub mod conflict;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod normalize;
pub mod pipeline;
pub mod rename;
pub mod transpile;
pub mod wrap;

#[cfg(test)]
mod pipeline_tests;

pub use artifact::{
    CompilationUnit, CompiledArtifact, ConflictRecord, ContractVersion, UnitKind,
};
pub use cache::IdentifierCache;
pub use conflict::{detect_conflicts, SiblingSnapshot};
pub use error::CompileError;
pub use extract::{extract_identifiers, ExtractedIdentifiers, CAPABILITY_NAMESPACE};
pub use pipeline::{compile, compile_batch, compile_with_snapshot, CompileMode, CompileOptions};
pub use wrap::CONTRACT_PARAMS;
