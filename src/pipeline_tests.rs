//! End-to-end pipeline tests.
//!
//! These exercise the orchestrator through real source text and verify the
//! load-bearing guarantees:
//! - permissive compilation is total (a usable artifact always comes back)
//! - collisions against siblings are renamed, recorded, and isolated
//! - strict mode rejects with a structured, coded error
//! - recompiling identical input against identical siblings is byte-stable

#[cfg(test)]
mod tests {
    use crate::artifact::{CompilationUnit, CompiledArtifact, ContractVersion};
    use crate::error::{CompileError, ERR_ENTRY_AMBIGUOUS, ERR_TRANSPILE};
    use crate::pipeline::{compile, compile_batch, CompileMode, CompileOptions};
    use pretty_assertions::assert_eq;

    fn unit(id: &str, source: &str) -> CompilationUnit {
        CompilationUnit::new(id, "proj-1", source)
    }

    /// A sibling as the host would hand it back: source plus any rename
    /// records from its own compilation.
    fn sibling(unit_id: &str, source: &str) -> CompiledArtifact {
        CompiledArtifact {
            unit_id: unit_id.to_string(),
            executable_code: Some(String::new()),
            source_text: source.to_string(),
            compiled_at_ms: Some(0),
            compilation_error: None,
            conflicts: vec![],
            is_fallback: false,
            artifact_version: ContractVersion::V2,
        }
    }

    fn permissive() -> CompileOptions {
        CompileOptions::default()
    }

    fn strict() -> CompileOptions {
        CompileOptions {
            mode: CompileMode::Strict,
            ..CompileOptions::default()
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Clean path: normalize, transpile, wrap
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_clean_unit_compiles_to_executable() {
        let u = unit(
            "scene-1",
            r#"
import { useFrame, interpolate } from "scenekit";

export default function Scene() {
  const frame = useFrame();
  return <div>{interpolate(frame, [0, 30], [0, 1])}</div>;
}
"#,
        );

        let artifact = compile(&u, &[], permissive()).expect("permissive compile must succeed");
        assert!(!artifact.is_fallback, "Clean source must not fall back");
        assert!(artifact.compilation_error.is_none());
        assert!(artifact.conflicts.is_empty());

        let code = artifact.executable_code.expect("Executable must be present");
        assert!(code.contains("SceneKit"), "Capability destructure survives: {}", code);
        assert!(code.contains("useFrame"));
        assert!(code.trim_end().ends_with("return Scene;"));
        assert!(!code.contains("import"), "Module syntax must be gone: {}", code);
        assert!(!code.contains("export"), "Module syntax must be gone: {}", code);
        assert!(code.contains("React.createElement"), "JSX must be lowered: {}", code);
    }

    #[test]
    fn test_default_export_specifier_resolves_entry() {
        let u = unit(
            "scene-spec",
            r#"
function Helper() { return <span/>; }
function Scene() { return <div><Helper /></div>; }
export { Scene as default };
"#,
        );

        let artifact = compile(&u, &[], permissive()).expect("compile");
        assert!(!artifact.is_fallback, "two callables plus a default specifier is unambiguous");
        let code = artifact.executable_code.expect("executable");
        assert!(code.trim_end().ends_with("return Scene;"));
    }

    #[test]
    fn test_v1_artifact_reads_capabilities_from_globals() {
        let u = unit("scene-v1", "export default function Scene() { return <div/>; }");
        let options = CompileOptions {
            version: ContractVersion::V1,
            ..permissive()
        };

        let artifact = compile(&u, &[], options).expect("compile");
        let code = artifact.executable_code.expect("executable");
        assert!(code.starts_with("const React = window.React;\nconst SceneKit = window.SceneKit;\n"));
        assert_eq!(artifact.artifact_version, ContractVersion::V1);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Collision handling
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_collision_renamed_and_recorded() {
        let u = unit(
            "scene-2",
            r#"
function Button() { return <button>go</button>; }

export default function Scene() {
  return <div><Button /></div>;
}
"#,
        );
        let siblings = [sibling("scene-1", "function Button() { return null; }")];

        let artifact = compile(&u, &siblings, permissive()).expect("compile");
        assert!(!artifact.is_fallback);

        let token = u.rename_token();
        let renamed = format!("Button_{}", token);
        assert_eq!(artifact.conflicts.len(), 1, "Exactly one collision expected");
        assert_eq!(artifact.conflicts[0].identifier, "Button");
        assert_eq!(artifact.conflicts[0].resolved_name, renamed);
        assert_eq!(artifact.conflicts[0].source_unit_id, "scene-2");

        let code = artifact.executable_code.expect("executable");
        assert!(code.contains(&format!("function {}(", renamed)), "Declaration renamed: {}", code);
        assert!(code.contains(&renamed), "JSX reference renamed: {}", code);
        assert!(!code.contains("function Button("), "Old declaration must be gone: {}", code);
    }

    #[test]
    fn test_renamed_entry_still_returned() {
        let u = unit("scene-3", "export default function Scene() { return <div/>; }");
        let siblings = [sibling("scene-1", "const Scene = 1;")];

        let artifact = compile(&u, &siblings, permissive()).expect("compile");
        let renamed = format!("Scene_{}", u.rename_token());
        let code = artifact.executable_code.expect("executable");
        assert!(
            code.trim_end().ends_with(&format!("return {};", renamed)),
            "Entry must follow its rename: {}",
            code
        );
    }

    #[test]
    fn test_all_renames_share_one_token() {
        let u = unit(
            "scene-4",
            r#"
function Card() { return <div/>; }
function Title() { return <h1/>; }

export default function Scene() {
  return <Card><Title /></Card>;
}
"#,
        );
        let siblings = [sibling(
            "scene-1",
            "function Card() {}\nfunction Title() {}",
        )];

        let artifact = compile(&u, &siblings, permissive()).expect("compile");
        let token = u.rename_token();
        assert_eq!(artifact.conflicts.len(), 2);
        for record in &artifact.conflicts {
            assert!(
                record.resolved_name.ends_with(&token),
                "All renames in one compile use the unit's token: {:?}",
                record
            );
        }
    }

    #[test]
    fn test_anonymous_default_exports_collide_across_units() {
        // Both units get the same synthesized entry name during
        // normalization; the second must rename it like any other
        // top-level collision.
        let source = "export default function () { return <div/>; }";
        let ua = unit("anon-a", source);
        let ub = unit("anon-b", source);

        let a = compile(&ua, &[], permissive()).expect("first unit compiles");
        let b = compile(&ub, &[a], permissive()).expect("second unit compiles");

        assert_eq!(b.conflicts.len(), 1, "synthesized entry must collide");
        assert_eq!(b.conflicts[0].identifier, "__sceneDefault");
        let renamed = format!("__sceneDefault_{}", ub.rename_token());
        assert_eq!(b.conflicts[0].resolved_name, renamed);

        let code = b.executable_code.expect("executable");
        assert!(code.contains(&renamed), "renamed entry declared: {}", code);
        assert!(
            code.trim_end().ends_with(&format!("return {};", renamed)),
            "entry follows the rename: {}",
            code
        );
    }

    #[test]
    fn test_resolution_leaves_no_remaining_collisions() {
        use crate::cache::IdentifierCache;
        use crate::conflict::{detect_conflicts, SiblingSnapshot};
        use crate::extract::extract_identifiers;
        use crate::rename::resolve_conflicts;

        let siblings = [sibling(
            "scene-1",
            "const Card = 1;\nconst Title = 2;\nconst Counter = 3;",
        )];
        let mut cache = IdentifierCache::new();
        let snapshot = SiblingSnapshot::from_artifacts(&siblings, &mut cache);

        let source = "const Card = 1;\nconst Title = 2;\nconst Counter = () => Card + Title;";
        let collisions = detect_conflicts(&extract_identifiers(source), &snapshot);
        assert_eq!(collisions, vec!["Card", "Title", "Counter"]);

        let outcome = resolve_conflicts(source, &collisions, "tok", "scene-2").expect("resolve");
        let remaining = detect_conflicts(&extract_identifiers(&outcome.source), &snapshot);
        assert!(remaining.is_empty(), "still colliding: {:?}", remaining);
    }

    #[test]
    fn test_sibling_rename_releases_original_name() {
        // The sibling's own Button was already renamed away, so its
        // original spelling is free for this unit.
        let mut taken = sibling("scene-1", "function Button() { return null; }");
        taken.conflicts = vec![crate::artifact::ConflictRecord {
            identifier: "Button".to_string(),
            resolved_name: "Button_deadbeef".to_string(),
            source_unit_id: "scene-1".to_string(),
        }];

        let u = unit(
            "scene-5",
            "function Button() { return <button/>; }\nexport default function Scene() { return <Button/>; }",
        );
        let artifact = compile(&u, &[taken], permissive()).expect("compile");
        assert!(
            artifact.conflicts.is_empty(),
            "Released name must not conflict: {:?}",
            artifact.conflicts
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Failure policy: permissive falls back, strict rejects
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_broken_source_falls_back_permissive() {
        let u = unit("scene-6", "export default function Scene() { return <div>");

        let artifact = compile(&u, &[], permissive()).expect("permissive is total");
        assert!(artifact.is_fallback);
        assert!(artifact.compilation_error.is_some(), "Diagnostic must be preserved");
        assert_eq!(artifact.source_text, u.source_text, "Source survives for re-editing");

        let code = artifact.executable_code.expect("fallback executable");
        assert!(code.contains(&format!("__Fallback_{}", u.rename_token())));
        assert!(code.contains("Scene unavailable"));
        assert!(code.trim_end().ends_with(&format!("return __Fallback_{};", u.rename_token())));
    }

    #[test]
    fn test_broken_source_rejected_strict() {
        let u = unit("scene-7", "export default function Scene() { return <div>");

        let err = compile(&u, &[], strict()).expect_err("strict must reject");
        assert_eq!(err.code(), ERR_TRANSPILE);
        assert_eq!(err.unit_id(), "scene-7");
        match err {
            CompileError::TranspileError { message, .. } => {
                assert!(!message.is_empty(), "Diagnostic must be carried");
            }
            other => panic!("Expected TranspileError, got {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_entry_rejected_strict() {
        let u = unit(
            "scene-8",
            "function A() { return <div/>; }\nfunction B() { return <div/>; }",
        );

        let err = compile(&u, &[], strict()).expect_err("no unambiguous entry");
        assert_eq!(err.code(), ERR_ENTRY_AMBIGUOUS);
    }

    #[test]
    fn test_fallback_v2_is_self_contained() {
        let u = unit("scene-9", "not even close to ts {{{");
        let artifact = compile(&u, &[], permissive()).expect("permissive");
        let code = artifact.executable_code.expect("executable");
        assert!(!code.contains("window."), "V2 fallback must not read globals: {}", code);
        assert!(code.contains("React.createElement"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Determinism and batch isolation
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_recompile_is_byte_stable() {
        let u = unit(
            "scene-10",
            "function Button() { return <b/>; }\nexport default function Scene() { return <Button/>; }",
        );
        let siblings = [sibling("scene-1", "const Button = 1;")];

        let first = compile(&u, &siblings, permissive()).expect("first");
        let second = compile(&u, &siblings, permissive()).expect("second");
        assert_eq!(first.executable_code, second.executable_code);
        assert_eq!(first.conflicts, second.conflicts);
    }

    #[test]
    fn test_batch_preserves_order_and_isolates_failures() {
        let units = vec![
            unit(
                "batch-a",
                "function Button() { return <b/>; }\nexport default function Scene() { return <Button/>; }",
            ),
            unit("batch-b", "export default function Scene() { return <div>"),
            unit("batch-c", "export default function Scene() { return <div/>; }"),
        ];
        let siblings = [sibling("scene-1", "function Button() {}")];

        let results = compile_batch(&units, &siblings, permissive());
        assert_eq!(results.len(), 3);

        let a = results[0].as_ref().expect("batch-a compiles");
        assert_eq!(a.unit_id, "batch-a");
        assert_eq!(a.conflicts.len(), 1, "Only the colliding unit gets a record");

        let b = results[1].as_ref().expect("permissive batch is total");
        assert_eq!(b.unit_id, "batch-b");
        assert!(b.is_fallback, "Broken unit falls back without touching others");

        let c = results[2].as_ref().expect("batch-c compiles");
        assert_eq!(c.unit_id, "batch-c");
        assert!(!c.is_fallback);
        assert!(c.conflicts.is_empty());
    }

    #[test]
    fn test_two_units_colliding_get_distinct_tokens() {
        let ua = unit(
            "batch-x",
            "function Button() { return <b/>; }\nexport default function Scene() { return <Button/>; }",
        );
        let ub = unit(
            "batch-y",
            "function Button() { return <i/>; }\nexport default function Scene() { return <Button/>; }",
        );
        let siblings = [sibling("scene-1", "function Button() {}")];

        let results = compile_batch(&[ua, ub], &siblings, permissive());
        let a = results[0].as_ref().expect("x");
        let b = results[1].as_ref().expect("y");
        assert_ne!(
            a.conflicts[0].resolved_name, b.conflicts[0].resolved_name,
            "Renames are namespaced per unit"
        );
    }
}
