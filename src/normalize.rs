//! Source normalization.
//!
//! Artifacts are invoked directly, never loaded as modules, so all module
//! import/export syntax is stripped. Capability imports become the one
//! canonical access form (`const { x } = SceneKit;`), and the alternate
//! spellings `window.SceneKit` / `globalThis.SceneKit` collapse to the
//! bare `SceneKit` binding the wrapper guarantees. Idempotent: a second
//! pass finds nothing left to rewrite.

use crate::extract::{CAPABILITY_NAMESPACE, CAPABILITY_SOURCE};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Expression, ExportDefaultDeclarationKind, ImportDeclarationSpecifier, Statement,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};

/// Synthesized entry name for anonymous default exports.
pub const ANONYMOUS_ENTRY: &str = "__sceneDefault";

#[derive(Debug, Clone)]
pub struct NormalizedSource {
    pub code: String,
    /// The default-export target, captured before export-stripping. The
    /// wrapper resolves the entry from this when present.
    pub default_entry: Option<String>,
}

/// Normalize `source`. Never fails: input the parser cannot recover is
/// returned unchanged and left for the transpiler to report.
pub fn normalize_source(source: &str) -> NormalizedSource {
    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_typescript(true)
        .with_jsx(true)
        .with_module(true);
    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return NormalizedSource {
            code: source.to_string(),
            default_entry: None,
        };
    }

    let mut replacements: Vec<(u32, u32, String)> = Vec::new();
    let mut default_entry: Option<String> = None;

    for stmt in &ret.program.body {
        match stmt {
            Statement::ImportDeclaration(import) => {
                let rewritten = if import.source.value == CAPABILITY_SOURCE {
                    rewrite_capability_import(import)
                } else {
                    String::new()
                };
                replacements.push((import.span.start, import.span.end, rewritten));
            }
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                    match &func.id {
                        Some(id) => {
                            default_entry = Some(id.name.to_string());
                            replacements.push((export.span.start, func.span.start, String::new()));
                        }
                        None => {
                            default_entry = Some(ANONYMOUS_ENTRY.to_string());
                            replacements.push((
                                export.span.start,
                                func.span.start,
                                format!("const {} = ", ANONYMOUS_ENTRY),
                            ));
                        }
                    }
                }
                ExportDefaultDeclarationKind::ClassDeclaration(class) => match &class.id {
                    Some(id) => {
                        default_entry = Some(id.name.to_string());
                        replacements.push((export.span.start, class.span.start, String::new()));
                    }
                    None => {
                        default_entry = Some(ANONYMOUS_ENTRY.to_string());
                        replacements.push((
                            export.span.start,
                            class.span.start,
                            format!("const {} = ", ANONYMOUS_ENTRY),
                        ));
                    }
                },
                other => {
                    if let Some(expr) = other.as_expression() {
                        if let Expression::Identifier(id) = expr {
                            // `export default Scene;` names an existing
                            // declaration; the statement itself goes away.
                            default_entry = Some(id.name.to_string());
                            replacements.push((export.span.start, export.span.end, String::new()));
                        } else {
                            default_entry = Some(ANONYMOUS_ENTRY.to_string());
                            replacements.push((
                                export.span.start,
                                expr.span().start,
                                format!("const {} = ", ANONYMOUS_ENTRY),
                            ));
                        }
                    } else {
                        replacements.push((export.span.start, export.span.end, String::new()));
                    }
                }
            },
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                // `export const X = ...` keeps its declaration.
                Some(decl) => {
                    replacements.push((export.span.start, decl.span().start, String::new()));
                }
                // `export { a, b }` / re-exports introduce nothing, but a
                // `default` specifier still names the entry.
                None => {
                    if export.source.is_none() {
                        for spec in &export.specifiers {
                            if module_export_name(&spec.exported) == "default" {
                                default_entry = Some(module_export_name(&spec.local));
                            }
                        }
                    }
                    replacements.push((export.span.start, export.span.end, String::new()));
                }
            },
            Statement::ExportAllDeclaration(export) => {
                replacements.push((export.span.start, export.span.end, String::new()));
            }
            _ => {}
        }
    }

    let mut canonicalizer = CapabilityCanonicalizer {
        replacements: &mut replacements,
    };
    canonicalizer.visit_program(&ret.program);

    let code = crate::rename::apply_replacements(source, replacements)
        .unwrap_or_else(|| source.to_string());

    NormalizedSource {
        code,
        default_entry,
    }
}

fn module_export_name(name: &oxc_ast::ast::ModuleExportName) -> String {
    match name {
        oxc_ast::ast::ModuleExportName::IdentifierName(id) => id.name.to_string(),
        oxc_ast::ast::ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        oxc_ast::ast::ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}

fn rewrite_capability_import(import: &oxc_ast::ast::ImportDeclaration) -> String {
    let mut named: Vec<String> = Vec::new();
    let mut aliased: Vec<String> = Vec::new();

    if let Some(specifiers) = &import.specifiers {
        for specifier in specifiers {
            match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                    let imported = module_export_name(&spec.imported);
                    let local = spec.local.name.to_string();
                    if imported == local {
                        named.push(local);
                    } else {
                        named.push(format!("{}: {}", imported, local));
                    }
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                    aliased.push(spec.local.name.to_string());
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                    aliased.push(spec.local.name.to_string());
                }
            }
        }
    }

    let mut lines: Vec<String> = Vec::new();
    for alias in aliased {
        // Default and namespace imports both mean "the whole namespace".
        if alias != CAPABILITY_NAMESPACE {
            lines.push(format!("const {} = {};", alias, CAPABILITY_NAMESPACE));
        }
    }
    if !named.is_empty() {
        lines.push(format!(
            "const {{ {} }} = {};",
            named.join(", "),
            CAPABILITY_NAMESPACE
        ));
    }
    lines.join("\n")
}

/// Rewrites `window.SceneKit` / `globalThis.SceneKit` (dot or bracket
/// form) to the bare canonical binding.
struct CapabilityCanonicalizer<'r> {
    replacements: &'r mut Vec<(u32, u32, String)>,
}

impl<'a, 'r> Visit<'a> for CapabilityCanonicalizer<'r> {
    fn visit_variable_declarator(&mut self, decl: &oxc_ast::ast::VariableDeclarator<'a>) {
        // `const SceneKit = window.SceneKit;` is the legacy v1 prelude
        // spelling. Rewriting its initializer would produce a self
        // reference that throws before the binding exists, so the whole
        // initializer is left alone whenever the declarator binds the
        // namespace name itself.
        let mut names = Vec::new();
        crate::extract::collect_pattern_names(&decl.id, &mut names);
        if names.iter().any(|n| n == CAPABILITY_NAMESPACE) {
            return;
        }
        walk::walk_variable_declarator(self, decl);
    }

    fn visit_static_member_expression(
        &mut self,
        expr: &oxc_ast::ast::StaticMemberExpression<'a>,
    ) {
        if expr.property.name == CAPABILITY_NAMESPACE && is_global_object(&expr.object) {
            self.replacements
                .push((expr.span.start, expr.span.end, CAPABILITY_NAMESPACE.to_string()));
            return;
        }
        walk::walk_static_member_expression(self, expr);
    }

    fn visit_computed_member_expression(
        &mut self,
        expr: &oxc_ast::ast::ComputedMemberExpression<'a>,
    ) {
        if let Expression::StringLiteral(s) = &expr.expression {
            if s.value == CAPABILITY_NAMESPACE && is_global_object(&expr.object) {
                self.replacements.push((
                    expr.span.start,
                    expr.span.end,
                    CAPABILITY_NAMESPACE.to_string(),
                ));
                return;
            }
        }
        walk::walk_computed_member_expression(self, expr);
    }
}

fn is_global_object(expr: &Expression) -> bool {
    matches!(expr, Expression::Identifier(id) if id.name == "window" || id.name == "globalThis")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_capability_import_becomes_destructure() {
        let n = normalize_source("import { useFrame, interpolate } from \"scenekit\";\nuseFrame();");
        assert_eq!(
            n.code,
            "const { useFrame, interpolate } = SceneKit;\nuseFrame();"
        );
    }

    #[test]
    fn test_aliased_capability_import() {
        let n = normalize_source("import { useFrame as frame } from \"scenekit\";");
        assert_eq!(n.code, "const { useFrame: frame } = SceneKit;");
    }

    #[test]
    fn test_foreign_imports_stripped() {
        let n = normalize_source("import React from \"react\";\nimport \"./styles.css\";\nconst x = 1;");
        assert_eq!(n.code.trim(), "const x = 1;");
    }

    #[test]
    fn test_default_export_captured_and_stripped() {
        let n = normalize_source("export default function Scene() { return null; }");
        assert_eq!(n.default_entry.as_deref(), Some("Scene"));
        assert_eq!(n.code, "function Scene() { return null; }");
    }

    #[test]
    fn test_default_export_identifier_statement_removed() {
        let n = normalize_source("const Scene = () => null;\nexport default Scene;");
        assert_eq!(n.default_entry.as_deref(), Some("Scene"));
        assert!(!n.code.contains("export"));
        assert!(n.code.contains("const Scene = () => null;"));
    }

    #[test]
    fn test_anonymous_default_export_gets_a_name() {
        let n = normalize_source("export default function () { return null; }");
        assert_eq!(n.default_entry.as_deref(), Some(ANONYMOUS_ENTRY));
        assert!(n.code.starts_with("const __sceneDefault = function ()"));
    }

    #[test]
    fn test_default_export_specifier_captured() {
        let n = normalize_source(
            "const Scene = () => null;\nfunction Other() {}\nexport { Scene as default };",
        );
        assert_eq!(n.default_entry.as_deref(), Some("Scene"));
        assert!(!n.code.contains("export"));
        assert!(n.code.contains("const Scene = () => null;"));
    }

    #[test]
    fn test_default_reexport_not_treated_as_entry() {
        let n = normalize_source("export { Scene as default } from \"./other\";");
        assert_eq!(n.default_entry, None);
        assert!(!n.code.contains("export"));
    }

    #[test]
    fn test_named_export_keeps_declaration() {
        let n = normalize_source("export const Card = () => null;");
        assert_eq!(n.code, "const Card = () => null;");
        assert_eq!(n.default_entry, None);
    }

    #[test]
    fn test_window_spellings_canonicalized() {
        let n = normalize_source(
            "const { spring } = window.SceneKit;\nconst f = globalThis.SceneKit.useFrame;\nconst g = window[\"SceneKit\"];",
        );
        assert_eq!(
            n.code,
            "const { spring } = SceneKit;\nconst f = SceneKit.useFrame;\nconst g = SceneKit;"
        );
    }

    #[test]
    fn test_legacy_namespace_prelude_not_self_referenced() {
        let n = normalize_source(
            "const SceneKit = window.SceneKit;\nconst f = window.SceneKit.useFrame;",
        );
        assert!(
            n.code.contains("const SceneKit = window.SceneKit;"),
            "legacy prelude must survive untouched: {}",
            n.code
        );
        assert!(!n.code.contains("const SceneKit = SceneKit;"));
        assert!(n.code.contains("const f = SceneKit.useFrame;"));
    }

    #[test]
    fn test_idempotent() {
        let source = "import { useFrame } from \"scenekit\";\nexport default function Scene() { return useFrame(); }";
        let once = normalize_source(source);
        let twice = normalize_source(&once.code);
        assert_eq!(once.code, twice.code);
    }

    #[test]
    fn test_untargeted_constructs_untouched() {
        let source = "const win = { SceneKit: 1 };\nconst x = other.SceneKit;";
        let n = normalize_source(source);
        assert_eq!(n.code, source);
    }

    #[test]
    fn test_unparseable_input_passes_through() {
        let source = "function Scene() { return <div>";
        let n = normalize_source(source);
        assert_eq!(n.code, source);
        assert_eq!(n.default_entry, None);
    }
}
