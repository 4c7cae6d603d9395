//! Top-level identifier extraction.
//!
//! Finds the bindings a unit introduces at outermost scope. Only top-level
//! precision matters: nested names cannot collide across units. Extraction
//! never fails: unrecoverable input yields an empty, degraded set, which
//! downstream reads as "no conflicts detected".

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, Declaration, Expression, ExportDefaultDeclarationKind, Statement,
    VariableDeclarationKind,
};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::collections::HashSet;

/// The single host runtime namespace every execution host provides.
pub const CAPABILITY_NAMESPACE: &str = "SceneKit";

/// Module specifier whose imports resolve to the host namespace.
pub const CAPABILITY_SOURCE: &str = "scenekit";

lazy_static! {
    /// Names the host supplies. These resolve to host objects, never to
    /// unit-local declarations, so they are exempt from collision handling.
    pub static ref SCENE_CAPABILITIES: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("React");
        s.insert("SceneKit");
        s.insert("Canvas");
        s.insert("Sequence");
        s.insert("Img");
        s.insert("Audio");
        s.insert("Video");
        s.insert("useFrame");
        s.insert("useDuration");
        s.insert("interpolate");
        s.insert("spring");
        s.insert("random");
        s.insert("Easing");
        s
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Const,
    Let,
    Var,
    Function,
    Class,
    Enum,
}

#[derive(Debug, Clone)]
pub struct TopLevelBinding {
    pub name: String,
    pub kind: BindingKind,
    /// True for function/class declarations and for `const X = () => ...`
    /// style initializers: the shapes that can serve as an entry component.
    pub callable: bool,
    /// True when destructured from the capability namespace. Excluded from
    /// collision detection and from entry candidates.
    pub from_capability: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedIdentifiers {
    /// Declaration order, first occurrence wins.
    pub bindings: Vec<TopLevelBinding>,
    /// Extraction could not fully parse the input. Safe-by-omission:
    /// treated as zero identifiers found.
    pub degraded: bool,
}

impl ExtractedIdentifiers {
    /// Collision-relevant names, in declaration order.
    pub fn collidable_names(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| !b.from_capability && !SCENE_CAPABILITIES.contains(b.name.as_str()))
            .map(|b| b.name.as_str())
            .collect()
    }

    pub fn declares(&self, name: &str) -> bool {
        self.bindings.iter().any(|b| b.name == name)
    }

    pub fn entry_candidates(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| b.callable && !b.from_capability)
            .map(|b| b.name.as_str())
            .collect()
    }
}

/// Extract the top-level bindings of `source`. A shallow scan over the
/// program body; nested scopes are never entered.
pub fn extract_identifiers(source: &str) -> ExtractedIdentifiers {
    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_typescript(true)
        .with_jsx(true)
        .with_module(true);

    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked {
        return ExtractedIdentifiers {
            bindings: vec![],
            degraded: true,
        };
    }

    let mut out = ExtractedIdentifiers {
        bindings: vec![],
        // Recovered-but-imperfect parses still produce a partial program;
        // report degradation so callers know the set may be incomplete.
        degraded: !ret.errors.is_empty(),
    };
    let mut seen: HashSet<String> = HashSet::new();

    for stmt in &ret.program.body {
        collect_statement(stmt, &mut out, &mut seen);
    }
    out
}

fn collect_statement(stmt: &Statement, out: &mut ExtractedIdentifiers, seen: &mut HashSet<String>) {
    match stmt {
        Statement::VariableDeclaration(decl) => {
            let kind = match decl.kind {
                VariableDeclarationKind::Const => BindingKind::Const,
                VariableDeclarationKind::Let => BindingKind::Let,
                _ => BindingKind::Var,
            };
            for declarator in &decl.declarations {
                let from_capability = declarator
                    .init
                    .as_ref()
                    .map(is_capability_ref)
                    .unwrap_or(false);
                let callable = declarator
                    .init
                    .as_ref()
                    .map(is_function_valued)
                    .unwrap_or(false);
                let mut names = Vec::new();
                collect_pattern_names(&declarator.id, &mut names);
                for name in names {
                    push_binding(out, seen, name, kind, callable, from_capability);
                }
            }
        }
        Statement::FunctionDeclaration(func) => {
            if let Some(id) = &func.id {
                push_binding(
                    out,
                    seen,
                    id.name.to_string(),
                    BindingKind::Function,
                    true,
                    false,
                );
            }
        }
        Statement::ClassDeclaration(class) => {
            if let Some(id) = &class.id {
                push_binding(
                    out,
                    seen,
                    id.name.to_string(),
                    BindingKind::Class,
                    true,
                    false,
                );
            }
        }
        // TS enums survive type-stripping as runtime objects; interfaces
        // and type aliases do not, so they cannot collide.
        Statement::TSEnumDeclaration(decl) => {
            push_binding(
                out,
                seen,
                decl.id.name.to_string(),
                BindingKind::Enum,
                false,
                false,
            );
        }
        // Exports may still be present pre-normalization; their inner
        // declarations are top-level bindings all the same.
        Statement::ExportNamedDeclaration(export) => {
            if let Some(decl) = &export.declaration {
                collect_declaration(decl, out, seen);
            }
        }
        Statement::ExportDefaultDeclaration(export) => match &export.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    push_binding(
                        out,
                        seen,
                        id.name.to_string(),
                        BindingKind::Function,
                        true,
                        false,
                    );
                }
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    push_binding(
                        out,
                        seen,
                        id.name.to_string(),
                        BindingKind::Class,
                        true,
                        false,
                    );
                }
            }
            _ => {}
        },
        _ => {}
    }
}

fn collect_declaration(
    decl: &Declaration,
    out: &mut ExtractedIdentifiers,
    seen: &mut HashSet<String>,
) {
    match decl {
        Declaration::VariableDeclaration(var_decl) => {
            let kind = match var_decl.kind {
                VariableDeclarationKind::Const => BindingKind::Const,
                VariableDeclarationKind::Let => BindingKind::Let,
                _ => BindingKind::Var,
            };
            for declarator in &var_decl.declarations {
                let callable = declarator
                    .init
                    .as_ref()
                    .map(is_function_valued)
                    .unwrap_or(false);
                let mut names = Vec::new();
                collect_pattern_names(&declarator.id, &mut names);
                for name in names {
                    push_binding(out, seen, name, kind, callable, false);
                }
            }
        }
        Declaration::FunctionDeclaration(func) => {
            if let Some(id) = &func.id {
                push_binding(
                    out,
                    seen,
                    id.name.to_string(),
                    BindingKind::Function,
                    true,
                    false,
                );
            }
        }
        Declaration::ClassDeclaration(class) => {
            if let Some(id) = &class.id {
                push_binding(
                    out,
                    seen,
                    id.name.to_string(),
                    BindingKind::Class,
                    true,
                    false,
                );
            }
        }
        Declaration::TSEnumDeclaration(enum_decl) => {
            push_binding(
                out,
                seen,
                enum_decl.id.name.to_string(),
                BindingKind::Enum,
                false,
                false,
            );
        }
        _ => {}
    }
}

fn push_binding(
    out: &mut ExtractedIdentifiers,
    seen: &mut HashSet<String>,
    name: String,
    kind: BindingKind,
    callable: bool,
    from_capability: bool,
) {
    if seen.insert(name.clone()) {
        out.bindings.push(TopLevelBinding {
            name,
            kind,
            callable,
            from_capability,
        });
    }
}

pub(crate) fn collect_pattern_names(pattern: &BindingPattern, names: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => {
            names.push(id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_pattern_names(&prop.value, names);
            }
            if let Some(rest) = &obj.rest {
                collect_pattern_names(&rest.argument, names);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for elem in arr.elements.iter().flatten() {
                collect_pattern_names(elem, names);
            }
            if let Some(rest) = &arr.rest {
                collect_pattern_names(&rest.argument, names);
            }
        }
        BindingPattern::AssignmentPattern(assign) => {
            collect_pattern_names(&assign.left, names);
        }
    }
}

/// `SceneKit`, `window.SceneKit`, `globalThis.SceneKit`,
/// `window["SceneKit"]`, `globalThis["SceneKit"]`.
fn is_capability_ref(expr: &Expression) -> bool {
    match expr {
        Expression::Identifier(id) => id.name == CAPABILITY_NAMESPACE,
        Expression::StaticMemberExpression(member) => {
            member.property.name == CAPABILITY_NAMESPACE && is_global_object(&member.object)
        }
        Expression::ComputedMemberExpression(member) => {
            if let Expression::StringLiteral(s) = &member.expression {
                s.value == CAPABILITY_NAMESPACE && is_global_object(&member.object)
            } else {
                false
            }
        }
        _ => false,
    }
}

fn is_global_object(expr: &Expression) -> bool {
    matches!(expr, Expression::Identifier(id) if id.name == "window" || id.name == "globalThis")
}

fn is_function_valued(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_)
    )
}
