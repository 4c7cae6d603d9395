//! Deterministic conflict renaming.
//!
//! Each colliding top-level `X` becomes `X_<token>` at its declaration and
//! every reference, including JSX tag positions and computed-property
//! reads. Object-literal keys that merely share the spelling are left
//! alone; shorthand properties are expanded (`{ X }` -> `{ X: X_tok }`) so
//! the key survives the rename. Nested re-declarations of `X` shadow it
//! and are untouched, along with their local uses.
//!
//! Rewriting is span surgery: the visitor collects `(start, end, text)`
//! replacements and they are spliced in one pass. If the splice cannot be
//! performed unambiguously the whole rename aborts and the caller falls
//! back instead of shipping a corrupted rewrite.

use crate::artifact::ConflictRecord;
use crate::error::CompileError;
use crate::extract::collect_pattern_names;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, BindingPattern, CatchClause, ForInStatement, ForOfStatement,
    ForStatement, ForStatementInit, ForStatementLeft, Function, JSXElementName,
    JSXMemberExpressionObject, ObjectPattern, ObjectProperty, PropertyKey, Statement,
};
use oxc_ast_visit::walk_mut::{
    walk_expression, walk_formal_parameters, walk_function_body, walk_object_property,
    walk_statement,
};
use oxc_ast_visit::VisitMut;
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::scope::ScopeFlags;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct RenameOutcome {
    pub source: String,
    pub records: Vec<ConflictRecord>,
}

/// Rename every colliding identifier to `<name>_<token>` throughout the
/// unit source. `collisions` come from the detector; `token` is the unit's
/// stable rename token.
pub fn resolve_conflicts(
    source: &str,
    collisions: &[String],
    token: &str,
    unit_id: &str,
) -> Result<RenameOutcome, CompileError> {
    if collisions.is_empty() {
        return Ok(RenameOutcome {
            source: source.to_string(),
            records: vec![],
        });
    }

    let renames: HashMap<String, String> = collisions
        .iter()
        .map(|name| (name.clone(), format!("{}_{}", name, token)))
        .collect();

    let unresolved = |identifiers: Vec<String>| CompileError::ConflictUnresolved {
        unit_id: unit_id.to_string(),
        identifiers,
    };

    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_typescript(true)
        .with_jsx(true)
        .with_module(true);
    let mut ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked {
        return Err(unresolved(collisions.to_vec()));
    }

    let mut renamer = ConflictRenamer {
        renames: &renames,
        scope_stack: vec![],
        replacements: vec![],
        touched: HashSet::new(),
    };
    renamer.visit_program(&mut ret.program);

    // Every collision must have produced at least one rewrite; a silent
    // miss means the extractor and the resolver disagree about the source.
    let missed: Vec<String> = collisions
        .iter()
        .filter(|name| !renamer.touched.contains(name.as_str()))
        .cloned()
        .collect();
    if !missed.is_empty() {
        return Err(unresolved(missed));
    }

    let renamed = apply_replacements(source, renamer.replacements)
        .ok_or_else(|| unresolved(collisions.to_vec()))?;

    // The rewrite must still parse; a broken splice never leaves here.
    let verify_allocator = Allocator::default();
    let verify = Parser::new(&verify_allocator, &renamed, source_type).parse();
    if verify.panicked || !verify.errors.is_empty() {
        return Err(unresolved(collisions.to_vec()));
    }

    let records = collisions
        .iter()
        .map(|name| ConflictRecord {
            identifier: name.clone(),
            resolved_name: renames[name].clone(),
            source_unit_id: unit_id.to_string(),
        })
        .collect();

    Ok(RenameOutcome {
        source: renamed,
        records,
    })
}

/// Splice replacements into `source`. Identical duplicates collapse (a JSX
/// name can be visited along two paths); overlapping distinct spans are
/// ambiguous and abort the rename.
pub(crate) fn apply_replacements(
    source: &str,
    mut replacements: Vec<(u32, u32, String)>,
) -> Option<String> {
    replacements.sort_by_key(|(start, end, _)| (*start, *end));
    replacements.dedup();

    let mut out = String::with_capacity(source.len() + replacements.len() * 12);
    let mut cursor = 0usize;
    for (start, end, text) in replacements {
        let (start, end) = (start as usize, end as usize);
        if start < cursor || end > source.len() {
            return None;
        }
        out.push_str(&source[cursor..start]);
        out.push_str(&text);
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    Some(out)
}

struct ConflictRenamer<'r> {
    renames: &'r HashMap<String, String>,
    /// Nested scopes only; top-level bindings are the rename targets and
    /// never suppress themselves.
    scope_stack: Vec<HashSet<String>>,
    replacements: Vec<(u32, u32, String)>,
    /// Collision names that produced at least one rewrite. Tracked
    /// exactly at the push site; substring checks on replacement text
    /// would confuse prefix-related names.
    touched: HashSet<String>,
}

impl<'r> ConflictRenamer<'r> {
    fn is_shadowed(&self, name: &str) -> bool {
        self.scope_stack.iter().rev().any(|s| s.contains(name))
    }

    fn rename_for(&self, name: &str) -> Option<&str> {
        if self.is_shadowed(name) {
            return None;
        }
        self.renames.get(name).map(|s| s.as_str())
    }

    fn push_rename(&mut self, start: u32, end: u32, text: String, target: &str) {
        self.touched.insert(target.to_string());
        self.replacements.push((start, end, text));
    }

    fn push_scope(&mut self) {
        self.scope_stack.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        self.scope_stack.pop();
    }

    fn add_local(&mut self, name: String) {
        if let Some(scope) = self.scope_stack.last_mut() {
            scope.insert(name);
        }
    }

    fn add_pattern_locals(&mut self, pattern: &BindingPattern) {
        let mut names = Vec::new();
        collect_pattern_names(pattern, &mut names);
        for name in names {
            self.add_local(name);
        }
    }

    /// Declaration pre-pass so references before a shadowing declaration
    /// in the same scope are suppressed too. Shallow for lexical
    /// declarations; `var` hoists out of nested blocks, so those are
    /// collected recursively.
    fn collect_scope_decls(&mut self, stmts: &[Statement]) {
        let mut names = Vec::new();
        for stmt in stmts {
            match stmt {
                Statement::VariableDeclaration(decl) => {
                    for declarator in &decl.declarations {
                        collect_pattern_names(&declarator.id, &mut names);
                    }
                }
                Statement::FunctionDeclaration(func) => {
                    if let Some(id) = &func.id {
                        names.push(id.name.to_string());
                    }
                }
                Statement::ClassDeclaration(class) => {
                    if let Some(id) = &class.id {
                        names.push(id.name.to_string());
                    }
                }
                other => collect_hoisted_vars(other, &mut names),
            }
        }
        for name in names {
            self.add_local(name);
        }
    }

    fn jsx_member_root_span(
        &self,
        object: &JSXMemberExpressionObject,
    ) -> Option<(u32, u32, String, String)> {
        match object {
            JSXMemberExpressionObject::IdentifierReference(id) => {
                self.rename_for(id.name.as_str()).map(|new| {
                    (
                        id.span.start,
                        id.span.end,
                        new.to_string(),
                        id.name.to_string(),
                    )
                })
            }
            JSXMemberExpressionObject::MemberExpression(inner) => {
                self.jsx_member_root_span(&inner.object)
            }
            _ => None,
        }
    }
}

/// `var` declarators inside nested statements bind at function scope.
fn collect_hoisted_vars(stmt: &Statement, names: &mut Vec<String>) {
    fn var_decl(decl: &oxc_ast::ast::VariableDeclaration, names: &mut Vec<String>) {
        if decl.kind == oxc_ast::ast::VariableDeclarationKind::Var {
            for declarator in &decl.declarations {
                collect_pattern_names(&declarator.id, names);
            }
        }
    }
    match stmt {
        Statement::BlockStatement(block) => {
            for s in &block.body {
                collect_hoisted_vars(s, names);
            }
        }
        Statement::VariableDeclaration(decl) => var_decl(decl, names),
        Statement::IfStatement(stmt) => {
            collect_hoisted_vars(&stmt.consequent, names);
            if let Some(alternate) = &stmt.alternate {
                collect_hoisted_vars(alternate, names);
            }
        }
        Statement::ForStatement(stmt) => {
            if let Some(ForStatementInit::VariableDeclaration(decl)) = &stmt.init {
                var_decl(decl, names);
            }
            collect_hoisted_vars(&stmt.body, names);
        }
        Statement::ForInStatement(stmt) => {
            if let ForStatementLeft::VariableDeclaration(decl) = &stmt.left {
                var_decl(decl, names);
            }
            collect_hoisted_vars(&stmt.body, names);
        }
        Statement::ForOfStatement(stmt) => {
            if let ForStatementLeft::VariableDeclaration(decl) = &stmt.left {
                var_decl(decl, names);
            }
            collect_hoisted_vars(&stmt.body, names);
        }
        Statement::WhileStatement(stmt) => collect_hoisted_vars(&stmt.body, names),
        Statement::DoWhileStatement(stmt) => collect_hoisted_vars(&stmt.body, names),
        Statement::LabeledStatement(stmt) => collect_hoisted_vars(&stmt.body, names),
        Statement::TryStatement(stmt) => {
            for s in &stmt.block.body {
                collect_hoisted_vars(s, names);
            }
            if let Some(handler) = &stmt.handler {
                for s in &handler.body.body {
                    collect_hoisted_vars(s, names);
                }
            }
            if let Some(finalizer) = &stmt.finalizer {
                for s in &finalizer.body {
                    collect_hoisted_vars(s, names);
                }
            }
        }
        Statement::SwitchStatement(stmt) => {
            for case in &stmt.cases {
                for s in &case.consequent {
                    collect_hoisted_vars(s, names);
                }
            }
        }
        _ => {}
    }
}

impl<'a, 'r> VisitMut<'a> for ConflictRenamer<'r> {
    fn visit_identifier_reference(&mut self, ident: &mut oxc_ast::ast::IdentifierReference<'a>) {
        if let Some(new_name) = self.rename_for(ident.name.as_str()).map(str::to_string) {
            let name = ident.name.to_string();
            self.push_rename(ident.span.start, ident.span.end, new_name, &name);
        }
    }

    fn visit_binding_identifier(&mut self, ident: &mut oxc_ast::ast::BindingIdentifier<'a>) {
        if let Some(new_name) = self.rename_for(ident.name.as_str()).map(str::to_string) {
            let name = ident.name.to_string();
            self.push_rename(ident.span.start, ident.span.end, new_name, &name);
        }
    }

    fn visit_statement(&mut self, stmt: &mut Statement<'a>) {
        if let Statement::BlockStatement(block) = stmt {
            self.push_scope();
            self.collect_scope_decls(&block.body);
            for s in &mut block.body {
                self.visit_statement(s);
            }
            self.pop_scope();
            return;
        }
        walk_statement(self, stmt);
    }

    fn visit_function(&mut self, func: &mut Function<'a>, _flags: ScopeFlags) {
        // The function's own name binds in the enclosing scope.
        if let Some(id) = &mut func.id {
            self.visit_binding_identifier(id);
        }
        self.push_scope();
        for param in &func.params.items {
            self.add_pattern_locals(&param.pattern);
        }
        if let Some(rest) = &func.params.rest {
            self.add_pattern_locals(&rest.rest.argument);
        }
        if let Some(body) = &func.body {
            self.collect_scope_decls(&body.statements);
        }
        walk_formal_parameters(self, &mut func.params);
        if let Some(body) = &mut func.body {
            walk_function_body(self, body);
        }
        self.pop_scope();
    }

    fn visit_arrow_function_expression(&mut self, func: &mut ArrowFunctionExpression<'a>) {
        self.push_scope();
        for param in &func.params.items {
            self.add_pattern_locals(&param.pattern);
        }
        if let Some(rest) = &func.params.rest {
            self.add_pattern_locals(&rest.rest.argument);
        }
        self.collect_scope_decls(&func.body.statements);
        walk_formal_parameters(self, &mut func.params);
        walk_function_body(self, &mut func.body);
        self.pop_scope();
    }

    fn visit_for_statement(&mut self, stmt: &mut ForStatement<'a>) {
        self.push_scope();
        if let Some(ForStatementInit::VariableDeclaration(decl)) = &stmt.init {
            for declarator in &decl.declarations {
                self.add_pattern_locals(&declarator.id);
            }
        }
        if let Some(init) = &mut stmt.init {
            if let ForStatementInit::VariableDeclaration(decl) = init {
                for declarator in &mut decl.declarations {
                    if let Some(expr) = &mut declarator.init {
                        self.visit_expression(expr);
                    }
                }
            }
        }
        if let Some(test) = &mut stmt.test {
            self.visit_expression(test);
        }
        if let Some(update) = &mut stmt.update {
            self.visit_expression(update);
        }
        self.visit_statement(&mut stmt.body);
        self.pop_scope();
    }

    fn visit_for_of_statement(&mut self, stmt: &mut ForOfStatement<'a>) {
        self.push_scope();
        if let ForStatementLeft::VariableDeclaration(decl) = &stmt.left {
            for declarator in &decl.declarations {
                self.add_pattern_locals(&declarator.id);
            }
        }
        self.visit_expression(&mut stmt.right);
        self.visit_statement(&mut stmt.body);
        self.pop_scope();
    }

    fn visit_for_in_statement(&mut self, stmt: &mut ForInStatement<'a>) {
        self.push_scope();
        if let ForStatementLeft::VariableDeclaration(decl) = &stmt.left {
            for declarator in &decl.declarations {
                self.add_pattern_locals(&declarator.id);
            }
        }
        self.visit_expression(&mut stmt.right);
        self.visit_statement(&mut stmt.body);
        self.pop_scope();
    }

    fn visit_catch_clause(&mut self, clause: &mut CatchClause<'a>) {
        self.push_scope();
        if let Some(param) = &clause.param {
            self.add_pattern_locals(&param.pattern);
        }
        self.collect_scope_decls(&clause.body.body);
        for stmt in &mut clause.body.body {
            self.visit_statement(stmt);
        }
        self.pop_scope();
    }

    fn visit_jsx_element_name(&mut self, name: &mut JSXElementName<'a>) {
        match name {
            JSXElementName::IdentifierReference(id) => {
                if let Some(new_name) = self.rename_for(id.name.as_str()).map(str::to_string) {
                    let old = id.name.to_string();
                    self.push_rename(id.span.start, id.span.end, new_name, &old);
                }
            }
            JSXElementName::MemberExpression(member) => {
                if let Some((start, end, new_name, old)) = self.jsx_member_root_span(&member.object)
                {
                    self.push_rename(start, end, new_name, &old);
                }
            }
            _ => {}
        }
    }

    fn visit_object_property(&mut self, prop: &mut ObjectProperty<'a>) {
        // `{ X }` must become `{ X: X_tok }`: the key spelling is the
        // unit's own API, only the value reference is renamed.
        if prop.shorthand {
            if let oxc_ast::ast::Expression::Identifier(id) = &prop.value {
                if let Some(new_name) = self.rename_for(id.name.as_str()).map(str::to_string) {
                    let old = id.name.to_string();
                    self.push_rename(
                        id.span.start,
                        id.span.end,
                        format!("{}: {}", old, new_name),
                        &old,
                    );
                    return;
                }
            }
            walk_object_property(self, prop);
            return;
        }
        // Non-shorthand: the key is never an identifier reference, walking
        // only touches the value side.
        if let PropertyKey::StaticIdentifier(_) = &prop.key {
            self.visit_expression(&mut prop.value);
            return;
        }
        walk_object_property(self, prop);
    }

    fn visit_object_pattern(&mut self, pattern: &mut ObjectPattern<'a>) {
        for prop in &mut pattern.properties {
            let shorthand_target = if prop.shorthand {
                match &prop.value {
                    BindingPattern::BindingIdentifier(id) => Some((id.span, id.name.to_string())),
                    BindingPattern::AssignmentPattern(assign) => match &assign.left {
                        BindingPattern::BindingIdentifier(id) => {
                            Some((id.span, id.name.to_string()))
                        }
                        _ => None,
                    },
                    _ => None,
                }
            } else {
                None
            };

            match shorthand_target {
                Some((span, name)) if self.rename_for(&name).is_some() => {
                    let new_name = self.rename_for(&name).unwrap().to_string();
                    self.push_rename(
                        span.start,
                        span.end,
                        format!("{}: {}", name, new_name),
                        &name,
                    );
                    // Default values may still reference renamed names.
                    if let BindingPattern::AssignmentPattern(assign) = &mut prop.value {
                        self.visit_expression(&mut assign.right);
                    }
                }
                _ => {
                    self.visit_binding_pattern(&mut prop.value);
                }
            }
        }
        if let Some(rest) = &mut pattern.rest {
            self.visit_binding_pattern(&mut rest.argument);
        }
    }

    fn visit_expression(&mut self, expr: &mut oxc_ast::ast::Expression<'a>) {
        walk_expression(self, expr);
    }
}
