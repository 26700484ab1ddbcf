//! Reference resolution for one source file.
//!
//! `FileIndex` maps every top-level binding (declarations and import
//! bindings) to the ordered set of its textual occurrences, declaration site
//! included. The query is scope-aware, not a textual grep: a reference is
//! only attributed to a top-level symbol when no enclosing scope rebinds the
//! same name. Shadow sets follow the language's scoping rules: `let`/`const`/
//! `class` bindings shadow their enclosing block, loop and catch bindings
//! shadow their statement, and `var` declarations hoist to the enclosing
//! function. An occurrence the index cannot attribute is left unrenamed
//! rather than renamed wrongly.

use oxc_ast::ast::{
    ArrowFunctionExpression, BindingPattern, BindingProperty, BlockStatement, CatchClause,
    Declaration, ForInStatement, ForOfStatement, ForStatement, ForStatementInit,
    ForStatementLeft, FormalParameters, Function, IdentifierReference, ObjectProperty, Program,
    Statement, SwitchStatement, TSModuleDeclarationName, VariableDeclaration,
    VariableDeclarationKind,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::Span;
use oxc_syntax::scope::ScopeFlags;
use std::collections::{HashMap, HashSet};

/// One occurrence of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub span: Span,
    /// Occurrence is a shorthand property (`{ foo }` or `const { foo } = x`).
    /// Renaming must expand it to `key: newName` to keep the key stable.
    pub shorthand: bool,
}

#[derive(Debug, Default)]
pub struct SymbolRefs {
    decl_spans: Vec<Span>,
    references: Vec<Reference>,
}

#[derive(Debug, Default)]
pub struct FileIndex {
    symbols: HashMap<String, SymbolRefs>,
    /// Every identifier that appears in the file, for reserved-prefix checks.
    identifiers: HashSet<String>,
}

impl FileIndex {
    pub fn build(program: &Program) -> FileIndex {
        let mut targets: HashMap<String, SymbolRefs> = HashMap::new();
        for (name, span) in top_level_bindings(program) {
            targets.entry(name).or_default().decl_spans.push(span);
        }

        let mut collector = ReferenceCollector {
            symbols: targets,
            identifiers: HashSet::new(),
            shadow_stack: Vec::new(),
        };
        collector.visit_program(program);

        let mut index = FileIndex {
            symbols: collector.symbols,
            identifiers: collector.identifiers,
        };
        for refs in index.symbols.values_mut() {
            refs.references.sort_by_key(|r| r.span.start);
            refs.references.dedup();
        }
        index
    }

    /// All occurrences of the symbol declared at `position`. Empty when the
    /// position does not fall on a renameable declaration name; the caller
    /// treats that as a no-op, not an error.
    pub fn find_references(&self, position: u32) -> &[Reference] {
        for refs in self.symbols.values() {
            if refs
                .decl_spans
                .iter()
                .any(|s| s.start <= position && position < s.end)
            {
                return &refs.references;
            }
        }
        &[]
    }

    pub fn identifiers(&self) -> &HashSet<String> {
        &self.identifiers
    }
}

/// Names bound at the top level of the file, with their identifier spans:
/// declarations plus import bindings.
fn top_level_bindings(program: &Program) -> Vec<(String, Span)> {
    let mut out = top_level_declarations(program);

    for stmt in &program.body {
        if let Statement::ImportDeclaration(import) = stmt {
            if let Some(specifiers) = &import.specifiers {
                for specifier in specifiers {
                    use oxc_ast::ast::ImportDeclarationSpecifier::*;
                    let local = match specifier {
                        ImportSpecifier(s) => &s.local,
                        ImportDefaultSpecifier(s) => &s.local,
                        ImportNamespaceSpecifier(s) => &s.local,
                    };
                    out.push((local.name.to_string(), local.span));
                }
            }
        }
    }

    out
}

/// Top-level declared names (functions, classes, enums, namespaces, variable
/// declarators), export-marked or not. Import bindings are not included.
pub fn top_level_declarations(program: &Program) -> Vec<(String, Span)> {
    let mut out = Vec::new();

    for stmt in &program.body {
        match stmt {
            Statement::ExportNamedDeclaration(export) => {
                if let Some(decl) = &export.declaration {
                    collect_declaration_bindings(decl, &mut out);
                }
            }
            Statement::FunctionDeclaration(f) => {
                if let Some(id) = &f.id {
                    out.push((id.name.to_string(), id.span));
                }
            }
            Statement::ClassDeclaration(c) => {
                if let Some(id) = &c.id {
                    out.push((id.name.to_string(), id.span));
                }
            }
            Statement::TSEnumDeclaration(e) => {
                out.push((e.id.name.to_string(), e.id.span));
            }
            Statement::TSModuleDeclaration(m) => {
                if let TSModuleDeclarationName::Identifier(id) = &m.id {
                    out.push((id.name.to_string(), id.span));
                }
            }
            Statement::VariableDeclaration(v) => {
                for declarator in &v.declarations {
                    if let BindingPattern::BindingIdentifier(id) = &declarator.id {
                        out.push((id.name.to_string(), id.span));
                    }
                }
            }
            _ => {}
        }
    }

    out
}

fn collect_declaration_bindings(decl: &Declaration, out: &mut Vec<(String, Span)>) {
    match decl {
        Declaration::FunctionDeclaration(f) => {
            if let Some(id) = &f.id {
                out.push((id.name.to_string(), id.span));
            }
        }
        Declaration::ClassDeclaration(c) => {
            if let Some(id) = &c.id {
                out.push((id.name.to_string(), id.span));
            }
        }
        Declaration::TSEnumDeclaration(e) => {
            out.push((e.id.name.to_string(), e.id.span));
        }
        Declaration::TSModuleDeclaration(m) => {
            if let TSModuleDeclarationName::Identifier(id) = &m.id {
                out.push((id.name.to_string(), id.span));
            }
        }
        Declaration::VariableDeclaration(v) => {
            for declarator in &v.declarations {
                if let BindingPattern::BindingIdentifier(id) = &declarator.id {
                    out.push((id.name.to_string(), id.span));
                }
            }
        }
        _ => {}
    }
}

/// Every name a binding pattern introduces, destructuring included.
fn pattern_names(pattern: &BindingPattern, out: &mut HashSet<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => {
            out.insert(id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                pattern_names(&prop.value, out);
            }
            if let Some(rest) = &obj.rest {
                pattern_names(&rest.argument, out);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for element in arr.elements.iter().flatten() {
                pattern_names(element, out);
            }
        }
        BindingPattern::AssignmentPattern(assign) => pattern_names(&assign.left, out),
    }
}

fn param_names(params: &FormalParameters, out: &mut HashSet<String>) {
    for param in &params.items {
        pattern_names(&param.pattern, out);
    }
    if let Some(rest) = &params.rest {
        pattern_names(&rest.rest.argument, out);
    }
}

fn declarator_names(decl: &VariableDeclaration, out: &mut HashSet<String>) {
    for declarator in &decl.declarations {
        pattern_names(&declarator.id, out);
    }
}

/// Names the statements bind directly in their own block scope: `let`,
/// `const`, classes, enums, and (strict-mode) function declarations. `var`
/// is excluded here; it hoists to the enclosing function instead.
fn lexical_bindings(stmts: &[Statement]) -> HashSet<String> {
    let mut out = HashSet::new();
    for stmt in stmts {
        match stmt {
            Statement::VariableDeclaration(v)
                if !matches!(v.kind, VariableDeclarationKind::Var) =>
            {
                declarator_names(v, &mut out);
            }
            Statement::FunctionDeclaration(f) => {
                if let Some(id) = &f.id {
                    out.insert(id.name.to_string());
                }
            }
            Statement::ClassDeclaration(c) => {
                if let Some(id) = &c.id {
                    out.insert(id.name.to_string());
                }
            }
            Statement::TSEnumDeclaration(e) => {
                out.insert(e.id.name.to_string());
            }
            _ => {}
        }
    }
    out
}

struct ReferenceCollector {
    symbols: HashMap<String, SymbolRefs>,
    identifiers: HashSet<String>,
    shadow_stack: Vec<HashSet<String>>,
}

impl ReferenceCollector {
    fn shadowed(&self, name: &str) -> bool {
        self.shadow_stack.iter().any(|scope| scope.contains(name))
    }

    fn record(&mut self, name: &str, span: Span, shorthand: bool) {
        self.identifiers.insert(name.to_string());
        if self.shadowed(name) {
            return;
        }
        if let Some(refs) = self.symbols.get_mut(name) {
            refs.references.push(Reference { span, shorthand });
        }
    }

    fn with_scope<F: FnOnce(&mut Self)>(&mut self, bindings: HashSet<String>, walk: F) {
        self.shadow_stack.push(bindings);
        walk(self);
        self.shadow_stack.pop();
    }
}

impl<'a> Visit<'a> for ReferenceCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.record(&ident.name, ident.span, false);
    }

    fn visit_binding_identifier(&mut self, ident: &oxc_ast::ast::BindingIdentifier<'a>) {
        self.record(&ident.name, ident.span, false);
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        // Function scope: params, hoisted `var`s from anywhere in the body,
        // and the body's own direct lexical bindings. The function's own name
        // is left out so recursive references still resolve to the top-level
        // symbol.
        let mut bindings = HashSet::new();
        param_names(&func.params, &mut bindings);
        if let Some(body) = &func.body {
            let mut hoist = VarHoistCollector {
                names: &mut bindings,
            };
            hoist.visit_function_body(body);
            bindings.extend(lexical_bindings(&body.statements));
        }
        self.with_scope(bindings, |v| walk::walk_function(v, func, flags));
    }

    fn visit_arrow_function_expression(&mut self, func: &ArrowFunctionExpression<'a>) {
        let mut bindings = HashSet::new();
        param_names(&func.params, &mut bindings);
        {
            let mut hoist = VarHoistCollector {
                names: &mut bindings,
            };
            hoist.visit_function_body(&func.body);
        }
        bindings.extend(lexical_bindings(&func.body.statements));
        self.with_scope(bindings, |v| walk::walk_arrow_function_expression(v, func));
    }

    fn visit_block_statement(&mut self, block: &BlockStatement<'a>) {
        let bindings = lexical_bindings(&block.body);
        self.with_scope(bindings, |v| walk::walk_block_statement(v, block));
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement<'a>) {
        let mut bindings = HashSet::new();
        if let Some(ForStatementInit::VariableDeclaration(v)) = &stmt.init {
            if !matches!(v.kind, VariableDeclarationKind::Var) {
                declarator_names(v, &mut bindings);
            }
        }
        self.with_scope(bindings, |v| walk::walk_for_statement(v, stmt));
    }

    fn visit_for_in_statement(&mut self, stmt: &ForInStatement<'a>) {
        let mut bindings = HashSet::new();
        if let ForStatementLeft::VariableDeclaration(v) = &stmt.left {
            if !matches!(v.kind, VariableDeclarationKind::Var) {
                declarator_names(v, &mut bindings);
            }
        }
        self.with_scope(bindings, |v| walk::walk_for_in_statement(v, stmt));
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        let mut bindings = HashSet::new();
        if let ForStatementLeft::VariableDeclaration(v) = &stmt.left {
            if !matches!(v.kind, VariableDeclarationKind::Var) {
                declarator_names(v, &mut bindings);
            }
        }
        self.with_scope(bindings, |v| walk::walk_for_of_statement(v, stmt));
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        let mut bindings = HashSet::new();
        if let Some(param) = &clause.param {
            pattern_names(&param.pattern, &mut bindings);
        }
        self.with_scope(bindings, |v| walk::walk_catch_clause(v, clause));
    }

    fn visit_switch_statement(&mut self, stmt: &SwitchStatement<'a>) {
        // All cases of a switch share one block scope.
        let mut bindings = HashSet::new();
        for case in &stmt.cases {
            bindings.extend(lexical_bindings(&case.consequent));
        }
        self.with_scope(bindings, |v| walk::walk_switch_statement(v, stmt));
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand {
            if let oxc_ast::ast::Expression::Identifier(ident) = &prop.value {
                self.record(&ident.name, ident.span, true);
                return;
            }
        }
        walk::walk_object_property(self, prop);
    }

    fn visit_binding_property(&mut self, prop: &BindingProperty<'a>) {
        if prop.shorthand {
            if let BindingPattern::BindingIdentifier(ident) = &prop.value {
                self.record(&ident.name, ident.span, true);
                return;
            }
        }
        walk::walk_binding_property(self, prop);
    }
}

/// Collects `var`-declared names within one function body without descending
/// into nested functions, mirroring declaration hoisting.
struct VarHoistCollector<'s> {
    names: &'s mut HashSet<String>,
}

impl<'s, 'a> Visit<'a> for VarHoistCollector<'s> {
    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        if matches!(decl.kind, VariableDeclarationKind::Var) {
            declarator_names(decl, self.names);
        }
    }

    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _func: &ArrowFunctionExpression<'a>) {}
}
