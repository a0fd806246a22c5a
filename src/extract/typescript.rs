//! TypeScript extractor.
//!
//! Works in two passes over the parsed program. Pass 1 enumerates every
//! function-like declaration (functions, class methods and accessors,
//! constructors, arrow/function-expression bindings, class property
//! initializers) and builds the program-wide symbol table: local
//! declarations, import aliases, and re-export chains. Pass 2 walks bodies
//! and resolves calls through the table, following alias chains to the
//! original declaration so re-exported bindings never become nodes of
//! their own.
//!
//! Without a type checker, property calls resolve by receiver where it is
//! locally inferable (`this`, `new T()` bindings, static calls, namespace
//! imports) and fall back to unique-method-name lookup in id order.
//! Computed-member calls (`obj[key]()`) emit unresolved `[dynamic:*]`
//! edges.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tree_sitter::{Node as TsNode, Parser};

use crate::config::ResolvedConfig;
use crate::diagnostics::DiagnosticCode;
use crate::error::AnalysisError;
use crate::model::{
    CallSite, Edge, EdgeKind, FunctionKind, Language, Node, NodeColor, NodeStatus, Visibility,
};

use super::params::{analyze_parameters, BindingPattern, ParamLang, ParamSpec};
use super::symbols::SymbolTable;
use super::{ExtractContext, Extraction, LanguageExtractor};

/// Globals that never resolve to project functions.
const TS_INTRINSICS: &[&str] = &[
    "require",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "encodeURIComponent",
    "decodeURIComponent",
    "setTimeout",
    "setInterval",
    "clearTimeout",
    "clearInterval",
    "structuredClone",
    "fetch",
    "eval",
    "String",
    "Number",
    "Boolean",
    "Array",
    "Object",
    "Symbol",
    "Promise",
    "Error",
];

fn is_intrinsic(name: &str) -> bool {
    TS_INTRINSICS.contains(&name)
}

pub struct TypescriptExtractor {
    language: tree_sitter::Language,
}

impl TypescriptExtractor {
    pub fn new() -> Self {
        Self { language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into() }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }
}

impl Default for TypescriptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct TsFile {
    rel_path: String,
    source: Vec<u8>,
    tree: tree_sitter::Tree,
}

/// A function-like declaration found during the file walk.
struct TsDecl<'t> {
    name: String,
    qualified: String,
    kind: FunctionKind,
    class_name: Option<String>,
    visibility: Visibility,
    decorators: Vec<String>,
    decl: TsNode<'t>,
    body: Option<TsNode<'t>>,
    params: Option<TsNode<'t>>,
}

/// Per-class method/constructor table for receiver-based resolution.
#[derive(Debug, Default, Clone)]
struct ClassInfo {
    constructor: Option<String>,
    methods: HashMap<String, String>,
}

/// Program-wide tables built in pass 1.
#[derive(Default)]
struct TsProgram {
    symbols: SymbolTable,
    /// (file, class name) -> method table.
    classes: HashMap<(String, String), ClassInfo>,
    /// (file, namespace alias) -> target file for `import * as ns`.
    namespaces: HashMap<(String, String), String>,
    /// All project files, for module specifier resolution.
    files: HashSet<String>,
}

impl LanguageExtractor for TypescriptExtractor {
    fn language(&self) -> Language {
        Language::Typescript
    }

    fn extract(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        ctx: &ExtractContext,
    ) -> anyhow::Result<Extraction> {
        // Declaration files carry no bodies.
        let files: Vec<String> = files
            .iter()
            .filter(|f| !f.ends_with(".d.ts"))
            .cloned()
            .collect();

        let parsed: Vec<TsFile> = files
            .par_iter()
            .filter_map(|rel| {
                if ctx.cancel.is_cancelled() {
                    return None;
                }
                let abs = config.project_root.join(rel);
                let source = match std::fs::read(&abs) {
                    Ok(s) => s,
                    Err(e) => {
                        ctx.sink.warn_file(DiagnosticCode::ExtractorParseError, rel.clone(), e.to_string());
                        return None;
                    }
                };
                let mut parser = self.create_parser().ok()?;
                let tree = match parser.parse(&source, None) {
                    Some(t) => t,
                    None => {
                        ctx.sink.warn_file(
                            DiagnosticCode::ExtractorParseError,
                            rel.clone(),
                            "failed to parse TypeScript source",
                        );
                        return None;
                    }
                };
                if tree.root_node().has_error() {
                    ctx.sink.warn_file(
                        DiagnosticCode::ExtractorParseError,
                        rel.clone(),
                        "source contains syntax errors",
                    );
                }
                Some(TsFile { rel_path: rel.clone(), source, tree })
            })
            .collect();

        if ctx.cancel.is_cancelled() {
            ctx.sink.warn(DiagnosticCode::Cancelled, "extraction cancelled");
            return Err(AnalysisError::Cancelled.into());
        }

        // Pass 1: declarations and the symbol/alias table.
        let mut program = TsProgram::default();
        for file in &parsed {
            program.files.insert(file.rel_path.clone());
        }
        let mut nodes = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        for file in &parsed {
            let decls = collect_declarations(file);
            for decl in &decls {
                let node = build_node(file, decl);
                // Exactly one node per declaration; duplicates fold onto
                // the first occurrence.
                if !seen_ids.insert(node.id.clone()) {
                    continue;
                }
                match decl.kind {
                    FunctionKind::Method | FunctionKind::Constructor => {
                        let class = decl.class_name.clone().unwrap_or_default();
                        let info = program
                            .classes
                            .entry((file.rel_path.clone(), class))
                            .or_default();
                        if decl.kind == FunctionKind::Constructor {
                            info.constructor = Some(node.id.clone());
                        } else {
                            info.methods.insert(decl.name.clone(), node.id.clone());
                            program.symbols.declare_method(&decl.name, &node.id);
                        }
                    }
                    FunctionKind::Arrow | FunctionKind::Closure if decl.class_name.is_some() => {
                        // Class property initializer: callable as a method.
                        let class = decl.class_name.clone().unwrap_or_default();
                        let info = program
                            .classes
                            .entry((file.rel_path.clone(), class))
                            .or_default();
                        info.methods.insert(decl.name.clone(), node.id.clone());
                        program.symbols.declare_method(&decl.name, &node.id);
                    }
                    _ => {
                        program.symbols.declare(&file.rel_path, &decl.name, &node.id);
                    }
                }
                nodes.push(node);
            }
            collect_imports_and_exports(file, &mut program);
        }

        // Pass 2: body resolution.
        let mut edges = Vec::new();
        for file in &parsed {
            let module_vars = module_variable_classes(file, &program);
            let decls = collect_declarations(file);
            for decl in &decls {
                if let Some(body) = decl.body {
                    resolve_body(file, decl, body, &program, &module_vars, &mut edges);
                }
            }
        }

        Ok(Extraction { nodes, edges, files_analyzed: parsed.len() })
    }
}

fn node_text<'a>(node: TsNode, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn site(rel_path: &str, node: TsNode) -> CallSite {
    let pos = node.start_position();
    CallSite {
        file_path: rel_path.to_string(),
        line: pos.row as u32 + 1,
        column: pos.column as u32 + 1,
    }
}

fn visit<'a, F: FnMut(TsNode<'a>)>(root: TsNode<'a>, f: &mut F) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        f(node);
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
}

// ---------------------------------------------------------------------------
// Pass 1: declarations
// ---------------------------------------------------------------------------

/// Enumerate every function-like declaration in a file.
fn collect_declarations(file: &TsFile) -> Vec<TsDecl<'_>> {
    let mut decls = Vec::new();
    let root = file.tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        collect_statement(file, child, false, &mut decls);
    }
    decls
}

fn collect_statement<'t>(
    file: &'t TsFile,
    stmt: TsNode<'t>,
    exported: bool,
    decls: &mut Vec<TsDecl<'t>>,
) {
    let source = &file.source;
    match stmt.kind() {
        "export_statement" => {
            if let Some(declaration) = stmt.child_by_field_name("declaration") {
                collect_statement(file, declaration, true, decls);
            } else if let Some(value) = stmt.child_by_field_name("value") {
                // export default () => {} / export default function() {}
                if matches!(value.kind(), "arrow_function" | "function_expression") {
                    decls.push(function_value_decl(
                        "default".to_string(),
                        value,
                        stmt,
                        true,
                        decorators_of(stmt, source),
                    ));
                }
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            let name = stmt
                .child_by_field_name("name")
                .map(|n| node_text(n, source).to_string())
                .unwrap_or_else(|| "default".to_string());
            decls.push(TsDecl {
                qualified: name.clone(),
                name,
                kind: FunctionKind::Function,
                class_name: None,
                visibility: if exported { Visibility::Exported } else { Visibility::Module },
                decorators: decorators_of(stmt, source),
                decl: stmt,
                body: stmt.child_by_field_name("body"),
                params: stmt.child_by_field_name("parameters"),
            });
        }
        "lexical_declaration" | "variable_declaration" => {
            let statement_decorators = decorators_of(stmt, source);
            let mut cursor = stmt.walk();
            for declarator in stmt.children(&mut cursor).filter(|n| n.kind() == "variable_declarator") {
                let name_node = match declarator.child_by_field_name("name") {
                    Some(n) if n.kind() == "identifier" => n,
                    _ => continue,
                };
                let value = match declarator.child_by_field_name("value") {
                    Some(v) if matches!(v.kind(), "arrow_function" | "function_expression") => v,
                    _ => continue,
                };
                decls.push(function_value_decl(
                    node_text(name_node, source).to_string(),
                    value,
                    declarator,
                    exported,
                    statement_decorators.clone(),
                ));
            }
        }
        "class_declaration" | "abstract_class_declaration" => {
            collect_class(file, stmt, decls);
        }
        _ => {}
    }
}

/// Build a declaration entry for an arrow/function-expression binding.
fn function_value_decl<'t>(
    name: String,
    value: TsNode<'t>,
    span_node: TsNode<'t>,
    exported: bool,
    decorators: Vec<String>,
) -> TsDecl<'t> {
    let kind = if value.kind() == "arrow_function" {
        FunctionKind::Arrow
    } else {
        FunctionKind::Closure
    };
    TsDecl {
        qualified: name.clone(),
        name,
        kind,
        class_name: None,
        visibility: if exported { Visibility::Exported } else { Visibility::Module },
        decorators,
        decl: span_node,
        body: value.child_by_field_name("body"),
        params: value.child_by_field_name("parameters"),
    }
}

fn collect_class<'t>(file: &'t TsFile, class: TsNode<'t>, decls: &mut Vec<TsDecl<'t>>) {
    let source = &file.source;
    let class_name = match class.child_by_field_name("name") {
        Some(n) => node_text(n, source).to_string(),
        None => return,
    };
    let body = match class.child_by_field_name("body") {
        Some(b) => b,
        None => return,
    };

    let mut cursor = body.walk();
    let mut pending_decorators: Vec<String> = Vec::new();
    for member in body.children(&mut cursor) {
        match member.kind() {
            "decorator" => {
                if let Some(name) = decorator_name(member, source) {
                    pending_decorators.push(name);
                }
                continue;
            }
            "method_definition" => {
                let mut decorators = std::mem::take(&mut pending_decorators);
                decorators.extend(decorators_of(member, source));
                let raw_name = member
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                if raw_name.is_empty() {
                    continue;
                }
                let accessor = member
                    .children(&mut member.walk())
                    .find(|c| matches!(c.kind(), "get" | "set"))
                    .map(|c| c.kind().to_string());
                let (name, kind) = if raw_name == "constructor" {
                    (raw_name, FunctionKind::Constructor)
                } else if let Some(prefix) = accessor {
                    (format!("{} {}", prefix, raw_name), FunctionKind::Method)
                } else {
                    (raw_name, FunctionKind::Method)
                };
                decls.push(TsDecl {
                    qualified: format!("{}.{}", class_name, name),
                    name,
                    kind,
                    class_name: Some(class_name.clone()),
                    visibility: member_visibility(member, source),
                    decorators,
                    decl: member,
                    body: member.child_by_field_name("body"),
                    params: member.child_by_field_name("parameters"),
                });
            }
            "public_field_definition" => {
                let mut decorators = std::mem::take(&mut pending_decorators);
                decorators.extend(decorators_of(member, source));
                let value = match member.child_by_field_name("value") {
                    Some(v) if matches!(v.kind(), "arrow_function" | "function_expression") => v,
                    _ => continue,
                };
                let name = member
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                if name.is_empty() {
                    continue;
                }
                let kind = if value.kind() == "arrow_function" {
                    FunctionKind::Arrow
                } else {
                    FunctionKind::Closure
                };
                decls.push(TsDecl {
                    qualified: format!("{}.{}", class_name, name),
                    name,
                    kind,
                    class_name: Some(class_name.clone()),
                    visibility: member_visibility(member, source),
                    decorators,
                    decl: member,
                    body: value.child_by_field_name("body"),
                    params: value.child_by_field_name("parameters"),
                });
            }
            _ => {
                pending_decorators.clear();
            }
        }
    }
}

fn member_visibility(member: TsNode, source: &[u8]) -> Visibility {
    let mut cursor = member.walk();
    for child in member.children(&mut cursor) {
        if child.kind() == "accessibility_modifier" {
            return match node_text(child, source) {
                "private" => Visibility::Private,
                "protected" => Visibility::Internal,
                _ => Visibility::Public,
            };
        }
    }
    Visibility::Public
}

/// Decorators attached directly to a node (children of kind `decorator`).
fn decorators_of(node: TsNode, source: &[u8]) -> Vec<String> {
    let mut found = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Some(name) = decorator_name(child, source) {
                found.push(name);
            }
        }
    }
    found
}

/// Textual name of a decorator: `@Name`, `@Name(...)`, `@obj.path(...)`,
/// `@obj.path` all yield the dotted path without arguments.
fn decorator_name(decorator: TsNode, source: &[u8]) -> Option<String> {
    let text = node_text(decorator, source).trim_start_matches('@');
    let name = match text.find('(') {
        Some(idx) => &text[..idx],
        None => text,
    };
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn build_node(file: &TsFile, decl: &TsDecl<'_>) -> Node {
    let source = &file.source;
    let id = Node::make_id(&file.rel_path, &decl.qualified);
    let specs = decl.params.map(|p| parameter_specs(p, source)).unwrap_or_default();
    let (parameters, unused_parameters) =
        analyze_parameters(&specs, decl.body, source, ParamLang::Typescript);

    let start_line = decl.decl.start_position().row as u32 + 1;
    let end_line = decl.decl.end_position().row as u32 + 1;

    Node {
        id: id.clone(),
        name: decl.name.clone(),
        qualified_name: id,
        file_path: file.rel_path.clone(),
        start_line,
        end_line,
        language: Language::Typescript,
        kind: decl.kind,
        visibility: decl.visibility,
        is_entry_point: false,
        parameters,
        unused_parameters,
        package_or_module: Node::package_for(&file.rel_path, "."),
        lines_of_code: end_line - start_line + 1,
        status: NodeStatus::Dead,
        color: NodeColor::Red,
        decorators: decl.decorators.clone(),
    }
}

/// Parameter specs from a `formal_parameters` list.
fn parameter_specs(params: TsNode, source: &[u8]) -> Vec<ParamSpec> {
    let mut specs = Vec::new();
    let mut cursor = params.walk();
    for param in params.children(&mut cursor) {
        if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
            continue;
        }
        let type_annotation = param
            .child_by_field_name("type")
            .map(|t| node_text(t, source).trim_start_matches(':').trim().to_string());
        let pattern = match param.child_by_field_name("pattern") {
            Some(p) => p,
            None => continue,
        };
        match pattern.kind() {
            "identifier" => {
                specs.push(ParamSpec {
                    pattern: BindingPattern::Simple(node_text(pattern, source).to_string()),
                    type_annotation,
                    force_used: false,
                });
            }
            "this" => {
                specs.push(ParamSpec::receiver("this"));
            }
            "rest_pattern" => {
                let name = pattern
                    .children(&mut pattern.walk())
                    .find(|c| c.kind() == "identifier")
                    .map(|c| node_text(c, source).to_string())
                    .unwrap_or_default();
                specs.push(ParamSpec {
                    pattern: BindingPattern::Rest(name),
                    type_annotation,
                    force_used: false,
                });
            }
            "object_pattern" | "array_pattern" => {
                let mut bindings = Vec::new();
                collect_pattern_bindings(pattern, source, &mut bindings);
                specs.push(ParamSpec {
                    pattern: BindingPattern::Destructured {
                        text: node_text(pattern, source).to_string(),
                        bindings,
                    },
                    type_annotation,
                    force_used: false,
                });
            }
            _ => {
                specs.push(ParamSpec {
                    pattern: BindingPattern::Simple(node_text(pattern, source).to_string()),
                    type_annotation,
                    force_used: false,
                });
            }
        }
    }
    specs
}

/// Collect binding names inside a destructuring pattern, skipping property
/// keys and default-value expressions.
fn collect_pattern_bindings(pattern: TsNode, source: &[u8], out: &mut Vec<String>) {
    let mut cursor = pattern.walk();
    for child in pattern.children(&mut cursor) {
        match child.kind() {
            "shorthand_property_identifier_pattern" | "identifier" => {
                out.push(node_text(child, source).to_string());
            }
            "pair_pattern" => {
                if let Some(value) = child.child_by_field_name("value") {
                    collect_pattern_bindings_value(value, source, out);
                }
            }
            "object_assignment_pattern" | "assignment_pattern" => {
                if let Some(left) = child.child_by_field_name("left") {
                    collect_pattern_bindings_value(left, source, out);
                }
            }
            "rest_pattern" | "object_pattern" | "array_pattern" => {
                collect_pattern_bindings(child, source, out);
            }
            _ => {}
        }
    }
}

fn collect_pattern_bindings_value(node: TsNode, source: &[u8], out: &mut Vec<String>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            out.push(node_text(node, source).to_string());
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            collect_pattern_bindings(node, source, out);
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Pass 1: imports and exports
// ---------------------------------------------------------------------------

fn collect_imports_and_exports(file: &TsFile, program: &mut TsProgram) {
    let source = &file.source;
    let root = file.tree.root_node();
    let mut cursor = root.walk();

    for stmt in root.children(&mut cursor) {
        match stmt.kind() {
            "import_statement" => {
                let target = match module_target(file, stmt, program) {
                    Some(t) => t,
                    None => continue, // out-of-project import
                };
                let clause = stmt
                    .children(&mut stmt.walk())
                    .find(|c| c.kind() == "import_clause");
                let clause = match clause {
                    Some(c) => c,
                    None => continue,
                };
                let mut cc = clause.walk();
                for item in clause.children(&mut cc) {
                    match item.kind() {
                        "identifier" => {
                            // default import
                            program.symbols.alias(
                                &file.rel_path,
                                node_text(item, source),
                                &target,
                                "default",
                            );
                        }
                        "namespace_import" => {
                            if let Some(ns) = item
                                .children(&mut item.walk())
                                .find(|c| c.kind() == "identifier")
                            {
                                program.namespaces.insert(
                                    (file.rel_path.clone(), node_text(ns, source).to_string()),
                                    target.clone(),
                                );
                            }
                        }
                        "named_imports" => {
                            let mut ni = item.walk();
                            for spec in item.children(&mut ni).filter(|c| c.kind() == "import_specifier") {
                                let imported = spec
                                    .child_by_field_name("name")
                                    .map(|n| node_text(n, source).to_string())
                                    .unwrap_or_default();
                                let local = spec
                                    .child_by_field_name("alias")
                                    .map(|n| node_text(n, source).to_string())
                                    .unwrap_or_else(|| imported.clone());
                                if !imported.is_empty() {
                                    program.symbols.alias(&file.rel_path, &local, &target, &imported);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            "export_statement" => {
                let target = module_target(file, stmt, program);
                let has_star = stmt.children(&mut stmt.walk()).any(|c| c.kind() == "*");
                if has_star {
                    if let Some(target) = target {
                        program.symbols.wildcard_reexport(&file.rel_path, &target);
                    }
                    continue;
                }
                if let Some(clause) = stmt
                    .children(&mut stmt.walk())
                    .find(|c| c.kind() == "export_clause")
                {
                    let mut ec = clause.walk();
                    for spec in clause.children(&mut ec).filter(|c| c.kind() == "export_specifier") {
                        let name = spec
                            .child_by_field_name("name")
                            .map(|n| node_text(n, source).to_string())
                            .unwrap_or_default();
                        let alias = spec
                            .child_by_field_name("alias")
                            .map(|n| node_text(n, source).to_string())
                            .unwrap_or_else(|| name.clone());
                        if name.is_empty() {
                            continue;
                        }
                        match &target {
                            // export { name as alias } from './x'
                            Some(target) => {
                                program.symbols.alias(&file.rel_path, &alias, target, &name)
                            }
                            // export { name as alias } of a local declaration
                            None => {
                                if alias != name {
                                    program.symbols.alias(&file.rel_path, &alias, &file.rel_path, &name)
                                }
                            }
                        }
                    }
                    continue;
                }
                // export default <identifier>;
                let is_default = stmt.children(&mut stmt.walk()).any(|c| c.kind() == "default");
                if is_default {
                    if let Some(value) = stmt.child_by_field_name("value") {
                        if value.kind() == "identifier" {
                            program.symbols.alias(
                                &file.rel_path,
                                "default",
                                &file.rel_path,
                                node_text(value, source),
                            );
                        }
                    } else if let Some(declaration) = stmt.child_by_field_name("declaration") {
                        if let Some(name) = declaration.child_by_field_name("name") {
                            program.symbols.alias(
                                &file.rel_path,
                                "default",
                                &file.rel_path,
                                node_text(name, source),
                            );
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Resolve a statement's module specifier to a project file.
fn module_target(file: &TsFile, stmt: TsNode, program: &TsProgram) -> Option<String> {
    let source_node = stmt.child_by_field_name("source")?;
    let spec = node_text(source_node, &file.source).trim_matches(|c| c == '"' || c == '\'').to_string();
    resolve_module(&file.rel_path, &spec, &program.files)
}

/// Resolve a relative import specifier against the project file set.
fn resolve_module(from: &str, spec: &str, files: &HashSet<String>) -> Option<String> {
    if !spec.starts_with("./") && !spec.starts_with("../") {
        return None; // bare specifier: out of project
    }
    let dir = match from.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    let joined = join_and_normalize(dir, spec);
    let candidates = [
        joined.clone(),
        format!("{}.ts", joined),
        format!("{}.tsx", joined),
        format!("{}.mts", joined),
        format!("{}/index.ts", joined),
        format!("{}/index.tsx", joined),
    ];
    candidates.into_iter().find(|c| files.contains(c))
}

/// Join a directory and a relative specifier, folding `.` and `..`.
fn join_and_normalize(dir: &str, spec: &str) -> String {
    let mut parts: Vec<&str> = if dir.is_empty() {
        Vec::new()
    } else {
        dir.split('/').collect()
    };
    for seg in spec.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

// ---------------------------------------------------------------------------
// Pass 2: body resolution
// ---------------------------------------------------------------------------

/// Module-scope `const x = new T()` bindings: variable -> class origin.
fn module_variable_classes(file: &TsFile, program: &TsProgram) -> HashMap<String, (String, String)> {
    let source = &file.source;
    let mut vars = HashMap::new();
    let root = file.tree.root_node();
    let mut cursor = root.walk();
    for stmt in root.children(&mut cursor) {
        let stmt = if stmt.kind() == "export_statement" {
            match stmt.child_by_field_name("declaration") {
                Some(d) => d,
                None => continue,
            }
        } else {
            stmt
        };
        if !matches!(stmt.kind(), "lexical_declaration" | "variable_declaration") {
            continue;
        }
        let mut sc = stmt.walk();
        for declarator in stmt.children(&mut sc).filter(|n| n.kind() == "variable_declarator") {
            let name = match declarator.child_by_field_name("name") {
                Some(n) if n.kind() == "identifier" => node_text(n, source).to_string(),
                _ => continue,
            };
            let value = match declarator.child_by_field_name("value") {
                Some(v) if v.kind() == "new_expression" => v,
                _ => continue,
            };
            if let Some(class_key) = class_of_new_expression(value, source, &file.rel_path, program) {
                vars.insert(name, class_key);
            }
        }
    }
    vars
}

/// Resolve the class constructed by a `new` expression to its (file, name).
fn class_of_new_expression(
    new_expr: TsNode,
    source: &[u8],
    file: &str,
    program: &TsProgram,
) -> Option<(String, String)> {
    let ctor = new_expr.child_by_field_name("constructor")?;
    if ctor.kind() != "identifier" {
        return None;
    }
    let name = node_text(ctor, source);
    let (origin_file, origin_name) = program
        .symbols
        .resolve_origin(file, name)
        .unwrap_or_else(|| (file.to_string(), name.to_string()));
    let key = (origin_file, origin_name);
    if program.classes.contains_key(&key) {
        Some(key)
    } else {
        None
    }
}

fn resolve_body(
    file: &TsFile,
    decl: &TsDecl<'_>,
    body: TsNode,
    program: &TsProgram,
    module_vars: &HashMap<String, (String, String)>,
    edges: &mut Vec<Edge>,
) {
    let source = &file.source;
    let source_id = Node::make_id(&file.rel_path, &decl.qualified);

    // Body-local `new T()` bindings shadow module-level ones.
    let mut local_vars = module_vars.clone();
    visit(body, &mut |node| {
        if node.kind() == "variable_declarator" {
            let name = match node.child_by_field_name("name") {
                Some(n) if n.kind() == "identifier" => node_text(n, source).to_string(),
                _ => return,
            };
            if let Some(value) = node.child_by_field_name("value") {
                if value.kind() == "new_expression" {
                    if let Some(class_key) =
                        class_of_new_expression(value, source, &file.rel_path, program)
                    {
                        local_vars.insert(name, class_key);
                    }
                }
            }
        }
    });

    visit(body, &mut |node| match node.kind() {
        "call_expression" => {
            let func = match node.child_by_field_name("function") {
                Some(f) => f,
                None => return,
            };
            match func.kind() {
                "identifier" => {
                    let callee = node_text(func, source);
                    if is_intrinsic(callee) {
                        return;
                    }
                    if let Some(target) = program.symbols.resolve(&file.rel_path, callee) {
                        edges.push(Edge::resolved(
                            source_id.clone(),
                            target.to_string(),
                            site(&file.rel_path, node),
                            EdgeKind::Direct,
                        ));
                    }
                }
                "member_expression" => {
                    resolve_member_call(
                        func, node, file, decl, program, &local_vars, &source_id, edges,
                    );
                }
                "subscript_expression" => {
                    // obj[key](): not statically resolvable.
                    edges.push(Edge::dynamic(
                        source_id.clone(),
                        node_text(func, source),
                        site(&file.rel_path, node),
                    ));
                }
                _ => {}
            }
            // Callback arguments: in-project functions passed by name.
            if let Some(args) = node.child_by_field_name("arguments") {
                let mut ac = args.walk();
                for arg in args.children(&mut ac) {
                    if arg.kind() != "identifier" {
                        continue;
                    }
                    let name = node_text(arg, source);
                    if is_intrinsic(name) {
                        continue;
                    }
                    if let Some(target) = program.symbols.resolve(&file.rel_path, name) {
                        edges.push(Edge::resolved(
                            source_id.clone(),
                            target.to_string(),
                            site(&file.rel_path, arg),
                            EdgeKind::Callback,
                        ));
                    }
                }
            }
        }
        "new_expression" => {
            if let Some(class_key) =
                class_of_new_expression(node, source, &file.rel_path, program)
            {
                if let Some(ctor) = program
                    .classes
                    .get(&class_key)
                    .and_then(|c| c.constructor.clone())
                {
                    edges.push(Edge::resolved(
                        source_id.clone(),
                        ctor,
                        site(&file.rel_path, node),
                        EdgeKind::Constructor,
                    ));
                }
            }
        }
        _ => {}
    });
}

#[allow(clippy::too_many_arguments)]
fn resolve_member_call(
    member: TsNode,
    call: TsNode,
    file: &TsFile,
    decl: &TsDecl<'_>,
    program: &TsProgram,
    local_vars: &HashMap<String, (String, String)>,
    source_id: &str,
    edges: &mut Vec<Edge>,
) {
    let source = &file.source;
    let property = match member.child_by_field_name("property") {
        Some(p) => node_text(p, source).to_string(),
        None => return,
    };
    let object = member.child_by_field_name("object");

    // this.m(): method on the enclosing class.
    if object.map(|o| o.kind()) == Some("this") {
        if let Some(class_name) = &decl.class_name {
            if let Some(target) = program
                .classes
                .get(&(file.rel_path.clone(), class_name.clone()))
                .and_then(|c| c.methods.get(&property))
            {
                edges.push(Edge::resolved(
                    source_id.to_string(),
                    target.clone(),
                    site(&file.rel_path, call),
                    EdgeKind::Method,
                ));
                return;
            }
        }
    }

    if let Some(object) = object.filter(|o| o.kind() == "identifier") {
        let object_name = node_text(object, source);

        // Namespace import: ns.fn() routes to the target module.
        if let Some(target_file) = program
            .namespaces
            .get(&(file.rel_path.clone(), object_name.to_string()))
        {
            if let Some(target) = program.symbols.resolve(target_file, &property) {
                edges.push(Edge::resolved(
                    source_id.to_string(),
                    target.to_string(),
                    site(&file.rel_path, call),
                    EdgeKind::Direct,
                ));
            }
            return;
        }

        // Instance with a known class: x = new T(); x.m().
        if let Some(class_key) = local_vars.get(object_name) {
            if let Some(target) = program.classes.get(class_key).and_then(|c| c.methods.get(&property)) {
                edges.push(Edge::resolved(
                    source_id.to_string(),
                    target.clone(),
                    site(&file.rel_path, call),
                    EdgeKind::Method,
                ));
            }
            return;
        }

        // Static call: T.m() where T names an in-project class.
        let origin = program
            .symbols
            .resolve_origin(&file.rel_path, object_name)
            .unwrap_or_else(|| (file.rel_path.clone(), object_name.to_string()));
        if let Some(info) = program.classes.get(&origin) {
            if let Some(target) = info.methods.get(&property) {
                edges.push(Edge::resolved(
                    source_id.to_string(),
                    target.clone(),
                    site(&file.rel_path, call),
                    EdgeKind::Method,
                ));
            }
            return;
        }
    }

    // Unknown receiver: fall back to method-name lookup, first in id order.
    if let Some(target) = program.symbols.methods_named(&property).first() {
        edges.push(Edge::resolved(
            source_id.to_string(),
            target.clone(),
            site(&file.rel_path, call),
            EdgeKind::Method,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CancelToken, DiagnosticSink};

    fn extract_sources(files: &[(&str, &str)]) -> Extraction {
        let dir = tempfile::tempdir().unwrap();
        let mut rels = Vec::new();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
            rels.push(rel.to_string());
        }
        let config = ResolvedConfig::for_project(Language::Typescript, dir.path());
        let ctx = ExtractContext::new(DiagnosticSink::new(), CancelToken::new());
        TypescriptExtractor::new().extract(&config, &rels, &ctx).unwrap()
    }

    fn edge<'a>(extraction: &'a Extraction, source: &str, target: &str) -> Option<&'a Edge> {
        extraction
            .edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }

    #[test]
    fn test_function_kinds() {
        let out = extract_sources(&[(
            "api.ts",
            r#"
export function handler(req: Request): Response {
    return process(req);
}

const transform = (data: string) => data.trim();

const legacy = function (x: number) { return x; };

function process(req: Request): Response {
    return null as any;
}
"#,
        )]);

        let handler = out.nodes.iter().find(|n| n.name == "handler").unwrap();
        assert_eq!(handler.kind, FunctionKind::Function);
        assert_eq!(handler.visibility, Visibility::Exported);

        let transform = out.nodes.iter().find(|n| n.name == "transform").unwrap();
        assert_eq!(transform.kind, FunctionKind::Arrow);
        assert_eq!(transform.visibility, Visibility::Module);

        let legacy = out.nodes.iter().find(|n| n.name == "legacy").unwrap();
        assert_eq!(legacy.kind, FunctionKind::Closure);

        let call = edge(&out, "api.ts:handler", "api.ts:process").unwrap();
        assert_eq!(call.kind, EdgeKind::Direct);
    }

    #[test]
    fn test_class_members() {
        let out = extract_sources(&[(
            "service.ts",
            r#"
export class UserService {
    constructor(private repo: Repo) {}

    findUser(id: string) {
        return this.normalize(id);
    }

    private normalize(id: string) {
        return id.trim();
    }

    get count() {
        return 0;
    }

    handle = (event: Event) => {
        this.findUser("x");
    };
}
"#,
        )]);

        let ids: Vec<_> = out.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(ids.contains(&"service.ts:UserService.constructor"));
        assert!(ids.contains(&"service.ts:UserService.findUser"));
        assert!(ids.contains(&"service.ts:UserService.normalize"));
        assert!(ids.contains(&"service.ts:UserService.get count"));
        assert!(ids.contains(&"service.ts:UserService.handle"));

        let normalize = out.nodes.iter().find(|n| n.name == "normalize").unwrap();
        assert_eq!(normalize.visibility, Visibility::Private);

        let find_user = out.nodes.iter().find(|n| n.name == "findUser").unwrap();
        assert_eq!(find_user.visibility, Visibility::Public);

        let this_call = edge(
            &out,
            "service.ts:UserService.findUser",
            "service.ts:UserService.normalize",
        )
        .unwrap();
        assert_eq!(this_call.kind, EdgeKind::Method);

        let arrow_call = edge(
            &out,
            "service.ts:UserService.handle",
            "service.ts:UserService.findUser",
        )
        .unwrap();
        assert_eq!(arrow_call.kind, EdgeKind::Method);
    }

    #[test]
    fn test_import_resolution() {
        let out = extract_sources(&[
            (
                "util.ts",
                r#"
export function validate(input: string): boolean {
    return input.length > 0;
}
"#,
            ),
            (
                "main.ts",
                r#"
import { validate } from './util';

export function run(input: string) {
    return validate(input);
}
"#,
            ),
        ]);

        let call = edge(&out, "main.ts:run", "util.ts:validate").unwrap();
        assert_eq!(call.kind, EdgeKind::Direct);
        assert!(call.is_resolved);
    }

    #[test]
    fn test_reexport_chain_resolves_to_original() {
        let out = extract_sources(&[
            (
                "a.ts",
                r#"
export function validate(x: string): boolean {
    return x.length > 0;
}
"#,
            ),
            ("reexport.ts", "export { validate } from './a';\n"),
            (
                "c.ts",
                r#"
import { validate } from './reexport';

export function check(x: string) {
    return validate(x);
}
"#,
            ),
        ]);

        // No alias-only node for the re-export.
        assert!(out.nodes.iter().all(|n| n.file_path != "reexport.ts"));

        let call = edge(&out, "c.ts:check", "a.ts:validate").unwrap();
        assert!(call.is_resolved);
        assert_eq!(call.kind, EdgeKind::Direct);
    }

    #[test]
    fn test_renamed_import() {
        let out = extract_sources(&[
            ("a.ts", "export function original(): void {}\n"),
            (
                "b.ts",
                r#"
import { original as renamed } from './a';

export function caller() {
    renamed();
}
"#,
            ),
        ]);
        assert!(edge(&out, "b.ts:caller", "a.ts:original").is_some());
    }

    #[test]
    fn test_constructor_edge() {
        let out = extract_sources(&[(
            "app.ts",
            r#"
class Engine {
    constructor(config: object) {}

    start() {}
}

export function boot() {
    const engine = new Engine({});
    engine.start();
}
"#,
        )]);

        let ctor = edge(&out, "app.ts:boot", "app.ts:Engine.constructor").unwrap();
        assert_eq!(ctor.kind, EdgeKind::Constructor);

        let method = edge(&out, "app.ts:boot", "app.ts:Engine.start").unwrap();
        assert_eq!(method.kind, EdgeKind::Method);
    }

    #[test]
    fn test_callback_edge() {
        let out = extract_sources(&[(
            "list.ts",
            r#"
function double(x: number): number {
    return x * 2;
}

export function run(items: number[]) {
    return items.map(double);
}
"#,
        )]);
        let cb = edge(&out, "list.ts:run", "list.ts:double").unwrap();
        assert_eq!(cb.kind, EdgeKind::Callback);
    }

    #[test]
    fn test_dynamic_call_sentinel() {
        let out = extract_sources(&[(
            "dyn.ts",
            r#"
export function dispatch(obj: any, key: string) {
    obj[key]();
}
"#,
        )]);
        let dynamic = out.edges.iter().find(|e| e.kind == EdgeKind::Dynamic).unwrap();
        assert_eq!(dynamic.target, "[dynamic:obj[key]]");
        assert!(!dynamic.is_resolved);
    }

    #[test]
    fn test_decorators() {
        let out = extract_sources(&[(
            "ctrl.ts",
            r#"
class Controller {
    @Get('/users')
    list() {}

    @auth.required
    update() {}
}
"#,
        )]);
        let list = out.nodes.iter().find(|n| n.name == "list").unwrap();
        assert_eq!(list.decorators, vec!["Get".to_string()]);
        let update = out.nodes.iter().find(|n| n.name == "update").unwrap();
        assert_eq!(update.decorators, vec!["auth.required".to_string()]);
    }

    #[test]
    fn test_destructured_parameter() {
        let out = extract_sources(&[(
            "opts.ts",
            r#"
export function configure({host, port}: Config) {
    return host;
}
"#,
        )]);
        let node = out.nodes.iter().find(|n| n.name == "configure").unwrap();
        assert_eq!(node.parameters.len(), 1);
        assert_eq!(node.parameters[0].name, "{host, port}");
        assert_eq!(node.unused_parameters, vec!["port".to_string()]);
    }

    #[test]
    fn test_unused_parameter_scenario() {
        // formatOutput(data, _options, unusedParam): body uses data only.
        let out = extract_sources(&[(
            "fmt.ts",
            r#"
export function formatOutput(data: string, _options: object, unusedParam: number) {
    return `[output] ${data}`;
}
"#,
        )]);
        let node = out.nodes.iter().find(|n| n.name == "formatOutput").unwrap();
        assert_eq!(node.unused_parameters, vec!["unusedParam".to_string()]);
        assert!(node.parameters[0].is_used);
        assert!(node.parameters[1].is_used); // underscore rule
        assert!(!node.parameters[2].is_used);
    }

    #[test]
    fn test_namespace_import_call() {
        let out = extract_sources(&[
            ("helpers.ts", "export function clean(s: string) { return s; }\n"),
            (
                "main.ts",
                r#"
import * as helpers from './helpers';

export function run() {
    return helpers.clean('x');
}
"#,
            ),
        ]);
        assert!(edge(&out, "main.ts:run", "helpers.ts:clean").is_some());
    }

    #[test]
    fn test_default_export_import() {
        let out = extract_sources(&[
            ("worker.ts", "export default function work() {}\n"),
            (
                "main.ts",
                r#"
import work from './worker';

export function run() {
    work();
}
"#,
            ),
        ]);
        assert!(edge(&out, "main.ts:run", "worker.ts:work").is_some());
    }

    #[test]
    fn test_recursion_self_edge() {
        let out = extract_sources(&[(
            "rec.ts",
            r#"
export function fib(n: number): number {
    if (n < 2) return n;
    return fib(n - 1) + fib(n - 2);
}
"#,
        )]);
        let selfedge = edge(&out, "rec.ts:fib", "rec.ts:fib").unwrap();
        assert_eq!(selfedge.kind, EdgeKind::Direct);
    }

    #[test]
    fn test_out_of_project_imports_dropped() {
        let out = extract_sources(&[(
            "main.ts",
            r#"
import { readFile } from 'fs';

export function run() {
    readFile('x');
    console.log('hi');
}
"#,
        )]);
        assert!(out.edges.is_empty());
    }

    #[test]
    fn test_module_level_singleton_method_call() {
        let out = extract_sources(&[(
            "svc.ts",
            r#"
class Cache {
    get(key: string) { return key; }
}

const cache = new Cache();

export function lookup(key: string) {
    return cache.get(key);
}
"#,
        )]);
        let e = edge(&out, "svc.ts:lookup", "svc.ts:Cache.get").unwrap();
        assert_eq!(e.kind, EdgeKind::Method);
    }
}
