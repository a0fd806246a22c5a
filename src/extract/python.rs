//! Python extractor.
//!
//! Resolution is best-effort without a type checker: pass 1 collects
//! module-level functions, class methods, lambda bindings, and
//! `from x import y` aliases; pass 2 resolves calls by name. Attribute
//! calls resolve against the enclosing class for `self.m()` and fall back
//! to method-name lookup in id order. Constructor calls `T(...)` route to
//! `T.__init__` when one exists.
//!
//! Auto entry points: functions referenced inside an
//! `if __name__ == '__main__':` block, and functions whose decorators look
//! like route/command registrations.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tree_sitter::{Node as TsNode, Parser};

use crate::config::ResolvedConfig;
use crate::diagnostics::DiagnosticCode;
use crate::error::AnalysisError;
use crate::model::{
    CallSite, Edge, EdgeKind, FunctionKind, Language, Node, NodeColor, NodeStatus, Visibility,
};

use super::helper::PY_HELPER_TIMEOUT;
use super::params::{analyze_parameters, BindingPattern, ParamLang, ParamSpec};
use super::symbols::SymbolTable;
use super::{helper, ExtractContext, Extraction, LanguageExtractor};

/// Python builtins and common exception types that never produce edges.
const PY_BUILTINS: &[&str] = &[
    "print", "len", "range", "str", "int", "float", "bool", "list", "dict", "set", "tuple",
    "type", "isinstance", "issubclass", "hasattr", "getattr", "setattr", "delattr", "id", "hash",
    "repr", "sorted", "reversed", "enumerate", "zip", "map", "filter", "any", "all", "min", "max",
    "sum", "abs", "round", "input", "open", "super", "property", "staticmethod", "classmethod",
    "ValueError", "TypeError", "KeyError", "IndexError", "RuntimeError", "Exception",
    "NotImplementedError", "AttributeError", "OSError", "IOError", "StopIteration", "next",
    "iter", "callable", "vars", "dir", "globals", "locals", "exec", "eval", "compile", "format",
    "chr", "ord", "hex", "oct", "bin", "pow", "divmod", "complex", "bytes", "bytearray",
    "memoryview", "frozenset", "object", "breakpoint",
];

/// Decorator fragments that register a function with a framework.
const ENTRY_DECORATOR_HINTS: &[&str] =
    &["route", "get", "post", "put", "delete", "command", "task"];

fn is_builtin(name: &str) -> bool {
    PY_BUILTINS.contains(&name)
}

pub struct PythonExtractor {
    language: tree_sitter::Language,
}

impl PythonExtractor {
    pub fn new() -> Self {
        Self { language: tree_sitter_python::LANGUAGE.into() }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct PyFile {
    rel_path: String,
    source: Vec<u8>,
    tree: tree_sitter::Tree,
}

/// One function-like declaration found during the file walk.
struct PyDecl<'t> {
    name: String,
    qualified: String,
    kind: FunctionKind,
    class_name: Option<String>,
    decorators: Vec<String>,
    decl: TsNode<'t>,
    body: Option<TsNode<'t>>,
    params: Option<TsNode<'t>>,
}

#[derive(Debug, Default, Clone)]
struct ClassInfo {
    init: Option<String>,
    methods: HashMap<String, String>,
}

#[derive(Default)]
struct PyProgram {
    symbols: SymbolTable,
    classes: HashMap<(String, String), ClassInfo>,
    files: HashSet<String>,
}

impl LanguageExtractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        ctx: &ExtractContext,
    ) -> anyhow::Result<Extraction> {
        if let Some(exe) = helper::find_helper("codegraph-py-helper") {
            let request = helper::HelperRequest {
                files,
                project_root: &config.project_root,
                module: None,
            };
            match helper::run_helper(&exe, &request, PY_HELPER_TIMEOUT, &ctx.sink) {
                Ok(response) => {
                    return Ok(Extraction {
                        nodes: response.nodes,
                        edges: response.edges,
                        files_analyzed: files.len(),
                    })
                }
                Err(e @ AnalysisError::HelperTimeout(_)) => return Err(e.into()),
                Err(e) => ctx.sink.warn(
                    DiagnosticCode::HelperUnavailable,
                    format!("python helper failed, using syntactic analysis: {}", e),
                ),
            }
        }
        self.extract_native(config, files, ctx)
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

impl PythonExtractor {
    fn extract_native(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        ctx: &ExtractContext,
    ) -> anyhow::Result<Extraction> {
        let parsed: Vec<PyFile> = files
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
                            "failed to parse Python source",
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
                Some(PyFile { rel_path: rel.clone(), source, tree })
            })
            .collect();

        if ctx.cancel.is_cancelled() {
            ctx.sink.warn(DiagnosticCode::Cancelled, "extraction cancelled");
            return Err(AnalysisError::Cancelled.into());
        }

        // Pass 1: declarations and aliases.
        let mut program = PyProgram::default();
        for file in &parsed {
            program.files.insert(file.rel_path.clone());
        }
        let mut nodes = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        for file in &parsed {
            let main_refs = main_block_references(file);
            for decl in collect_declarations(file) {
                let mut node = build_node(file, &decl);
                // Redefinitions of the same name fold onto the first node.
                if !seen_ids.insert(node.id.clone()) {
                    continue;
                }
                if main_refs.contains(&decl.name) && decl.class_name.is_none() {
                    node.is_entry_point = true;
                }
                if decl
                    .decorators
                    .iter()
                    .any(|d| ENTRY_DECORATOR_HINTS.iter().any(|h| d.contains(h)))
                {
                    node.is_entry_point = true;
                }
                match &decl.class_name {
                    Some(class) => {
                        let info = program
                            .classes
                            .entry((file.rel_path.clone(), class.clone()))
                            .or_default();
                        if decl.kind == FunctionKind::Constructor {
                            info.init = Some(node.id.clone());
                        } else {
                            info.methods.insert(decl.name.clone(), node.id.clone());
                            program.symbols.declare_method(&decl.name, &node.id);
                        }
                    }
                    None => {
                        program.symbols.declare(&file.rel_path, &decl.name, &node.id);
                        program.symbols.declare_function(&decl.name, &node.id);
                    }
                }
                nodes.push(node);
            }
            collect_imports(file, &mut program);
        }

        // Pass 2: call resolution.
        let mut edges = Vec::new();
        for file in &parsed {
            for decl in collect_declarations(file) {
                if let Some(body) = decl.body {
                    resolve_body(file, &decl, body, &program, &mut edges);
                }
            }
        }

        Ok(Extraction { nodes, edges, files_analyzed: parsed.len() })
    }
}

// ---------------------------------------------------------------------------
// Pass 1
// ---------------------------------------------------------------------------

/// Enumerate defs at module scope and inside classes, plus module-level
/// lambda bindings. Nested defs are not nodes; their calls attribute to
/// the enclosing declaration.
fn collect_declarations(file: &PyFile) -> Vec<PyDecl<'_>> {
    let source = &file.source;
    let mut decls = Vec::new();
    let root = file.tree.root_node();
    let mut cursor = root.walk();

    for stmt in root.children(&mut cursor) {
        collect_statement(stmt, source, None, &mut decls);
    }
    decls
}

fn collect_statement<'t>(
    stmt: TsNode<'t>,
    source: &[u8],
    class_name: Option<&str>,
    decls: &mut Vec<PyDecl<'t>>,
) {
    match stmt.kind() {
        "function_definition" => {
            decls.push(function_decl(stmt, source, class_name, Vec::new()));
        }
        "decorated_definition" => {
            let decorators = decorator_names(stmt, source);
            if let Some(definition) = stmt.child_by_field_name("definition") {
                match definition.kind() {
                    "function_definition" => {
                        decls.push(function_decl(definition, source, class_name, decorators));
                    }
                    "class_definition" => {
                        collect_class(definition, source, decls);
                    }
                    _ => {}
                }
            }
        }
        "class_definition" if class_name.is_none() => {
            collect_class(stmt, source, decls);
        }
        "expression_statement" if class_name.is_none() => {
            // Module-level lambda binding: name = lambda ...
            let mut cursor = stmt.walk();
            for expr in stmt.children(&mut cursor) {
                if expr.kind() != "assignment" {
                    continue;
                }
                let left = expr.child_by_field_name("left");
                let right = expr.child_by_field_name("right");
                if let (Some(left), Some(right)) = (left, right) {
                    if left.kind() == "identifier" && right.kind() == "lambda" {
                        let name = node_text(left, source).to_string();
                        decls.push(PyDecl {
                            qualified: name.clone(),
                            name,
                            kind: FunctionKind::Lambda,
                            class_name: None,
                            decorators: Vec::new(),
                            decl: expr,
                            body: right.child_by_field_name("body"),
                            params: right.child_by_field_name("parameters"),
                        });
                    }
                }
            }
        }
        _ => {}
    }
}

fn function_decl<'t>(
    def: TsNode<'t>,
    source: &[u8],
    class_name: Option<&str>,
    decorators: Vec<String>,
) -> PyDecl<'t> {
    let name = def
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();
    let kind = match class_name {
        Some(_) if name == "__init__" => FunctionKind::Constructor,
        Some(_) => FunctionKind::Method,
        None => FunctionKind::Function,
    };
    let qualified = match class_name {
        Some(class) => format!("{}.{}", class, name),
        None => name.clone(),
    };
    PyDecl {
        name,
        qualified,
        kind,
        class_name: class_name.map(|s| s.to_string()),
        decorators,
        decl: def,
        body: def.child_by_field_name("body"),
        params: def.child_by_field_name("parameters"),
    }
}

fn collect_class<'t>(class: TsNode<'t>, source: &[u8], decls: &mut Vec<PyDecl<'t>>) {
    let class_name = match class.child_by_field_name("name") {
        Some(n) => node_text(n, source).to_string(),
        None => return,
    };
    let body = match class.child_by_field_name("body") {
        Some(b) => b,
        None => return,
    };
    let mut cursor = body.walk();
    for stmt in body.children(&mut cursor) {
        collect_statement(stmt, source, Some(&class_name), decls);
    }
}

fn decorator_names(decorated: TsNode, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = decorated.walk();
    for child in decorated.children(&mut cursor) {
        if child.kind() == "decorator" {
            let text = node_text(child, source).trim_start_matches('@');
            let name = match text.find('(') {
                Some(idx) => &text[..idx],
                None => text,
            };
            let name = name.trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    names
}

fn visibility_for(name: &str) -> Visibility {
    if !name.starts_with('_') {
        Visibility::Exported
    } else if name.starts_with("__") && !name.ends_with("__") {
        Visibility::Private
    } else {
        Visibility::Module
    }
}

fn build_node(file: &PyFile, decl: &PyDecl<'_>) -> Node {
    let source = &file.source;
    let id = Node::make_id(&file.rel_path, &decl.qualified);
    let specs = decl
        .params
        .map(|p| parameter_specs(p, source, decl.class_name.is_some()))
        .unwrap_or_default();
    let (parameters, unused_parameters) =
        analyze_parameters(&specs, decl.body, source, ParamLang::Python);

    let start_line = decl.decl.start_position().row as u32 + 1;
    let end_line = decl.decl.end_position().row as u32 + 1;

    Node {
        id: id.clone(),
        name: decl.name.clone(),
        qualified_name: id,
        file_path: file.rel_path.clone(),
        start_line,
        end_line,
        language: Language::Python,
        kind: decl.kind,
        visibility: visibility_for(&decl.name),
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

/// Parameter specs from a `parameters` list. Receivers (`self`/`cls`) and
/// splat bindings are recorded; separators are skipped.
fn parameter_specs(params: TsNode, source: &[u8], is_method: bool) -> Vec<ParamSpec> {
    let mut specs = Vec::new();
    let mut cursor = params.walk();
    let mut first = true;
    for param in params.children(&mut cursor) {
        let spec = match param.kind() {
            "identifier" => {
                let name = node_text(param, source).to_string();
                Some(ParamSpec::simple(name, None))
            }
            "typed_parameter" => {
                let name = param
                    .children(&mut param.walk())
                    .find(|c| c.kind() == "identifier")
                    .map(|c| node_text(c, source).to_string())
                    .unwrap_or_default();
                let ty = param
                    .child_by_field_name("type")
                    .map(|t| node_text(t, source).to_string());
                Some(ParamSpec::simple(name, ty))
            }
            "default_parameter" | "typed_default_parameter" => {
                let name = param
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                let ty = param
                    .child_by_field_name("type")
                    .map(|t| node_text(t, source).to_string());
                Some(ParamSpec::simple(name, ty))
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                let name = param
                    .children(&mut param.walk())
                    .find(|c| c.kind() == "identifier")
                    .map(|c| node_text(c, source).to_string())
                    .unwrap_or_default();
                Some(ParamSpec {
                    pattern: BindingPattern::Rest(name),
                    type_annotation: None,
                    force_used: false,
                })
            }
            _ => None,
        };

        if let Some(mut spec) = spec {
            // Leading self/cls receivers are always considered used.
            if first && is_method {
                if let BindingPattern::Simple(name) | BindingPattern::Rest(name) = &spec.pattern {
                    if name == "self" || name == "cls" {
                        spec.force_used = true;
                    }
                }
            }
            first = false;
            specs.push(spec);
        }
    }
    specs
}

/// Names referenced inside a module's `if __name__ == '__main__':` block.
fn main_block_references(file: &PyFile) -> HashSet<String> {
    let source = &file.source;
    let mut refs = HashSet::new();
    let root = file.tree.root_node();
    let mut cursor = root.walk();
    for stmt in root.children(&mut cursor) {
        if stmt.kind() != "if_statement" {
            continue;
        }
        let condition = match stmt.child_by_field_name("condition") {
            Some(c) => node_text(c, source).to_string(),
            None => continue,
        };
        if !(condition.contains("__name__") && condition.contains("__main__")) {
            continue;
        }
        if let Some(consequence) = stmt.child_by_field_name("consequence") {
            visit(consequence, &mut |node| {
                if node.kind() != "identifier" {
                    return;
                }
                // Attribute right-hand sides are not references.
                if let Some(parent) = node.parent() {
                    if parent.kind() == "attribute"
                        && parent.child_by_field_name("attribute") == Some(node)
                    {
                        return;
                    }
                }
                refs.insert(node_text(node, source).to_string());
            });
        }
    }
    refs
}

/// Record `from x import y [as z]` aliases pointing at project modules.
fn collect_imports(file: &PyFile, program: &mut PyProgram) {
    let source = &file.source;
    let root = file.tree.root_node();
    let mut cursor = root.walk();

    for stmt in root.children(&mut cursor) {
        if stmt.kind() != "import_from_statement" {
            continue;
        }
        let module = match stmt.child_by_field_name("module_name") {
            Some(m) => node_text(m, source).to_string(),
            None => continue,
        };
        let target_file = match resolve_module(&file.rel_path, &module, &program.files) {
            Some(t) => t,
            None => continue,
        };

        let mut sc = stmt.walk();
        for item in stmt.children(&mut sc) {
            match item.kind() {
                "dotted_name" => {
                    // The module path itself shares this kind; imported names
                    // are the dotted_name children after the `import` keyword.
                    if Some(item) == stmt.child_by_field_name("module_name") {
                        continue;
                    }
                    let name = node_text(item, source);
                    program.symbols.alias(&file.rel_path, name, &target_file, name);
                }
                "aliased_import" => {
                    let name = item
                        .child_by_field_name("name")
                        .map(|n| node_text(n, source).to_string())
                        .unwrap_or_default();
                    let alias = item
                        .child_by_field_name("alias")
                        .map(|n| node_text(n, source).to_string())
                        .unwrap_or_else(|| name.clone());
                    if !name.is_empty() {
                        program.symbols.alias(&file.rel_path, &alias, &target_file, &name);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Resolve a dotted module path (absolute from the project root, or
/// relative with leading dots) to a project file.
fn resolve_module(from: &str, module: &str, files: &HashSet<String>) -> Option<String> {
    let (dots, rest) = {
        let trimmed = module.trim_start_matches('.');
        (module.len() - trimmed.len(), trimmed)
    };
    let base = if dots > 0 {
        // Relative import: one dot = current package.
        let mut dir = match from.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => String::new(),
        };
        for _ in 1..dots {
            dir = match dir.rsplit_once('/') {
                Some((parent, _)) => parent.to_string(),
                None => String::new(),
            };
        }
        dir
    } else {
        String::new()
    };

    let path = rest.replace('.', "/");
    let joined = if base.is_empty() {
        path
    } else if path.is_empty() {
        base
    } else {
        format!("{}/{}", base, path)
    };

    let candidates = [format!("{}.py", joined), format!("{}/__init__.py", joined)];
    candidates.into_iter().find(|c| files.contains(c))
}

// ---------------------------------------------------------------------------
// Pass 2
// ---------------------------------------------------------------------------

fn resolve_body(
    file: &PyFile,
    decl: &PyDecl<'_>,
    body: TsNode,
    program: &PyProgram,
    edges: &mut Vec<Edge>,
) {
    let source = &file.source;
    let source_id = Node::make_id(&file.rel_path, &decl.qualified);

    visit(body, &mut |node| {
        if node.kind() != "call" {
            return;
        }
        let func = match node.child_by_field_name("function") {
            Some(f) => f,
            None => return,
        };
        match func.kind() {
            "identifier" => {
                let callee = node_text(func, source);
                if is_builtin(callee) {
                    return;
                }
                // Plain function (possibly imported).
                if let Some(target) = program.symbols.resolve(&file.rel_path, callee) {
                    edges.push(Edge::resolved(
                        source_id.clone(),
                        target.to_string(),
                        site(&file.rel_path, node),
                        EdgeKind::Direct,
                    ));
                    return;
                }
                // Bare-name fallback: a function declared in another module
                // even without an import statement, first in id order.
                if let Some(target) = program.symbols.functions_named(callee).first() {
                    edges.push(Edge::resolved(
                        source_id.clone(),
                        target.clone(),
                        site(&file.rel_path, node),
                        EdgeKind::Direct,
                    ));
                    return;
                }
                // Constructor: T(...) routes to T.__init__.
                let origin = program
                    .symbols
                    .resolve_origin(&file.rel_path, callee)
                    .unwrap_or_else(|| (file.rel_path.clone(), callee.to_string()));
                if let Some(init) = program.classes.get(&origin).and_then(|c| c.init.clone()) {
                    edges.push(Edge::resolved(
                        source_id.clone(),
                        init,
                        site(&file.rel_path, node),
                        EdgeKind::Constructor,
                    ));
                }
            }
            "attribute" => {
                let method = match func.child_by_field_name("attribute") {
                    Some(a) => node_text(a, source).to_string(),
                    None => return,
                };
                if is_builtin(&method) {
                    return;
                }
                let object = func.child_by_field_name("object");
                let object_name = object
                    .filter(|o| o.kind() == "identifier")
                    .map(|o| node_text(o, source));

                // self.m(): the enclosing class wins.
                if object_name == Some("self") {
                    if let Some(class_name) = &decl.class_name {
                        if let Some(target) = program
                            .classes
                            .get(&(file.rel_path.clone(), class_name.clone()))
                            .and_then(|c| c.methods.get(&method))
                        {
                            edges.push(Edge::resolved(
                                source_id.clone(),
                                target.clone(),
                                site(&file.rel_path, node),
                                EdgeKind::Method,
                            ));
                            return;
                        }
                    }
                }

                // Module attribute: from-import of a module is not modeled;
                // fall back to method name across all classes, first in id
                // order.
                if let Some(target) = program.symbols.methods_named(&method).first() {
                    edges.push(Edge::resolved(
                        source_id.clone(),
                        target.clone(),
                        site(&file.rel_path, node),
                        EdgeKind::Method,
                    ));
                }
            }
            _ => {}
        }
    });
}
