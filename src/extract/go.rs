//! Go extractor.
//!
//! The primary path delegates to an external `codegraph-go-helper` for
//! fully type-checked resolution over the JSON stdio protocol. Without
//! one, the native
//! tree-sitter path takes over: it resolves calls syntactically, infers
//! local variable types from declarations, composite literals, and known
//! constructor results, and matches interfaces structurally by method-name
//! sets. Interface dispatch fans out to every concrete in-project
//! implementation of the called method.
//!
//! Beyond plain calls the extractor models two Go liveness patterns:
//! - module-level `var`/`const` initializers referencing functions produce
//!   a synthetic entry-pointed `__var_init__` node per file with `varinit`
//!   edges (dependency-injection provider lists);
//! - a constructor returning a named type `T` (or an interface) makes the
//!   methods on `T` (or on every implementation) reachable via `provided`
//!   edges.

use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use tree_sitter::{Node as TsNode, Parser};

use crate::config::ResolvedConfig;
use crate::diagnostics::DiagnosticCode;
use crate::error::AnalysisError;
use crate::model::{
    CallSite, Edge, EdgeKind, FunctionKind, Language, Node, NodeColor, NodeStatus, Visibility,
    VAR_INIT_NAME,
};

use super::params::{analyze_parameters, ParamLang, ParamSpec};
use super::{helper, ExtractContext, Extraction, LanguageExtractor, GO_HELPER_TIMEOUT};

/// Go builtin functions that never produce edges.
const GO_BUILTINS: &[&str] = &[
    "make", "len", "cap", "append", "copy", "delete", "close", "new", "panic", "recover", "print",
    "println", "complex", "real", "imag", "clear", "min", "max",
];

fn is_builtin(name: &str) -> bool {
    GO_BUILTINS.contains(&name)
}

pub struct GoExtractor {
    language: tree_sitter::Language,
}

impl GoExtractor {
    pub fn new() -> Self {
        Self { language: tree_sitter_go::LANGUAGE.into() }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }
}

impl Default for GoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for GoExtractor {
    fn language(&self) -> Language {
        Language::Go
    }

    fn extract(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        ctx: &ExtractContext,
    ) -> anyhow::Result<Extraction> {
        if let Some(exe) = helper::find_helper("codegraph-go-helper") {
            let request = helper::HelperRequest {
                files,
                project_root: &config.project_root,
                module: config.go.module.as_deref(),
            };
            match helper::run_helper(&exe, &request, GO_HELPER_TIMEOUT, &ctx.sink) {
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
                    format!("go helper failed, using syntactic analysis: {}", e),
                ),
            }
        }
        self.extract_native(config, files, ctx)
    }
}

/// One parsed source file.
struct GoFile {
    rel_path: String,
    source: Vec<u8>,
    tree: tree_sitter::Tree,
    package: String,
}

/// Program-wide declaration tables built in pass 1.
#[derive(Default)]
struct GoProgram {
    /// (file, name) -> id, free functions only.
    funcs_by_file: HashMap<(String, String), String>,
    /// (package dir, name) -> id, free functions only.
    funcs_by_package: HashMap<(String, String), String>,
    /// bare name -> ids, sorted, free functions.
    funcs_by_name: BTreeMap<String, Vec<String>>,
    /// (receiver type, method name) -> id.
    methods: HashMap<(String, String), String>,
    /// receiver type -> [(method name, id)], sorted by method name.
    type_methods: BTreeMap<String, Vec<(String, String)>>,
    /// interface name -> method names.
    interfaces: BTreeMap<String, Vec<String>>,
    /// interface name -> implementing concrete types, computed once after
    /// pass 1.
    iface_impls: BTreeMap<String, Vec<String>>,
    /// named concrete (non-interface) types.
    concrete_types: HashSet<String>,
    /// free function id -> bare result type names.
    func_results: HashMap<String, Vec<String>>,
    /// file -> import alias -> in-project package dir.
    imports: HashMap<String, HashMap<String, String>>,
    /// all package dirs in the project.
    package_dirs: HashSet<String>,
}

impl GoProgram {
    /// Fill the interface-implementation cache from the declaration tables.
    fn cache_implementors(&mut self) {
        let mut cache = BTreeMap::new();
        for (iface, wanted) in &self.interfaces {
            if wanted.is_empty() {
                cache.insert(iface.clone(), Vec::new());
                continue;
            }
            let impls: Vec<String> = self
                .type_methods
                .iter()
                .filter(|(ty, methods)| {
                    self.concrete_types.contains(*ty)
                        && wanted
                            .iter()
                            .all(|w| methods.iter().any(|(name, _)| name == w))
                })
                .map(|(ty, _)| ty.clone())
                .collect();
            cache.insert(iface.clone(), impls);
        }
        self.iface_impls = cache;
    }

    /// Concrete types whose method set covers the interface's.
    fn implementors(&self, iface: &str) -> &[String] {
        self.iface_impls.get(iface).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Resolve a free function name visible from `file`.
    fn resolve_function(&self, file: &str, name: &str) -> Option<&str> {
        if let Some(id) = self.funcs_by_file.get(&(file.to_string(), name.to_string())) {
            return Some(id);
        }
        let pkg = package_dir(file);
        if let Some(id) = self.funcs_by_package.get(&(pkg, name.to_string())) {
            return Some(id);
        }
        self.funcs_by_name
            .get(name)
            .and_then(|ids| ids.first())
            .map(|s| s.as_str())
    }

    /// Resolve without the global fallback (used for funcref edges, where a
    /// cross-package bare-name guess is too speculative).
    fn resolve_function_near(&self, file: &str, name: &str) -> Option<&str> {
        if let Some(id) = self.funcs_by_file.get(&(file.to_string(), name.to_string())) {
            return Some(id);
        }
        let pkg = package_dir(file);
        self.funcs_by_package
            .get(&(pkg, name.to_string()))
            .map(|s| s.as_str())
    }
}

fn package_dir(rel_path: &str) -> String {
    match rel_path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
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

/// Depth-first preorder visit in source order.
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

/// Strip pointer/slice markers down to a bare named type, if any.
fn bare_type_name(type_text: &str) -> String {
    let t = type_text.trim().trim_start_matches(['*', '&']);
    let t = t.trim_start_matches("[]");
    // Qualified types (pkg.T) keep only the type name for method matching.
    match t.rsplit_once('.') {
        Some((_, name)) => name.to_string(),
        None => t.to_string(),
    }
}

impl GoExtractor {
    fn extract_native(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        ctx: &ExtractContext,
    ) -> anyhow::Result<Extraction> {
        // Parse all files up front. File-parallel; the symbol table below is
        // the barrier before bodies are resolved.
        let parsed: Vec<GoFile> = files
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
                            "failed to parse Go source",
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
                let package = package_name(&tree, &source).unwrap_or_default();
                Some(GoFile { rel_path: rel.clone(), source, tree, package })
            })
            .collect();

        if ctx.cancel.is_cancelled() {
            ctx.sink.warn(DiagnosticCode::Cancelled, "extraction cancelled");
            return Err(AnalysisError::Cancelled.into());
        }

        // Pass 1: declarations.
        let mut nodes = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut program = GoProgram::default();
        for file in &parsed {
            program.package_dirs.insert(package_dir(&file.rel_path));
        }
        for file in &parsed {
            self.collect_declarations(file, config, &mut nodes, &mut seen_ids, &mut program);
        }
        program.cache_implementors();

        // Pass 2: edges.
        let mut edges = Vec::new();
        for file in &parsed {
            self.collect_var_init(file, &program, &mut nodes, &mut edges);
        }
        self.collect_provided_edges(&nodes, &program, &mut edges);
        for file in &parsed {
            self.collect_call_edges(file, &program, &mut edges);
        }

        Ok(Extraction { nodes, edges, files_analyzed: parsed.len() })
    }

    /// Pass 1: functions, methods, named types, interfaces, imports.
    fn collect_declarations(
        &self,
        file: &GoFile,
        config: &ResolvedConfig,
        nodes: &mut Vec<Node>,
        seen_ids: &mut HashSet<String>,
        program: &mut GoProgram,
    ) {
        let root = file.tree.root_node();
        let source = &file.source;
        let mut cursor = root.walk();

        for decl in root.children(&mut cursor) {
            match decl.kind() {
                "function_declaration" | "method_declaration" => {
                    if let Some(node) = self.build_function_node(file, decl) {
                        if !seen_ids.insert(node.id.clone()) {
                            continue;
                        }
                        match decl.kind() {
                            "function_declaration" => {
                                program
                                    .funcs_by_file
                                    .insert((file.rel_path.clone(), node.name.clone()), node.id.clone());
                                program
                                    .funcs_by_package
                                    .entry((package_dir(&file.rel_path), node.name.clone()))
                                    .or_insert_with(|| node.id.clone());
                                let ids = program.funcs_by_name.entry(node.name.clone()).or_default();
                                ids.push(node.id.clone());
                                ids.sort();
                                let results = result_type_names(decl, source);
                                if !results.is_empty() {
                                    program.func_results.insert(node.id.clone(), results);
                                }
                            }
                            _ => {
                                let receiver = receiver_type(decl, source).unwrap_or_default();
                                program
                                    .methods
                                    .insert((receiver.clone(), node.name.clone()), node.id.clone());
                                let methods = program.type_methods.entry(receiver).or_default();
                                methods.push((node.name.clone(), node.id.clone()));
                                methods.sort();
                            }
                        }
                        nodes.push(node);
                    }
                }
                "type_declaration" => {
                    let mut tc = decl.walk();
                    for spec in decl.children(&mut tc).filter(|n| n.kind() == "type_spec") {
                        let name = spec
                            .child_by_field_name("name")
                            .map(|n| node_text(n, source).to_string())
                            .unwrap_or_default();
                        if name.is_empty() {
                            continue;
                        }
                        match spec.child_by_field_name("type") {
                            Some(ty) if ty.kind() == "interface_type" => {
                                program.interfaces.insert(name, interface_methods(ty, source));
                            }
                            Some(_) => {
                                program.concrete_types.insert(name);
                            }
                            None => {}
                        }
                    }
                }
                "import_declaration" => {
                    collect_imports(decl, source, file, config, program);
                }
                _ => {}
            }
        }
    }

    fn build_function_node(&self, file: &GoFile, decl: TsNode) -> Option<Node> {
        let source = &file.source;
        let name = node_text(decl.child_by_field_name("name")?, source).to_string();
        let (kind, receiver) = if decl.kind() == "method_declaration" {
            (FunctionKind::Method, receiver_type(decl, source))
        } else {
            (FunctionKind::Function, None)
        };

        let qualified = match &receiver {
            Some(recv) => format!("{}.{}", recv, name),
            None => name.clone(),
        };
        let id = Node::make_id(&file.rel_path, &qualified);

        let visibility = if name.chars().next().is_some_and(|c| c.is_uppercase()) {
            Visibility::Exported
        } else {
            Visibility::Module
        };

        let is_entry = (name == "main" && file.package == "main")
            || name == "init"
            || name.starts_with("Test")
            || name.starts_with("Benchmark")
            || name.starts_with("Example");

        let body = decl.child_by_field_name("body");
        let specs = parameter_specs(decl, source);
        let (parameters, unused_parameters) =
            analyze_parameters(&specs, body, source, ParamLang::Go);

        let start_line = decl.start_position().row as u32 + 1;
        let end_line = decl.end_position().row as u32 + 1;

        Some(Node {
            id: id.clone(),
            name,
            qualified_name: id,
            file_path: file.rel_path.clone(),
            start_line,
            end_line,
            language: Language::Go,
            kind,
            visibility,
            is_entry_point: is_entry,
            parameters,
            unused_parameters,
            package_or_module: Node::package_for(&file.rel_path, &file.package),
            lines_of_code: end_line - start_line + 1,
            status: NodeStatus::Dead,
            color: NodeColor::Red,
            decorators: Vec::new(),
        })
    }

    /// Scan module-level var/const initializers for function references and
    /// synthesize the per-file `__var_init__` entry node.
    fn collect_var_init(
        &self,
        file: &GoFile,
        program: &GoProgram,
        nodes: &mut Vec<Node>,
        edges: &mut Vec<Edge>,
    ) {
        let source = &file.source;
        let root = file.tree.root_node();
        let mut targets: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut cursor = root.walk();
        for decl in root
            .children(&mut cursor)
            .filter(|n| matches!(n.kind(), "var_declaration" | "const_declaration"))
        {
            let mut sc = decl.walk();
            for spec in decl
                .children(&mut sc)
                .filter(|n| matches!(n.kind(), "var_spec" | "const_spec"))
            {
                let value = match spec.child_by_field_name("value") {
                    Some(v) => v,
                    None => continue,
                };
                visit(value, &mut |node| match node.kind() {
                    "identifier" => {
                        let name = node_text(node, source);
                        if is_builtin(name) {
                            return;
                        }
                        // Skip the field side of selectors; those are
                        // resolved through the selector arm.
                        if let Some(id) = program.resolve_function_near(&file.rel_path, name) {
                            if seen.insert(id.to_string()) {
                                targets.push(id.to_string());
                            }
                        }
                    }
                    "selector_expression" => {
                        if let Some(id) = resolve_selector_function(node, source, file, program) {
                            if seen.insert(id.to_string()) {
                                targets.push(id.to_string());
                            }
                        }
                    }
                    _ => {}
                });
            }
        }

        if targets.is_empty() {
            return;
        }

        let id = Node::make_id(&file.rel_path, VAR_INIT_NAME);
        nodes.push(Node {
            id: id.clone(),
            name: VAR_INIT_NAME.to_string(),
            qualified_name: id.clone(),
            file_path: file.rel_path.clone(),
            start_line: 1,
            end_line: 1,
            language: Language::Go,
            kind: FunctionKind::Init,
            visibility: Visibility::Module,
            is_entry_point: true,
            parameters: Vec::new(),
            unused_parameters: Vec::new(),
            package_or_module: Node::package_for(&file.rel_path, &file.package),
            lines_of_code: 1,
            status: NodeStatus::Entry,
            color: NodeColor::Blue,
            decorators: Vec::new(),
        });

        for target in targets {
            edges.push(Edge::resolved(
                id.clone(),
                target,
                CallSite { file_path: file.rel_path.clone(), line: 1, column: 1 },
                EdgeKind::Varinit,
            ));
        }
    }

    /// Constructor fan-out: a free function returning a named type makes the
    /// methods on that type (or on every implementation, for interface
    /// results) reachable.
    fn collect_provided_edges(&self, nodes: &[Node], program: &GoProgram, edges: &mut Vec<Edge>) {
        for (func_id, results) in &program.func_results {
            let decl_site = nodes
                .iter()
                .find(|n| &n.id == func_id)
                .map(|n| CallSite {
                    file_path: n.file_path.clone(),
                    line: n.start_line,
                    column: 1,
                });
            let decl_site = match decl_site {
                Some(s) => s,
                None => continue,
            };

            let mut emit_type = |ty: &str, edges: &mut Vec<Edge>| {
                if let Some(methods) = program.type_methods.get(ty) {
                    for (_, method_id) in methods {
                        if method_id != func_id {
                            edges.push(Edge::resolved(
                                func_id.clone(),
                                method_id.clone(),
                                decl_site.clone(),
                                EdgeKind::Provided,
                            ));
                        }
                    }
                }
            };

            for result in results {
                if program.interfaces.contains_key(result) {
                    for ty in program.implementors(result) {
                        emit_type(ty, edges);
                    }
                } else if program.concrete_types.contains(result) {
                    emit_type(result, edges);
                }
            }
        }
    }

    /// Pass 2: resolve calls and function-value references in bodies.
    fn collect_call_edges(&self, file: &GoFile, program: &GoProgram, edges: &mut Vec<Edge>) {
        let source = &file.source;
        let root = file.tree.root_node();
        let mut cursor = root.walk();

        for decl in root
            .children(&mut cursor)
            .filter(|n| matches!(n.kind(), "function_declaration" | "method_declaration"))
        {
            let body = match decl.child_by_field_name("body") {
                Some(b) => b,
                None => continue,
            };
            let name = match decl.child_by_field_name("name") {
                Some(n) => node_text(n, source).to_string(),
                None => continue,
            };
            let qualified = match receiver_type(decl, source) {
                Some(recv) => format!("{}.{}", recv, name),
                None => name,
            };
            let source_id = Node::make_id(&file.rel_path, &qualified);

            let var_types = infer_local_types(decl, body, source, program);
            let mut seen: HashSet<String> = HashSet::new();
            let mut call_functions: HashSet<usize> = HashSet::new();

            // First sweep: note which nodes sit in call-function position.
            visit(body, &mut |node| {
                if node.kind() == "call_expression" {
                    if let Some(f) = node.child_by_field_name("function") {
                        call_functions.insert(f.id());
                    }
                }
            });

            visit(body, &mut |node| {
                match node.kind() {
                    "call_expression" => {
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
                                if let Some(target) =
                                    program.resolve_function(&file.rel_path, callee)
                                {
                                    if seen.insert(target.to_string()) {
                                        edges.push(Edge::resolved(
                                            source_id.clone(),
                                            target.to_string(),
                                            site(&file.rel_path, node),
                                            EdgeKind::Direct,
                                        ));
                                    }
                                }
                            }
                            "selector_expression" => {
                                self.resolve_selector_call(
                                    func,
                                    node,
                                    source,
                                    file,
                                    program,
                                    &var_types,
                                    &source_id,
                                    &mut seen,
                                    edges,
                                );
                            }
                            _ => {}
                        }
                    }
                    "selector_expression" => {
                        // Method value reference: x.M passed as a value.
                        if call_functions.contains(&node.id()) {
                            return;
                        }
                        if let Some(target) =
                            resolve_method_value(node, source, program, &var_types)
                        {
                            if seen.insert(target.clone()) {
                                edges.push(Edge::resolved(
                                    source_id.clone(),
                                    target,
                                    site(&file.rel_path, node),
                                    EdgeKind::Funcref,
                                ));
                            }
                        }
                    }
                    "identifier" => {
                        // Function value reference: register(myHandler).
                        if call_functions.contains(&node.id()) {
                            return;
                        }
                        let parent_kind = node.parent().map(|p| p.kind()).unwrap_or("");
                        if !matches!(parent_kind, "argument_list" | "expression_list" | "literal_value" | "keyed_element" | "literal_element" | "return_statement") {
                            return;
                        }
                        let name = node_text(node, source);
                        if is_builtin(name) {
                            return;
                        }
                        if let Some(target) = program.resolve_function_near(&file.rel_path, name) {
                            if seen.insert(target.to_string()) {
                                edges.push(Edge::resolved(
                                    source_id.clone(),
                                    target.to_string(),
                                    site(&file.rel_path, node),
                                    EdgeKind::Funcref,
                                ));
                            }
                        }
                    }
                    _ => {}
                }
            });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_selector_call(
        &self,
        selector: TsNode,
        call: TsNode,
        source: &[u8],
        file: &GoFile,
        program: &GoProgram,
        var_types: &HashMap<String, String>,
        source_id: &str,
        seen: &mut HashSet<String>,
        edges: &mut Vec<Edge>,
    ) {
        let field = match selector.child_by_field_name("field") {
            Some(f) => node_text(f, source).to_string(),
            None => return,
        };
        if is_builtin(&field) {
            return;
        }
        let operand = selector.child_by_field_name("operand");
        let operand_name = operand
            .filter(|o| o.kind() == "identifier")
            .map(|o| node_text(o, source).to_string());

        // Package-qualified call: pkg.Func().
        if let Some(ref op) = operand_name {
            if let Some(pkg_dir) = program.imports.get(&file.rel_path).and_then(|m| m.get(op)) {
                if let Some(target) = program
                    .funcs_by_package
                    .get(&(pkg_dir.clone(), field.clone()))
                {
                    if seen.insert(target.clone()) {
                        edges.push(Edge::resolved(
                            source_id.to_string(),
                            target.clone(),
                            site(&file.rel_path, call),
                            EdgeKind::Direct,
                        ));
                    }
                    return;
                }
                return; // in-project package but unknown function
            }
        }

        // Receiver with a known local type.
        if let Some(recv_type) = operand_name.as_ref().and_then(|op| var_types.get(op)) {
            if program.interfaces.contains_key(recv_type) {
                // Interface dispatch: fan out to every implementation.
                for ty in program.implementors(recv_type) {
                    if let Some(target) = program.methods.get(&(ty.to_string(), field.clone())) {
                        if seen.insert(target.clone()) {
                            edges.push(Edge::resolved(
                                source_id.to_string(),
                                target.clone(),
                                site(&file.rel_path, call),
                                EdgeKind::Interface,
                            ));
                        }
                    }
                }
                return;
            }
            if let Some(target) = program.methods.get(&(recv_type.clone(), field.clone())) {
                if seen.insert(target.clone()) {
                    edges.push(Edge::resolved(
                        source_id.to_string(),
                        target.clone(),
                        site(&file.rel_path, call),
                        EdgeKind::Method,
                    ));
                }
                return;
            }
            return;
        }

        // Unknown receiver: best-effort by method name, first in id order.
        if let Some(target) = program
            .type_methods
            .values()
            .flatten()
            .filter(|(name, _)| *name == field)
            .map(|(_, id)| id)
            .min()
        {
            if seen.insert(target.clone()) {
                edges.push(Edge::resolved(
                    source_id.to_string(),
                    target.clone(),
                    site(&file.rel_path, call),
                    EdgeKind::Method,
                ));
            }
        }
    }
}

/// Extract the package name from the package clause.
fn package_name(tree: &tree_sitter::Tree, source: &[u8]) -> Option<String> {
    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "package_clause" {
            let mut pc = child.walk();
            for inner in child.children(&mut pc) {
                if inner.kind() == "package_identifier" {
                    return Some(node_text(inner, source).to_string());
                }
            }
        }
    }
    None
}

/// Receiver type name for a method declaration (pointer stripped).
fn receiver_type(decl: TsNode, source: &[u8]) -> Option<String> {
    let receiver = decl.child_by_field_name("receiver")?;
    let mut cursor = receiver.walk();
    for param in receiver.children(&mut cursor) {
        if param.kind() == "parameter_declaration" {
            if let Some(ty) = param.child_by_field_name("type") {
                return Some(bare_type_name(node_text(ty, source)));
            }
        }
    }
    None
}

/// Parameter specs for a function or method declaration.
fn parameter_specs(decl: TsNode, source: &[u8]) -> Vec<ParamSpec> {
    let mut specs = Vec::new();
    let params = match decl.child_by_field_name("parameters") {
        Some(p) => p,
        None => return specs,
    };
    let mut cursor = params.walk();
    for param in params.children(&mut cursor) {
        if !matches!(param.kind(), "parameter_declaration" | "variadic_parameter_declaration") {
            continue;
        }
        let type_text = param
            .child_by_field_name("type")
            .map(|t| node_text(t, source).to_string());
        let mut names = Vec::new();
        let mut pc = param.walk();
        for name_node in param.children_by_field_name("name", &mut pc) {
            names.push(node_text(name_node, source).to_string());
        }
        if names.is_empty() {
            // Anonymous parameter: recorded as "_", always used.
            specs.push(ParamSpec::receiver("_"));
            continue;
        }
        for name in names {
            if name == "_" {
                specs.push(ParamSpec::receiver("_"));
            } else {
                specs.push(ParamSpec::simple(name, type_text.clone()));
            }
        }
    }
    specs
}

/// Bare names of a function's declared result types.
fn result_type_names(decl: TsNode, source: &[u8]) -> Vec<String> {
    let result = match decl.child_by_field_name("result") {
        Some(r) => r,
        None => return Vec::new(),
    };
    let mut names = Vec::new();
    if result.kind() == "parameter_list" {
        let mut cursor = result.walk();
        for param in result.children(&mut cursor) {
            if param.kind() == "parameter_declaration" {
                if let Some(ty) = param.child_by_field_name("type") {
                    names.push(bare_type_name(node_text(ty, source)));
                }
            }
        }
    } else {
        names.push(bare_type_name(node_text(result, source)));
    }
    names.retain(|n| !n.is_empty() && n != "error");
    names
}

/// Method names declared by an interface type.
fn interface_methods(interface: TsNode, source: &[u8]) -> Vec<String> {
    let mut methods = Vec::new();
    visit(interface, &mut |node| {
        if matches!(node.kind(), "method_elem" | "method_spec") {
            if let Some(name) = node.child_by_field_name("name") {
                methods.push(node_text(name, source).to_string());
            }
        }
    });
    methods.sort();
    methods.dedup();
    methods
}

/// Record import aliases that point at in-project packages.
fn collect_imports(
    decl: TsNode,
    source: &[u8],
    file: &GoFile,
    config: &ResolvedConfig,
    program: &mut GoProgram,
) {
    let mut specs = Vec::new();
    visit(decl, &mut |node| {
        if node.kind() == "import_spec" {
            specs.push(node);
        }
    });
    let module_prefix = config.go.module.as_deref();

    // Borrow the dirs up front; the alias map is the only mutation below.
    let dirs: Vec<String> = program.package_dirs.iter().cloned().collect();

    for spec in specs {
        let path = match spec.child_by_field_name("path") {
            Some(p) => node_text(p, source).trim_matches('"').to_string(),
            None => continue,
        };
        let alias = spec
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(&path).to_string());
        if alias == "_" || alias == "." {
            continue;
        }

        // Module-prefixed paths map directly onto project directories.
        let dir = if let Some(prefix) = module_prefix {
            path.strip_prefix(prefix)
                .map(|rest| rest.trim_start_matches('/').to_string())
                .filter(|d| dirs.iter().any(|known| known == d))
        } else {
            // Without a module name, match by path suffix.
            dirs.iter()
                .find(|known| !known.is_empty() && path.ends_with(known.as_str()))
                .cloned()
        };

        if let Some(dir) = dir {
            program
                .imports
                .entry(file.rel_path.clone())
                .or_default()
                .insert(alias, dir);
        }
    }
}

/// Resolve a selector expression in a var-init context to a free function.
fn resolve_selector_function(
    selector: TsNode,
    source: &[u8],
    file: &GoFile,
    program: &GoProgram,
) -> Option<String> {
    let operand = selector.child_by_field_name("operand")?;
    if operand.kind() != "identifier" {
        return None;
    }
    let alias = node_text(operand, source);
    let field = node_text(selector.child_by_field_name("field")?, source);
    let pkg_dir = program.imports.get(&file.rel_path)?.get(alias)?;
    program
        .funcs_by_package
        .get(&(pkg_dir.clone(), field.to_string()))
        .cloned()
}

/// Resolve a method value reference (`x.M` outside call position).
fn resolve_method_value(
    selector: TsNode,
    source: &[u8],
    program: &GoProgram,
    var_types: &HashMap<String, String>,
) -> Option<String> {
    let operand = selector.child_by_field_name("operand")?;
    if operand.kind() != "identifier" {
        return None;
    }
    let recv = node_text(operand, source);
    let field = node_text(selector.child_by_field_name("field")?, source);
    let recv_type = var_types.get(recv)?;
    program.methods.get(&(recv_type.clone(), field.to_string())).cloned()
}

/// Best-effort local variable typing: declared types, composite literals,
/// and known constructor results.
fn infer_local_types(
    decl: TsNode,
    body: TsNode,
    source: &[u8],
    program: &GoProgram,
) -> HashMap<String, String> {
    let mut types = HashMap::new();

    // Parameter and receiver types from the signature.
    for holder in ["receiver", "parameters"] {
        if let Some(list) = decl.child_by_field_name(holder) {
            let mut cursor = list.walk();
            for param in list.children(&mut cursor) {
                if !matches!(param.kind(), "parameter_declaration" | "variadic_parameter_declaration") {
                    continue;
                }
                let ty = match param.child_by_field_name("type") {
                    Some(t) => bare_type_name(node_text(t, source)),
                    None => continue,
                };
                let mut pc = param.walk();
                for name in param.children_by_field_name("name", &mut pc) {
                    types.insert(node_text(name, source).to_string(), ty.clone());
                }
            }
        }
    }

    visit(body, &mut |node| match node.kind() {
        "var_declaration" => {
            let mut cursor = node.walk();
            for spec in node.children(&mut cursor).filter(|n| n.kind() == "var_spec") {
                let declared = spec
                    .child_by_field_name("type")
                    .map(|t| bare_type_name(node_text(t, source)));
                let inferred = declared.or_else(|| {
                    spec.child_by_field_name("value")
                        .and_then(|v| first_expression(v))
                        .and_then(|e| infer_expr_type(e, source, program))
                });
                if let Some(ty) = inferred {
                    let mut sc = spec.walk();
                    for name in spec.children_by_field_name("name", &mut sc) {
                        types.insert(node_text(name, source).to_string(), ty.clone());
                    }
                }
            }
        }
        "short_var_declaration" => {
            let left = node.child_by_field_name("left");
            let right = node.child_by_field_name("right");
            if let (Some(left), Some(right)) = (left, right) {
                let mut lc = left.walk();
                let mut rc = right.walk();
                let names: Vec<_> = left
                    .children(&mut lc)
                    .filter(|n| n.kind() == "identifier")
                    .collect();
                let values: Vec<_> = right
                    .children(&mut rc)
                    .filter(|n| n.is_named())
                    .collect();
                if names.len() == values.len() {
                    for (name, value) in names.iter().zip(values.iter()) {
                        if let Some(ty) = infer_expr_type(*value, source, program) {
                            types.insert(node_text(*name, source).to_string(), ty);
                        }
                    }
                } else if names.len() == 1 && !values.is_empty() {
                    if let Some(ty) = infer_expr_type(values[0], source, program) {
                        types.insert(node_text(names[0], source).to_string(), ty);
                    }
                }
            }
        }
        _ => {}
    });

    types
}

fn first_expression(list: TsNode) -> Option<TsNode> {
    if list.kind() != "expression_list" {
        return Some(list);
    }
    let mut cursor = list.walk();
    let children: Vec<_> = list.children(&mut cursor).filter(|n| n.is_named()).collect();
    children.first().copied()
}

/// Infer the bare named type of an initializer expression.
fn infer_expr_type(expr: TsNode, source: &[u8], program: &GoProgram) -> Option<String> {
    match expr.kind() {
        "composite_literal" => expr
            .child_by_field_name("type")
            .map(|t| bare_type_name(node_text(t, source))),
        "unary_expression" => {
            let operand = expr.child_by_field_name("operand")?;
            infer_expr_type(operand, source, program)
        }
        "call_expression" => {
            let func = expr.child_by_field_name("function")?;
            if func.kind() != "identifier" {
                return None;
            }
            let name = node_text(func, source);
            // Only constructor results of in-project functions count.
            let ids = program.funcs_by_name.get(name)?;
            let id = ids.first()?;
            program
                .func_results
                .get(id)
                .and_then(|results| {
                    results.iter().find(|r| {
                        program.concrete_types.contains(*r) || program.interfaces.contains_key(*r)
                    })
                })
                .cloned()
        }
        _ => None,
    }
}
