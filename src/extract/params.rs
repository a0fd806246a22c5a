//! Unused-parameter analysis: a pure body walk shared by all extractors.
//!
//! Rules:
//! 1. A name beginning with `_` is always considered used.
//! 2. A declaration without a body (interface/abstract) marks everything used.
//! 3. A simple parameter is used iff an identifier with the same text
//!    appears in the body in a non-declaring position. The right-hand side
//!    of a member access does not count.
//! 4. Destructured patterns evaluate each inner binding independently and
//!    report each unused binding by its source name.
//! 5. Rest bindings evaluate their bare name as in (3).

use tree_sitter::Node as TsNode;

use crate::model::Parameter;

/// Language-specific identifier rules for the body walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLang {
    Typescript,
    Go,
    Python,
}

/// Shape of a declared parameter binding.
#[derive(Debug, Clone)]
pub enum BindingPattern {
    /// `p`
    Simple(String),
    /// `{a, b}` / `[x, y]`: the parameter is named by the pattern's source
    /// text; inner bindings are evaluated individually.
    Destructured { text: String, bindings: Vec<String> },
    /// `...args` / `*args` / `**kwargs`
    Rest(String),
}

/// One declared parameter prior to usage analysis.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub pattern: BindingPattern,
    pub type_annotation: Option<String>,
    /// Receivers (`self`, `cls`) and other always-used bindings.
    pub force_used: bool,
}

impl ParamSpec {
    pub fn simple(name: impl Into<String>, type_annotation: Option<String>) -> Self {
        Self {
            pattern: BindingPattern::Simple(name.into()),
            type_annotation,
            force_used: false,
        }
    }

    pub fn receiver(name: impl Into<String>) -> Self {
        Self {
            pattern: BindingPattern::Simple(name.into()),
            type_annotation: None,
            force_used: true,
        }
    }
}

/// Run the analysis for a node's parameter list against its body.
///
/// Returns the parameter list (positions dense from 0) and the ordered
/// names of unused bindings.
pub fn analyze_parameters(
    specs: &[ParamSpec],
    body: Option<TsNode>,
    source: &[u8],
    lang: ParamLang,
) -> (Vec<Parameter>, Vec<String>) {
    let mut parameters = Vec::with_capacity(specs.len());
    let mut unused = Vec::new();

    for (position, spec) in specs.iter().enumerate() {
        let (name, is_used) = match &spec.pattern {
            BindingPattern::Simple(name) | BindingPattern::Rest(name) => {
                let used = spec.force_used || binding_is_used(name, body, source, lang);
                if !used {
                    unused.push(name.clone());
                }
                (name.clone(), used)
            }
            BindingPattern::Destructured { text, bindings } => {
                let mut all_used = true;
                for binding in bindings {
                    if spec.force_used || binding_is_used(binding, body, source, lang) {
                        continue;
                    }
                    all_used = false;
                    unused.push(binding.clone());
                }
                (text.clone(), all_used)
            }
        };

        parameters.push(Parameter {
            name,
            type_annotation: spec.type_annotation.clone(),
            is_used,
            position,
        });
    }

    (parameters, unused)
}

/// Decide whether a single binding name is used.
fn binding_is_used(name: &str, body: Option<TsNode>, source: &[u8], lang: ParamLang) -> bool {
    if name.starts_with('_') || name.is_empty() {
        return true;
    }
    let body = match body {
        Some(b) => b,
        None => return true, // no body: interface method / abstract
    };
    identifier_appears(body, source, name, lang)
}

/// Walk the body looking for a counting appearance of `name`.
fn identifier_appears(body: TsNode, source: &[u8], name: &str, lang: ParamLang) -> bool {
    let mut cursor = body.walk();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if is_counting_identifier(node, source, name, lang) {
            return true;
        }
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    false
}

fn is_counting_identifier(node: TsNode, source: &[u8], name: &str, lang: ParamLang) -> bool {
    let kind = node.kind();
    let is_ident = match lang {
        // Shorthand object properties ({p}) read the binding.
        ParamLang::Typescript => kind == "identifier" || kind == "shorthand_property_identifier",
        ParamLang::Go => kind == "identifier",
        ParamLang::Python => kind == "identifier",
    };
    if !is_ident {
        return false;
    }
    if node.utf8_text(source).unwrap_or("") != name {
        return false;
    }
    let parent = match node.parent() {
        Some(p) => p,
        None => return true,
    };
    // The right-hand side of a member access never counts. For TypeScript
    // and Go the grammar already types those as property/field identifiers,
    // but Python attributes reuse `identifier`.
    if lang == ParamLang::Python
        && parent.kind() == "attribute"
        && parent.child_by_field_name("attribute") == Some(node)
    {
        return false;
    }
    // Keyword-argument names (f(x=1)) are labels, not reads.
    if lang == ParamLang::Python
        && parent.kind() == "keyword_argument"
        && parent.child_by_field_name("name") == Some(node)
    {
        return false;
    }
    // Declaring positions inside nested scopes do not count as uses.
    match parent.kind() {
        "variable_declarator" | "function_declaration" | "method_definition" | "class_declaration" => {
            parent.child_by_field_name("name") != Some(node)
        }
        "parameter_declaration" | "required_parameter" | "optional_parameter" => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse_ts(source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    fn first_body<'a>(tree: &'a tree_sitter::Tree, source: &str) -> TsNode<'a> {
        // Find the first statement_block in the tree.
        let mut stack = vec![tree.root_node()];
        let mut cursor = tree.root_node().walk();
        while let Some(node) = stack.pop() {
            if node.kind() == "statement_block" {
                return node;
            }
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
        panic!("no body in {:?}", source);
    }

    #[test]
    fn test_underscore_always_used() {
        let source = "function f(data, _options) { return 1; }";
        let tree = parse_ts(source);
        let body = first_body(&tree, source);
        let specs = vec![ParamSpec::simple("data", None), ParamSpec::simple("_options", None)];
        let (params, unused) =
            analyze_parameters(&specs, Some(body), source.as_bytes(), ParamLang::Typescript);
        assert!(!params[0].is_used);
        assert!(params[1].is_used);
        assert_eq!(unused, vec!["data".to_string()]);
    }

    #[test]
    fn test_member_property_does_not_count() {
        // `config` only appears as the property side of `obj.config`.
        let source = "function f(config) { return obj.config; }";
        let tree = parse_ts(source);
        let body = first_body(&tree, source);
        let specs = vec![ParamSpec::simple("config", None)];
        let (params, unused) =
            analyze_parameters(&specs, Some(body), source.as_bytes(), ParamLang::Typescript);
        assert!(!params[0].is_used);
        assert_eq!(unused, vec!["config".to_string()]);
    }

    #[test]
    fn test_destructured_partial_use() {
        let source = "function f({a, b}) { return a; }";
        let tree = parse_ts(source);
        let body = first_body(&tree, source);
        let specs = vec![ParamSpec {
            pattern: BindingPattern::Destructured {
                text: "{a, b}".into(),
                bindings: vec!["a".into(), "b".into()],
            },
            type_annotation: None,
            force_used: false,
        }];
        let (params, unused) =
            analyze_parameters(&specs, Some(body), source.as_bytes(), ParamLang::Typescript);
        assert_eq!(params[0].name, "{a, b}");
        assert!(!params[0].is_used);
        assert_eq!(unused, vec!["b".to_string()]);
    }

    #[test]
    fn test_no_body_assumes_used() {
        let specs = vec![ParamSpec::simple("x", Some("number".into()))];
        let (params, unused) = analyze_parameters(&specs, None, b"", ParamLang::Typescript);
        assert!(params[0].is_used);
        assert!(unused.is_empty());
    }

    #[test]
    fn test_shorthand_property_counts_as_use() {
        let source = "function f(port) { return {port}; }";
        let tree = parse_ts(source);
        let body = first_body(&tree, source);
        let specs = vec![ParamSpec::simple("port", None)];
        let (params, unused) =
            analyze_parameters(&specs, Some(body), source.as_bytes(), ParamLang::Typescript);
        assert!(params[0].is_used);
        assert!(unused.is_empty());
    }

    #[test]
    fn test_rest_binding() {
        let source = "function f(...args) { return args.length; }";
        let tree = parse_ts(source);
        let body = first_body(&tree, source);
        let specs = vec![ParamSpec {
            pattern: BindingPattern::Rest("args".into()),
            type_annotation: None,
            force_used: false,
        }];
        let (params, unused) =
            analyze_parameters(&specs, Some(body), source.as_bytes(), ParamLang::Typescript);
        assert!(params[0].is_used);
        assert!(unused.is_empty());
    }
}
