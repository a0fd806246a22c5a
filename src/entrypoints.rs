//! Entry-point matcher: classify nodes against configured rules and
//! per-language auto-detection.

use globset::Glob;

use crate::config::{EntryPointRule, ResolvedConfig};
use crate::diagnostics::{DiagnosticCode, DiagnosticSink};
use crate::model::{Language, Node, Visibility};

/// A rule compiled for matching. Invalid globs are dropped with a
/// diagnostic when the matcher is built; matching continues.
enum CompiledRule {
    File(globset::GlobMatcher),
    Function(String),
    Decorator(String),
    Export(globset::GlobMatcher),
}

/// Matches nodes against configured entry-point rules plus auto-detection.
pub struct EntryPointMatcher {
    rules: Vec<CompiledRule>,
    language: Language,
}

impl EntryPointMatcher {
    /// Compile the configuration's rules. Malformed globs produce a
    /// `MatcherGlobInvalid` diagnostic and are skipped.
    pub fn new(config: &ResolvedConfig, sink: &DiagnosticSink) -> Self {
        let mut rules = Vec::new();
        for rule in &config.entry_points {
            match rule {
                EntryPointRule::File(pattern) => match Glob::new(pattern) {
                    Ok(glob) => rules.push(CompiledRule::File(glob.compile_matcher())),
                    Err(e) => sink.warn(
                        DiagnosticCode::MatcherGlobInvalid,
                        format!("dropping file rule {:?}: {}", pattern, e),
                    ),
                },
                EntryPointRule::Export(pattern) => match Glob::new(pattern) {
                    Ok(glob) => rules.push(CompiledRule::Export(glob.compile_matcher())),
                    Err(e) => sink.warn(
                        DiagnosticCode::MatcherGlobInvalid,
                        format!("dropping export rule {:?}: {}", pattern, e),
                    ),
                },
                EntryPointRule::Function(name) => {
                    rules.push(CompiledRule::Function(name.clone()))
                }
                EntryPointRule::Decorator(name) => {
                    rules.push(CompiledRule::Decorator(name.clone()))
                }
            }
        }
        Self { rules, language: config.language }
    }

    /// Mark matching nodes and return the entry id set in node order.
    pub fn apply(&self, nodes: &mut [Node]) -> Vec<String> {
        let mut entry_ids = Vec::new();
        for node in nodes.iter_mut() {
            if self.matches(node) || self.auto_detected(node) || node.is_entry_point {
                node.is_entry_point = true;
                entry_ids.push(node.id.clone());
            }
        }
        entry_ids
    }

    fn matches(&self, node: &Node) -> bool {
        self.rules.iter().any(|rule| match rule {
            CompiledRule::File(glob) | CompiledRule::Export(glob) => {
                node.visibility == Visibility::Exported && glob.is_match(&node.file_path)
            }
            CompiledRule::Function(name) => {
                node.name == *name || node.qualified_name == *name || node.id == *name
            }
            CompiledRule::Decorator(name) => node
                .decorators
                .iter()
                .any(|d| d == name || d.contains(name.as_str())),
        })
    }

    /// Language auto-detection, applied in addition to configured rules.
    ///
    /// Go auto-entries (`main` in package main, `init`, test functions) need
    /// package context the matcher does not have; the Go extractor tags them
    /// and the union with `is_entry_point` in `apply` picks them up. A name
    /// check here would re-promote `func main` in non-main packages.
    fn auto_detected(&self, node: &Node) -> bool {
        match self.language {
            Language::Python => node.name == "__main__",
            Language::Go | Language::Typescript => false,
        }
    }
}
