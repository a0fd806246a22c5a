//! Language extractors and their shared contracts.
//!
//! Each extractor parses the project's files, emits one node per
//! function-like declaration, and resolves statically analyzable calls and
//! function-value references into edges. Cross-file resolution is two-pass:
//! pass 1 enumerates declarations and builds symbol/alias tables, pass 2
//! walks bodies and resolves against them.
//!
//! # Adding a New Language
//!
//! Implement `LanguageExtractor` in a new module and register it in
//! `extractor_for`. See `go.rs` for a reference implementation.

mod go;
mod helper;
mod params;
mod python;
mod symbols;
mod typescript;

pub use go::GoExtractor;
pub use helper::{run_helper, HelperRequest, HelperResponse, GO_HELPER_TIMEOUT, PY_HELPER_TIMEOUT};
pub use params::{analyze_parameters, BindingPattern, ParamLang, ParamSpec};
pub use python::PythonExtractor;
pub use symbols::SymbolTable;
pub use typescript::TypescriptExtractor;

use once_cell::sync::OnceCell;

use crate::config::ResolvedConfig;
use crate::diagnostics::{CancelToken, DiagnosticSink};
use crate::model::{Edge, Language, Node};

/// Raw output of an extractor run, prior to entry matching and propagation.
#[derive(Debug, Default)]
pub struct Extraction {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub files_analyzed: usize,
}

/// Shared services passed into each extractor.
#[derive(Clone)]
pub struct ExtractContext {
    pub sink: DiagnosticSink,
    pub cancel: CancelToken,
}

impl ExtractContext {
    pub fn new(sink: DiagnosticSink, cancel: CancelToken) -> Self {
        Self { sink, cancel }
    }
}

/// Per-language analysis front end.
///
/// # Thread Safety
///
/// `tree_sitter::Parser` is not `Sync`, so implementations create parsers
/// per worker instead of holding one.
pub trait LanguageExtractor: Send + Sync {
    /// The language this extractor handles.
    fn language(&self) -> Language;

    /// Parse the given project-relative files and produce nodes and edges.
    ///
    /// Per-file parse failures are reported through the context's sink and
    /// skipped; cancellation is honored at file granularity.
    fn extract(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        ctx: &ExtractContext,
    ) -> anyhow::Result<Extraction>;
}

static TYPESCRIPT: OnceCell<TypescriptExtractor> = OnceCell::new();
static GO: OnceCell<GoExtractor> = OnceCell::new();
static PYTHON: OnceCell<PythonExtractor> = OnceCell::new();

/// Get the extractor for a language. Extractors are created lazily and
/// reused for the process lifetime.
pub fn extractor_for(language: Language) -> &'static dyn LanguageExtractor {
    match language {
        Language::Typescript => TYPESCRIPT.get_or_init(TypescriptExtractor::new),
        Language::Go => GO.get_or_init(GoExtractor::new),
        Language::Python => PYTHON.get_or_init(PythonExtractor::new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_returns_matching_language() {
        assert_eq!(extractor_for(Language::Go).language(), Language::Go);
        assert_eq!(extractor_for(Language::Typescript).language(), Language::Typescript);
        assert_eq!(extractor_for(Language::Python).language(), Language::Python);
    }
}
