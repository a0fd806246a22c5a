//! CodeGraph - static call-graph analysis with liveness annotation.
//!
//! CodeGraph ingests a source tree written in TypeScript, Go, or Python,
//! extracts every function-like unit and every statically resolvable call
//! between units, and emits a single self-describing graph artifact
//! annotated with liveness (reachable from declared entry points) and
//! per-parameter usage.
//!
//! # Architecture
//!
//! ```text
//! ResolvedConfig → FileDiscovery → LanguageExtractor → EntryPointMatcher
//!                                        ↓                    ↓
//!                                 (nodes, edges)      ReachabilityEngine
//!                                                             ↓
//!                        ClusterBuilder → StatsAggregator → GraphAssembler
//!                                                             ↓
//!                                                  CodeGraph artifact (JSON)
//! ```
//!
//! - `discovery`: include/exclude glob expansion over the project tree
//! - `extract`: per-language tree-sitter extractors behind one trait
//! - `entrypoints`: matcher rules and per-language auto-detection
//! - `reachability`: entry-set BFS liveness classification
//! - `clusters` / `stats`: directory clustering and summary statistics
//! - `assemble`: pipeline orchestration and invariant enforcement
//! - `codec`: versioned artifact (de)serialization
//!
//! # Adding a New Language
//!
//! Implement `LanguageExtractor` in `src/extract/` and register it in
//! `extract::extractor_for`. See `extract/go.rs` for a reference
//! implementation.

pub mod assemble;
pub mod cli;
pub mod clusters;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod entrypoints;
pub mod error;
pub mod extract;
pub mod model;
pub mod reachability;
pub mod stats;

pub use assemble::{verify_invariants, GraphAssembler};
pub use codec::{from_json, read_artifact, to_json, write_artifact, GraphUpdate, SCHEMA_VERSION};
pub use config::{EntryPointRule, ResolvedConfig};
pub use diagnostics::{CancelToken, Diagnostic, DiagnosticCode, DiagnosticSink};
pub use error::AnalysisError;
pub use extract::{extractor_for, ExtractContext, Extraction, LanguageExtractor};
pub use model::{
    CodeGraph, Edge, EdgeKind, FunctionKind, Language, Node, NodeColor, NodeStatus, Visibility,
};
