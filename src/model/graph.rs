//! The assembled graph artifact.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ResolvedConfig;
use crate::diagnostics::Diagnostic;

use super::{Edge, Language, Node};

/// Fixed id of the virtual entry node.
pub const ENTRY_NODE_ID: &str = "__entry__";

/// Virtual root representing external callers of the entry-point set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryNode {
    pub id: String,
    pub name: String,
    pub targets: Vec<String>,
}

impl EntryNode {
    pub fn new(mut targets: Vec<String>) -> Self {
        targets.sort();
        Self {
            id: ENTRY_NODE_ID.to_string(),
            name: "External Callers".to_string(),
            targets,
        }
    }
}

/// A directory-derived grouping of nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub label: String,
    pub node_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Count/percentage pair with a per-package histogram.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatBlock {
    pub count: usize,
    /// Percentage of the node total, rounded to two decimals.
    pub percentage: f64,
    pub by_package: BTreeMap<String, usize>,
}

/// Entry-point summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPointStats {
    pub count: usize,
    /// Entry ids in insertion order.
    pub ids: Vec<String>,
}

/// One row of the largest-function ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargestFunction {
    pub id: String,
    pub name: String,
    pub lines_of_code: u32,
}

/// Aggregated summary statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub dead_functions: StatBlock,
    pub unused_parameters: StatBlock,
    pub entry_points: EntryPointStats,
    pub largest_functions: Vec<LargestFunction>,
}

/// Artifact metadata. `version` is the schema compatibility key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub version: String,
    /// ISO-8601 UTC timestamp.
    pub generated_at: String,
    pub language: Language,
    pub project_root: String,
    pub analysis_time_ms: u64,
    pub total_files: usize,
    pub total_functions: usize,
    pub total_edges: usize,
    pub total_dead_functions: usize,
    pub total_unused_parameters: usize,
    pub config: ResolvedConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// The complete analysis artifact. The sole output of the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeGraph {
    pub metadata: Metadata,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub entry_node: EntryNode,
    pub clusters: Vec<Cluster>,
    pub stats: Stats,
}

impl CodeGraph {
    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
