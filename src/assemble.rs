//! Graph assembler: sequences discovery, extraction, entry matching,
//! reachability, clustering, and stats into the final artifact.
//!
//! After assembly the artifact invariants are re-asserted as a last line of
//! defense; a violation is an internal bug and fails the run.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};

use crate::clusters::build_clusters;
use crate::codec::SCHEMA_VERSION;
use crate::config::ResolvedConfig;
use crate::diagnostics::{CancelToken, DiagnosticSink};
use crate::discovery::discover_files;
use crate::entrypoints::EntryPointMatcher;
use crate::error::AnalysisError;
use crate::extract::{extractor_for, ExtractContext};
use crate::model::{
    is_dynamic_target, CodeGraph, EntryNode, Metadata, NodeColor, NodeStatus,
};
use crate::reachability::propagate;
use crate::stats::aggregate;

/// Orchestrates one analysis run.
pub struct GraphAssembler {
    config: ResolvedConfig,
    sink: DiagnosticSink,
    cancel: CancelToken,
}

impl GraphAssembler {
    /// Validate the configuration and prepare a run.
    pub fn new(config: ResolvedConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            config,
            sink: DiagnosticSink::new(),
            cancel: CancelToken::new(),
        })
    }

    /// The diagnostics sink for this run.
    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    /// Token the driver can use to cancel extraction at file granularity.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the full pipeline and produce the artifact.
    pub fn assemble(&self) -> Result<CodeGraph, AnalysisError> {
        let started = Instant::now();

        let files = discover_files(&self.config, &self.sink);

        // An empty discovery result is non-fatal: emit an empty artifact.
        let extraction = if files.is_empty() {
            crate::extract::Extraction::default()
        } else {
            let extractor = extractor_for(self.config.language);
            let ctx = ExtractContext::new(self.sink.clone(), self.cancel.clone());
            extractor
                .extract(&self.config, &files, &ctx)
                .map_err(|e| match e.downcast::<AnalysisError>() {
                    Ok(fatal) => fatal,
                    Err(other) => AnalysisError::ConfigInvalid(other.to_string()),
                })?
        };

        let mut nodes = extraction.nodes;
        let mut edges = extraction.edges;

        // Re-filter by the configured file set: typed loaders may discover
        // files the exclude patterns could not stop.
        let file_set: HashSet<&str> = files.iter().map(|s| s.as_str()).collect();
        nodes.retain(|n| file_set.contains(n.file_path.as_str()));
        let node_ids: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
        edges.retain(|e| {
            node_ids.contains(&e.source)
                && (node_ids.contains(&e.target) || is_dynamic_target(&e.target))
        });

        // Entry matching, then liveness.
        let matcher = EntryPointMatcher::new(&self.config, &self.sink);
        let entry_ids = matcher.apply(&mut nodes);
        propagate(&mut nodes, &edges, &entry_ids);

        let clusters = build_clusters(&nodes);
        let stats = aggregate(&nodes, &entry_ids);

        // Determinism ordering before serialization.
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        edges.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        let entry_node = EntryNode::new(entry_ids);

        // Diagnostics may arrive from parallel workers in any order.
        let mut diagnostics = self.sink.snapshot();
        diagnostics.sort_by(|a, b| {
            (a.code.as_str(), &a.file, &a.message).cmp(&(b.code.as_str(), &b.file, &b.message))
        });

        let metadata = Metadata {
            version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            language: self.config.language,
            project_root: self.config.project_root.display().to_string(),
            analysis_time_ms: started.elapsed().as_millis() as u64,
            total_files: extraction.files_analyzed,
            total_functions: nodes.len(),
            total_edges: edges.len(),
            total_dead_functions: stats.dead_functions.count,
            total_unused_parameters: stats.unused_parameters.count,
            config: self.config.clone(),
            diagnostics,
        };

        let graph = CodeGraph { metadata, nodes, edges, entry_node, clusters, stats };
        verify_invariants(&graph)?;
        Ok(graph)
    }
}

/// Re-assert the artifact invariants. A failure here is an internal bug.
pub fn verify_invariants(graph: &CodeGraph) -> Result<(), AnalysisError> {
    let mut ids = HashSet::new();
    for node in &graph.nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(AnalysisError::InvariantViolated(format!(
                "duplicate node id {}",
                node.id
            )));
        }
        if node.end_line < node.start_line {
            return Err(AnalysisError::InvariantViolated(format!(
                "{}: endLine < startLine",
                node.id
            )));
        }
        if node.lines_of_code != node.end_line - node.start_line + 1 {
            return Err(AnalysisError::InvariantViolated(format!(
                "{}: linesOfCode mismatch",
                node.id
            )));
        }
        if (node.status == NodeStatus::Entry) != node.is_entry_point {
            return Err(AnalysisError::InvariantViolated(format!(
                "{}: entry status/flag mismatch",
                node.id
            )));
        }
        let expected = NodeColor::derive(node.status, !node.unused_parameters.is_empty());
        if node.color != expected {
            return Err(AnalysisError::InvariantViolated(format!(
                "{}: color {:?} does not match status {:?}",
                node.id, node.color, node.status
            )));
        }
    }

    for edge in &graph.edges {
        if !ids.contains(edge.source.as_str()) {
            return Err(AnalysisError::InvariantViolated(format!(
                "edge source {} is not a node",
                edge.source
            )));
        }
        let dynamic = is_dynamic_target(&edge.target);
        if dynamic == edge.is_resolved {
            return Err(AnalysisError::InvariantViolated(format!(
                "edge {} -> {}: isResolved inconsistent with target",
                edge.source, edge.target
            )));
        }
        if !dynamic && !ids.contains(edge.target.as_str()) {
            return Err(AnalysisError::InvariantViolated(format!(
                "edge target {} is not a node",
                edge.target
            )));
        }
    }

    // Cluster coverage: every node in exactly one cluster; parents exist.
    let mut membership: HashMap<&str, usize> = HashMap::new();
    let cluster_ids: HashSet<&str> = graph.clusters.iter().map(|c| c.id.as_str()).collect();
    for cluster in &graph.clusters {
        for node_id in &cluster.node_ids {
            *membership.entry(node_id.as_str()).or_default() += 1;
        }
        if let Some(parent) = &cluster.parent {
            if !cluster_ids.contains(parent.as_str()) {
                return Err(AnalysisError::InvariantViolated(format!(
                    "cluster {} has dangling parent {}",
                    cluster.id, parent
                )));
            }
        }
    }
    for node in &graph.nodes {
        if membership.get(node.id.as_str()) != Some(&1) {
            return Err(AnalysisError::InvariantViolated(format!(
                "node {} not in exactly one cluster",
                node.id
            )));
        }
    }

    // Stats agree with the node list.
    let dead = graph.nodes.iter().filter(|n| n.status == NodeStatus::Dead).count();
    if graph.stats.dead_functions.count != dead {
        return Err(AnalysisError::InvariantViolated("dead function count mismatch".into()));
    }
    let unused = graph
        .nodes
        .iter()
        .filter(|n| !n.unused_parameters.is_empty())
        .count();
    if graph.stats.unused_parameters.count != unused {
        return Err(AnalysisError::InvariantViolated("unused parameter count mismatch".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Language;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_empty_project_yields_empty_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = ResolvedConfig::for_project(Language::Go, dir.path());
        let assembler = GraphAssembler::new(config).unwrap();
        let graph = assembler.assemble().unwrap();

        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
        assert!(graph.clusters.is_empty());
        assert_eq!(graph.metadata.total_functions, 0);
        assert_eq!(graph.stats.dead_functions.percentage, 0.0);
        // The empty discovery is surfaced as a diagnostic.
        assert!(!graph.metadata.diagnostics.is_empty());
    }

    #[test]
    fn test_go_project_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "main.go",
            r#"
package main

func main() {
	handleRequest("x")
}

func handleRequest(input string) string {
	return processData(input)
}

func processData(data string) string {
	return data
}

func deadHelper() {}
"#,
        );

        let config = ResolvedConfig::for_project(Language::Go, dir.path());
        let assembler = GraphAssembler::new(config).unwrap();
        let graph = assembler.assemble().unwrap();

        let statuses: HashMap<&str, NodeStatus> = graph
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.status))
            .collect();
        assert_eq!(statuses["main.go:main"], NodeStatus::Entry);
        assert_eq!(statuses["main.go:handleRequest"], NodeStatus::Live);
        assert_eq!(statuses["main.go:processData"], NodeStatus::Live);
        assert_eq!(statuses["main.go:deadHelper"], NodeStatus::Dead);

        assert_eq!(graph.stats.dead_functions.count, 1);
        assert_eq!(graph.entry_node.targets, vec!["main.go:main".to_string()]);

        // Determinism ordering.
        let ids: Vec<_> = graph.nodes.iter().map(|n| n.id.clone()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_determinism_two_runs_identical() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.ts",
            "export function first() { second(); }\nfunction second() {}\n",
        );
        write(dir.path(), "b.ts", "export function third() {}\n");

        let mut config = ResolvedConfig::for_project(Language::Typescript, dir.path());
        config.entry_points = vec![crate::config::EntryPointRule::Function("first".into())];

        let graph1 = GraphAssembler::new(config.clone()).unwrap().assemble().unwrap();
        let graph2 = GraphAssembler::new(config).unwrap().assemble().unwrap();

        let strip_time = |g: &CodeGraph| {
            let mut value = serde_json::to_value(g).unwrap();
            value["metadata"]["generatedAt"] = serde_json::Value::Null;
            value["metadata"]["analysisTimeMs"] = serde_json::Value::Null;
            value
        };
        assert_eq!(strip_time(&graph1), strip_time(&graph2));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut config = ResolvedConfig::for_project(Language::Go, std::env::temp_dir());
        config.include.clear();
        assert!(matches!(
            GraphAssembler::new(config),
            Err(AnalysisError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_invariant_check_catches_bad_color() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", "package main\nfunc main() {}\n");
        let config = ResolvedConfig::for_project(Language::Go, dir.path());
        let mut graph = GraphAssembler::new(config).unwrap().assemble().unwrap();

        graph.nodes[0].color = NodeColor::Orange; // entry must be blue
        assert!(matches!(
            verify_invariants(&graph),
            Err(AnalysisError::InvariantViolated(_))
        ));
    }
}
