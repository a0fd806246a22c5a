//! Versioned (de)serialization of the graph artifact.
//!
//! The schema version is the document's backward-compatibility key: within
//! major 1.x additive fields may appear and readers ignore unknown fields;
//! an unknown major version is rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::model::CodeGraph;

/// Current artifact schema version.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Serialize an artifact to its canonical JSON form.
pub fn to_json(graph: &CodeGraph) -> Result<String, AnalysisError> {
    Ok(serde_json::to_string_pretty(graph)?)
}

/// Write an artifact to disk.
pub fn write_artifact(graph: &CodeGraph, path: &Path) -> Result<(), AnalysisError> {
    let json = to_json(graph)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read an artifact back, enforcing the schema-version contract. Unknown
/// fields are ignored; an unknown major version is fatal for the reader.
pub fn from_json(text: &str) -> Result<CodeGraph, AnalysisError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let version = value
        .get("metadata")
        .and_then(|m| m.get("version"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| AnalysisError::SchemaVersionUnsupported("<missing>".into()))?;
    let major = version.split('.').next().unwrap_or("");
    let supported_major = SCHEMA_VERSION.split('.').next().unwrap_or("");
    if major != supported_major {
        return Err(AnalysisError::SchemaVersionUnsupported(version.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

/// Read an artifact from disk.
pub fn read_artifact(path: &Path) -> Result<CodeGraph, AnalysisError> {
    let text = std::fs::read_to_string(path)?;
    from_json(&text)
}

/// Watch-mode update message pushed to viewer transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphUpdate {
    #[serde(rename = "type")]
    pub message_type: String,
    pub graph: CodeGraph,
}

impl GraphUpdate {
    pub fn new(graph: CodeGraph) -> Self {
        Self { message_type: "graph-update".to_string(), graph }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::GraphAssembler;
    use crate::config::ResolvedConfig;
    use crate::model::Language;

    fn sample_graph() -> CodeGraph {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.go"),
            "package main\n\nfunc main() {\n\thelper()\n}\n\nfunc helper() {}\n",
        )
        .unwrap();
        let config = ResolvedConfig::for_project(Language::Go, dir.path());
        GraphAssembler::new(config).unwrap().assemble().unwrap()
    }

    #[test]
    fn test_round_trip() {
        let graph = sample_graph();
        let json = to_json(&graph).unwrap();
        let parsed = from_json(&json).unwrap();

        assert_eq!(parsed.metadata.version, SCHEMA_VERSION);
        assert_eq!(parsed.nodes.len(), graph.nodes.len());
        assert_eq!(parsed.edges.len(), graph.edges.len());
        assert_eq!(parsed.entry_node.targets, graph.entry_node.targets);
    }

    #[test]
    fn test_wire_field_names() {
        let graph = sample_graph();
        let value: serde_json::Value = serde_json::from_str(&to_json(&graph).unwrap()).unwrap();

        assert_eq!(value["metadata"]["version"], "1.0.0");
        assert_eq!(value["metadata"]["language"], "go");
        assert!(value["metadata"]["generatedAt"].is_string());
        assert!(value["metadata"]["totalFunctions"].is_number());
        assert_eq!(value["entryNode"]["id"], "__entry__");
        assert_eq!(value["entryNode"]["name"], "External Callers");

        let node = &value["nodes"][0];
        assert!(node["qualifiedName"].is_string());
        assert!(node["filePath"].is_string());
        assert!(node["startLine"].is_number());
        assert!(node["isEntryPoint"].is_boolean());
        assert!(node["unusedParameters"].is_array());
        // Empty decorators are omitted.
        assert!(node.get("decorators").is_none());

        let edge = &value["edges"][0];
        assert!(edge["callSite"]["filePath"].is_string());
        assert!(edge["isResolved"].is_boolean());
    }

    #[test]
    fn test_unknown_major_version_rejected() {
        let graph = sample_graph();
        let json = to_json(&graph).unwrap().replace("\"1.0.0\"", "\"2.0.0\"");
        assert!(matches!(
            from_json(&json),
            Err(AnalysisError::SchemaVersionUnsupported(_))
        ));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let graph = sample_graph();
        let mut value: serde_json::Value = serde_json::from_str(&to_json(&graph).unwrap()).unwrap();
        value["futureField"] = serde_json::json!({"added": "in 1.9"});
        value["metadata"]["anotherAddition"] = serde_json::json!(42);
        let parsed = from_json(&value.to_string()).unwrap();
        assert_eq!(parsed.nodes.len(), graph.nodes.len());
    }

    #[test]
    fn test_minor_version_accepted() {
        let graph = sample_graph();
        let json = to_json(&graph).unwrap().replace("\"1.0.0\"", "\"1.4.2\"");
        assert!(from_json(&json).is_ok());
    }

    #[test]
    fn test_graph_update_message() {
        let graph = sample_graph();
        let update = GraphUpdate::new(graph);
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["type"], "graph-update");
        assert!(value["graph"]["metadata"].is_object());
    }

    #[test]
    fn test_file_round_trip() {
        let graph = sample_graph();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        write_artifact(&graph, &path).unwrap();
        let parsed = read_artifact(&path).unwrap();
        assert_eq!(parsed.nodes.len(), graph.nodes.len());
    }
}
