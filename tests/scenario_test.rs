//! Scenario tests over the committed fixture trees.
//!
//! These drive the public pipeline end to end: entry chains, dead leaves,
//! mutually recursive dead clusters, unused-parameter propagation,
//! interface fan-out, and re-export chains.

use std::collections::HashMap;
use std::path::PathBuf;

use codegraph::config::EntryPointRule;
use codegraph::model::{EdgeKind, NodeColor, NodeStatus};
use codegraph::{CodeGraph, GraphAssembler, Language, ResolvedConfig};

fn testdata(fixture: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(fixture)
}

fn analyze(fixture: &str, language: Language, rules: Vec<EntryPointRule>) -> CodeGraph {
    let mut config = ResolvedConfig::for_project(language, testdata(fixture));
    config.entry_points = rules;
    GraphAssembler::new(config)
        .expect("config should validate")
        .assemble()
        .expect("analysis should succeed")
}

fn statuses(graph: &CodeGraph) -> HashMap<String, (NodeStatus, NodeColor)> {
    graph
        .nodes
        .iter()
        .map(|n| (n.id.clone(), (n.status, n.color)))
        .collect()
}

#[test]
fn entry_chain_is_live() {
    // S1: main -> handleRequest -> processData, main auto-entry.
    let graph = analyze("go-basic", Language::Go, vec![]);
    let by_id = statuses(&graph);

    assert_eq!(by_id["main.go:main"], (NodeStatus::Entry, NodeColor::Blue));
    assert_eq!(by_id["handler.go:handleRequest"], (NodeStatus::Live, NodeColor::Green));
    assert_eq!(by_id["handler.go:processData"], (NodeStatus::Live, NodeColor::Green));
    assert_eq!(by_id["handler.go:validate"], (NodeStatus::Live, NodeColor::Green));
}

#[test]
fn dead_leaf_is_red_and_counted() {
    // S2: deadFunction has no incoming edges.
    let graph = analyze("go-basic", Language::Go, vec![]);
    let by_id = statuses(&graph);

    assert_eq!(by_id["dead.go:deadFunction"], (NodeStatus::Dead, NodeColor::Red));
    let dead_ids: Vec<_> = graph
        .nodes
        .iter()
        .filter(|n| n.status == NodeStatus::Dead)
        .map(|n| n.id.clone())
        .collect();
    assert_eq!(graph.stats.dead_functions.count, dead_ids.len());
    assert!(dead_ids.contains(&"dead.go:deadFunction".to_string()));
}

#[test]
fn mutual_recursion_without_entry_is_dead() {
    // S3: mutualA <-> mutualB are connected but unreachable.
    let graph = analyze("go-basic", Language::Go, vec![]);
    let by_id = statuses(&graph);

    assert_eq!(by_id["dead.go:mutualA"], (NodeStatus::Dead, NodeColor::Red));
    assert_eq!(by_id["dead.go:mutualB"], (NodeStatus::Dead, NodeColor::Red));

    // The cycle edges themselves exist.
    assert!(graph
        .edges
        .iter()
        .any(|e| e.source == "dead.go:mutualA" && e.target == "dead.go:mutualB"));
    assert!(graph
        .edges
        .iter()
        .any(|e| e.source == "dead.go:mutualB" && e.target == "dead.go:mutualA"));
}

#[test]
fn unused_parameter_propagates_to_color() {
    // S4: formatOutput(data, unusedParam): only data is read.
    let graph = analyze("go-basic", Language::Go, vec![]);
    let node = graph.node("dead.go:formatOutput").expect("node exists");

    assert_eq!(node.unused_parameters, vec!["unusedParam".to_string()]);
    // Dead with unused parameters renders orange.
    assert_eq!(node.status, NodeStatus::Dead);
    assert_eq!(node.color, NodeColor::Orange);
    assert!(graph.stats.unused_parameters.count >= 1);
}

#[test]
fn entry_status_overrides_unused_parameter_color() {
    let graph = analyze(
        "go-basic",
        Language::Go,
        vec![EntryPointRule::Function("deadFunction".into())],
    );
    let graph2 = analyze(
        "go-basic",
        Language::Go,
        vec![EntryPointRule::Function("formatOutput".into())],
    );
    // formatOutput as an entry is blue regardless of unused params.
    assert_eq!(
        graph2.node("dead.go:formatOutput").unwrap().color,
        NodeColor::Blue
    );
    // Unreferenced in the first graph, it stays orange.
    assert_eq!(
        graph.node("dead.go:formatOutput").unwrap().color,
        NodeColor::Orange
    );
}

#[test]
fn interface_fan_out() {
    // S5: run(svc Service) { svc.Process(...) } fans out to both
    // implementations with kind=interface.
    let graph = analyze(
        "go-interfaces",
        Language::Go,
        vec![EntryPointRule::Function("run".into())],
    );

    let fan: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| e.source == "main.go:run" && e.kind == EdgeKind::Interface)
        .collect();
    let targets: Vec<_> = fan.iter().map(|e| e.target.as_str()).collect();
    assert!(targets.contains(&"impl_a.go:ServiceA.Process"));
    assert!(targets.contains(&"impl_b.go:ServiceB.Process"));
    assert!(fan.iter().all(|e| e.is_resolved));

    let by_id = statuses(&graph);
    assert!(matches!(
        by_id["impl_a.go:ServiceA.Process"].0,
        NodeStatus::Live | NodeStatus::Entry
    ));
    assert!(matches!(
        by_id["impl_b.go:ServiceB.Process"].0,
        NodeStatus::Live | NodeStatus::Entry
    ));
    // format() is called by ServiceB.Process, so the fan-out keeps it live.
    assert_eq!(by_id["impl_b.go:format"].0, NodeStatus::Live);
}

#[test]
fn reexport_chain_resolves_to_original() {
    // S6: c imports from reexport, which re-exports a's validate.
    let graph = analyze(
        "ts-reexport",
        Language::Typescript,
        vec![EntryPointRule::Function("check".into())],
    );

    // No alias-only node is emitted for the re-export module.
    assert!(graph.nodes.iter().all(|n| n.file_path != "reexport.ts"));

    let edge = graph
        .edges
        .iter()
        .find(|e| e.source == "c.ts:check")
        .expect("check should call validate");
    assert_eq!(edge.target, "a.ts:validate");
    assert!(edge.is_resolved);

    let by_id = statuses(&graph);
    assert_eq!(by_id["a.ts:validate"].0, NodeStatus::Live);
}

#[test]
fn typescript_fixture_classification() {
    let graph = analyze(
        "ts-basic",
        Language::Typescript,
        vec![EntryPointRule::Function("handleRequest".into())],
    );
    let by_id = statuses(&graph);

    assert_eq!(by_id["main.ts:handleRequest"].0, NodeStatus::Entry);
    assert_eq!(by_id["main.ts:processData"].0, NodeStatus::Live);
    assert_eq!(by_id["util.ts:validate"].0, NodeStatus::Live);
    assert_eq!(by_id["dead.ts:deadHelper"], (NodeStatus::Dead, NodeColor::Red));
    assert_eq!(by_id["dead.ts:mutualA"].0, NodeStatus::Dead);
    assert_eq!(by_id["dead.ts:mutualB"].0, NodeStatus::Dead);

    // formatOutput: `_options` exempt, unusedParam reported.
    let fmt = graph.node("main.ts:formatOutput").unwrap();
    assert_eq!(fmt.unused_parameters, vec!["unusedParam".to_string()]);
    assert_eq!(fmt.color, NodeColor::Orange);
}

#[test]
fn python_fixture_classification() {
    let graph = analyze("python-basic", Language::Python, vec![]);
    let by_id = statuses(&graph);

    // main is referenced from the __main__ block.
    assert_eq!(by_id["src/main.py:main"].0, NodeStatus::Entry);
    assert_eq!(by_id["src/handler.py:handle_request"].0, NodeStatus::Live);
    assert_eq!(by_id["src/handler.py:process_data"].0, NodeStatus::Live);
    assert_eq!(by_id["src/utils.py:validate"].0, NodeStatus::Live);
    assert_eq!(by_id["src/dead.py:dead_function"].0, NodeStatus::Dead);

    let sanitize = graph.node("src/utils.py:sanitize").unwrap();
    assert_eq!(sanitize.unused_parameters, vec!["encoding".to_string()]);
    assert_eq!(sanitize.color, NodeColor::Orange);

    let fmt = graph.node("src/main.py:format_output").unwrap();
    assert_eq!(fmt.unused_parameters, vec!["unused_param".to_string()]);
}

#[test]
fn file_rule_marks_exported_nodes() {
    let graph = analyze(
        "ts-basic",
        Language::Typescript,
        vec![EntryPointRule::File("main.ts".into())],
    );
    let by_id = statuses(&graph);

    // Both exported functions in main.ts become entries; the module-level
    // processData does not.
    assert_eq!(by_id["main.ts:handleRequest"].0, NodeStatus::Entry);
    assert_eq!(by_id["main.ts:formatOutput"].0, NodeStatus::Entry);
    assert_eq!(by_id["main.ts:processData"].0, NodeStatus::Live);
}

#[test]
fn entry_node_lists_targets_sorted() {
    let graph = analyze("go-basic", Language::Go, vec![]);
    assert_eq!(graph.entry_node.id, "__entry__");
    assert_eq!(graph.entry_node.name, "External Callers");
    let mut sorted = graph.entry_node.targets.clone();
    sorted.sort();
    assert_eq!(graph.entry_node.targets, sorted);
    assert!(graph.entry_node.targets.contains(&"main.go:main".to_string()));
}

#[test]
fn clusters_partition_nodes() {
    let graph = analyze("python-basic", Language::Python, vec![]);
    for node in &graph.nodes {
        let holders = graph
            .clusters
            .iter()
            .filter(|c| c.node_ids.contains(&node.id))
            .count();
        assert_eq!(holders, 1, "node {} should be in exactly one cluster", node.id);
    }
    assert!(graph.clusters.iter().any(|c| c.id == "src"));
}

#[test]
fn empty_entry_set_marks_everything_dead() {
    // Law 9: TypeScript has no auto-entries; with no rules, all dead.
    let graph = analyze("ts-basic", Language::Typescript, vec![]);
    assert!(graph.nodes.iter().all(|n| n.status == NodeStatus::Dead));
    assert_eq!(graph.stats.dead_functions.count, graph.nodes.len());
    assert_eq!(graph.stats.dead_functions.percentage, 100.0);
}
