//! Reachability engine: color nodes by liveness from the entry set.
//!
//! Liveness is breadth-first search over outgoing edges starting from the
//! entry-point ids. Nothing else promotes a node: a node with incoming
//! edges from dead callers stays dead, so mutually recursive dead clusters
//! are classified correctly.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::{is_dynamic_target, Edge, Node, NodeStatus};

/// Assign `status` and `color` to every node given the entry id set.
///
/// Runs in O(V+E). Edges are walked in emitted order; the entry seeds are
/// visited in id order so ties resolve deterministically.
pub fn propagate(nodes: &mut [Node], edges: &[Edge], entry_ids: &[String]) {
    let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

    // Outgoing adjacency in emitted edge order.
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        if is_dynamic_target(&edge.target) || !node_ids.contains(edge.target.as_str()) {
            continue;
        }
        adjacency.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
    }

    let mut seeds: Vec<&str> = entry_ids.iter().map(|s| s.as_str()).collect();
    seeds.sort_unstable();
    seeds.dedup();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for seed in seeds {
        if node_ids.contains(seed) && visited.insert(seed) {
            queue.push_back(seed);
        }
    }

    while let Some(current) = queue.pop_front() {
        if let Some(targets) = adjacency.get(current) {
            for target in targets {
                if visited.insert(target) {
                    queue.push_back(target);
                }
            }
        }
    }

    for node in nodes.iter_mut() {
        node.status = if node.is_entry_point {
            NodeStatus::Entry
        } else if visited.contains(node.id.as_str()) {
            NodeStatus::Live
        } else {
            NodeStatus::Dead
        };
        node.recolor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CallSite, EdgeKind, FunctionKind, Language, NodeColor, Parameter, Visibility,
    };

    fn make_node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            name: id.rsplit(':').next().unwrap().to_string(),
            qualified_name: id.to_string(),
            file_path: "a.ts".to_string(),
            start_line: 1,
            end_line: 1,
            language: Language::Typescript,
            kind: FunctionKind::Function,
            visibility: Visibility::Module,
            is_entry_point: false,
            parameters: Vec::new(),
            unused_parameters: Vec::new(),
            package_or_module: ".".to_string(),
            lines_of_code: 1,
            status: NodeStatus::Dead,
            color: NodeColor::Red,
            decorators: Vec::new(),
        }
    }

    fn make_edge(source: &str, target: &str) -> Edge {
        Edge::resolved(
            source.to_string(),
            target.to_string(),
            CallSite { file_path: "a.ts".into(), line: 1, column: 1 },
            EdgeKind::Direct,
        )
    }

    fn mark_entry(nodes: &mut [Node], id: &str) -> Vec<String> {
        for node in nodes.iter_mut() {
            if node.id == id {
                node.is_entry_point = true;
            }
        }
        vec![id.to_string()]
    }

    #[test]
    fn test_entry_chain() {
        // S1: A -> B -> C, A entry.
        let mut nodes = vec![make_node("a.ts:A"), make_node("a.ts:B"), make_node("a.ts:C")];
        let edges = vec![make_edge("a.ts:A", "a.ts:B"), make_edge("a.ts:B", "a.ts:C")];
        let entries = mark_entry(&mut nodes, "a.ts:A");
        propagate(&mut nodes, &edges, &entries);

        assert_eq!(nodes[0].status, NodeStatus::Entry);
        assert_eq!(nodes[0].color, NodeColor::Blue);
        assert_eq!(nodes[1].status, NodeStatus::Live);
        assert_eq!(nodes[1].color, NodeColor::Green);
        assert_eq!(nodes[2].status, NodeStatus::Live);
        assert_eq!(nodes[2].color, NodeColor::Green);
    }

    #[test]
    fn test_dead_leaf() {
        // S2: D has no edges.
        let mut nodes = vec![make_node("a.ts:A"), make_node("a.ts:D")];
        let entries = mark_entry(&mut nodes, "a.ts:A");
        propagate(&mut nodes, &[], &entries);

        let d = nodes.iter().find(|n| n.id == "a.ts:D").unwrap();
        assert_eq!(d.status, NodeStatus::Dead);
        assert_eq!(d.color, NodeColor::Red);
    }

    #[test]
    fn test_mutual_recursion_without_entry_stays_dead() {
        // S3: mutualA <-> mutualB, no entry touching them.
        let mut nodes = vec![
            make_node("a.ts:main"),
            make_node("a.ts:mutualA"),
            make_node("a.ts:mutualB"),
        ];
        let edges = vec![
            make_edge("a.ts:mutualA", "a.ts:mutualB"),
            make_edge("a.ts:mutualB", "a.ts:mutualA"),
        ];
        let entries = mark_entry(&mut nodes, "a.ts:main");
        propagate(&mut nodes, &edges, &entries);

        assert_eq!(nodes[1].status, NodeStatus::Dead);
        assert_eq!(nodes[2].status, NodeStatus::Dead);
    }

    #[test]
    fn test_incoming_edge_does_not_promote() {
        // dead -> live target: the target is live only via the entry.
        let mut nodes = vec![make_node("a.ts:entry"), make_node("a.ts:dead"), make_node("a.ts:shared")];
        let edges = vec![
            make_edge("a.ts:entry", "a.ts:shared"),
            make_edge("a.ts:dead", "a.ts:shared"),
        ];
        let entries = mark_entry(&mut nodes, "a.ts:entry");
        propagate(&mut nodes, &edges, &entries);

        assert_eq!(nodes[1].status, NodeStatus::Dead);
        assert_eq!(nodes[2].status, NodeStatus::Live);
    }

    #[test]
    fn test_self_edge_does_not_change_status() {
        // Law 12: a self-edge neither promotes nor demotes.
        let mut nodes = vec![make_node("a.ts:entry"), make_node("a.ts:loner")];
        let entries = mark_entry(&mut nodes, "a.ts:entry");

        propagate(&mut nodes, &[], &entries);
        let before: Vec<NodeStatus> = nodes.iter().map(|n| n.status).collect();

        let edges = vec![
            make_edge("a.ts:loner", "a.ts:loner"),
            make_edge("a.ts:entry", "a.ts:entry"),
        ];
        propagate(&mut nodes, &edges, &entries);
        let after: Vec<NodeStatus> = nodes.iter().map(|n| n.status).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unused_params_yellow_when_live() {
        let mut nodes = vec![make_node("a.ts:entry"), make_node("a.ts:fmt")];
        nodes[1].parameters = vec![Parameter {
            name: "unusedParam".into(),
            type_annotation: None,
            is_used: false,
            position: 0,
        }];
        nodes[1].unused_parameters = vec!["unusedParam".into()];
        let edges = vec![make_edge("a.ts:entry", "a.ts:fmt")];
        let entries = mark_entry(&mut nodes, "a.ts:entry");
        propagate(&mut nodes, &edges, &entries);

        assert_eq!(nodes[1].status, NodeStatus::Live);
        assert_eq!(nodes[1].color, NodeColor::Yellow);
    }

    #[test]
    fn test_empty_entry_set_all_dead() {
        // Law 9.
        let mut nodes = vec![make_node("a.ts:A"), make_node("a.ts:B")];
        let edges = vec![make_edge("a.ts:A", "a.ts:B")];
        propagate(&mut nodes, &edges, &[]);
        assert!(nodes.iter().all(|n| n.status == NodeStatus::Dead));
    }

    #[test]
    fn test_dynamic_targets_ignored() {
        let mut nodes = vec![make_node("a.ts:entry")];
        let edges = vec![Edge::dynamic(
            "a.ts:entry".into(),
            "obj[key]",
            CallSite { file_path: "a.ts".into(), line: 1, column: 1 },
        )];
        let entries = mark_entry(&mut nodes, "a.ts:entry");
        propagate(&mut nodes, &edges, &entries);
        assert_eq!(nodes[0].status, NodeStatus::Entry);
    }

    #[test]
    fn test_cycle_through_live_region() {
        // entry -> A -> B -> A: cycles terminate and stay live.
        let mut nodes = vec![make_node("a.ts:entry"), make_node("a.ts:A"), make_node("a.ts:B")];
        let edges = vec![
            make_edge("a.ts:entry", "a.ts:A"),
            make_edge("a.ts:A", "a.ts:B"),
            make_edge("a.ts:B", "a.ts:A"),
        ];
        let entries = mark_entry(&mut nodes, "a.ts:entry");
        propagate(&mut nodes, &edges, &entries);
        assert_eq!(nodes[1].status, NodeStatus::Live);
        assert_eq!(nodes[2].status, NodeStatus::Live);
    }
}
