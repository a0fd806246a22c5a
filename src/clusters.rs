//! Cluster builder: partition nodes into hierarchical packages/modules.

use std::collections::BTreeMap;

use crate::model::{Cluster, Node};

/// Build the cluster forest from node `package_or_module` values.
///
/// Each distinct package becomes a cluster holding its direct member
/// nodes; ancestor directories are synthesized (with empty member lists)
/// so every `parent` chain terminates inside the forest. Clusters are
/// ordered by id.
pub fn build_clusters(nodes: &[Node]) -> Vec<Cluster> {
    // BTreeMap keeps the lexical id ordering for free.
    let mut members: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for node in nodes {
        members
            .entry(node.package_or_module.clone())
            .or_default()
            .push(node.id.clone());
    }

    // Synthesize missing ancestors so parent chains terminate.
    let packages: Vec<String> = members.keys().cloned().collect();
    for package in packages {
        let mut current = package.as_str();
        while let Some((parent, _)) = current.rsplit_once('/') {
            members.entry(parent.to_string()).or_default();
            current = parent;
        }
    }

    members
        .into_iter()
        .map(|(id, mut node_ids)| {
            node_ids.sort();
            let label = id.rsplit('/').next().unwrap_or(&id).to_string();
            let parent = id.rsplit_once('/').map(|(parent, _)| parent.to_string());
            Cluster { id, label, node_ids, parent }
        })
        .collect()
}
