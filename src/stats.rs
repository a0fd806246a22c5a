//! Summary statistics over the classified graph.

use std::collections::BTreeMap;

use crate::model::{EntryPointStats, LargestFunction, Node, NodeStatus, StatBlock, Stats};

/// Percentage rounded to two decimals; zero when the total is zero.
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((count * 10_000) as f64 / total as f64).round() / 100.0
}

/// Compute dead-function, unused-parameter, entry-point, and
/// largest-function summaries.
pub fn aggregate(nodes: &[Node], entry_ids: &[String]) -> Stats {
    let total = nodes.len();

    let mut dead_by_package: BTreeMap<String, usize> = BTreeMap::new();
    let mut unused_by_package: BTreeMap<String, usize> = BTreeMap::new();
    let mut dead_count = 0;
    let mut unused_count = 0;

    for node in nodes {
        if node.status == NodeStatus::Dead {
            dead_count += 1;
            *dead_by_package.entry(node.package_or_module.clone()).or_default() += 1;
        }
        if !node.unused_parameters.is_empty() {
            unused_count += 1;
            *unused_by_package.entry(node.package_or_module.clone()).or_default() += 1;
        }
    }

    let mut largest: Vec<&Node> = nodes.iter().collect();
    largest.sort_by(|a, b| {
        b.lines_of_code
            .cmp(&a.lines_of_code)
            .then_with(|| a.id.cmp(&b.id))
    });
    let largest_functions = largest
        .into_iter()
        .take(10)
        .map(|n| LargestFunction {
            id: n.id.clone(),
            name: n.name.clone(),
            lines_of_code: n.lines_of_code,
        })
        .collect();

    Stats {
        dead_functions: StatBlock {
            count: dead_count,
            percentage: percentage(dead_count, total),
            by_package: dead_by_package,
        },
        unused_parameters: StatBlock {
            count: unused_count,
            percentage: percentage(unused_count, total),
            by_package: unused_by_package,
        },
        entry_points: EntryPointStats {
            count: entry_ids.len(),
            ids: entry_ids.to_vec(),
        },
        largest_functions,
    }
}
