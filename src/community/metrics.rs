//! Community statistics

use crate::graph::CompressedGraph;
use std::collections::HashSet;

/// Number of top members reported as central
const CENTRAL_NODE_COUNT: usize = 5;

/// Calculate density (internal slots / potential ordered pairs)
pub fn calculate_density(graph: &CompressedGraph, members: &[u32]) -> f32 {
    let n = members.len();
    if n <= 1 {
        return 1.0; // By convention, singleton communities have density 1
    }

    let potential = n * (n - 1);
    let member_set: HashSet<u32> = members.iter().copied().collect();

    let mut internal = 0;
    for &u in members {
        for &v in graph.neighbors(u as usize) {
            if v != u && member_set.contains(&v) {
                internal += 1;
            }
        }
    }

    internal as f32 / potential as f32
}

/// Members with the most neighbors inside the community, highest first
pub fn identify_central_nodes(graph: &CompressedGraph, members: &[u32]) -> Vec<u32> {
    let member_set: HashSet<u32> = members.iter().copied().collect();

    let mut degrees: Vec<(u32, usize)> = members
        .iter()
        .map(|&u| {
            let inside = graph
                .neighbors(u as usize)
                .iter()
                .filter(|v| member_set.contains(v))
                .count();
            (u, inside)
        })
        .collect();

    // Stable sort keeps input order among equal degrees
    degrees.sort_by(|a, b| b.1.cmp(&a.1));

    degrees
        .iter()
        .take(CENTRAL_NODE_COUNT)
        .map(|&(node, _)| node)
        .collect()
}
