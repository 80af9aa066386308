//! Hard group assignments from marginals

use crate::community::metrics::{calculate_density, identify_central_nodes};
use crate::community::Community;
use crate::data::metadata::CategoryIndex;
use crate::graph::CompressedGraph;
use crate::inference::InferenceResult;
use rayon::prelude::*;

/// Most probable group of every vertex; ties go to the lower index
pub fn most_probable_groups(result: &InferenceResult) -> Vec<usize> {
    (0..result.node_count())
        .map(|u| {
            let q = result.marginal(u);
            let mut best = 0;
            for r in 1..q.len() {
                if q[r] > q[best] {
                    best = r;
                }
            }
            best
        })
        .collect()
}

/// Build one community per group, including empty ones
pub fn build_communities(
    graph: &CompressedGraph,
    categories: &CategoryIndex,
    result: &InferenceResult,
) -> Vec<Community> {
    let assignment = most_probable_groups(result);

    let mut members: Vec<Vec<u32>> = vec![Vec::new(); result.groups];
    for (u, &group) in assignment.iter().enumerate() {
        members[group].push(u as u32);
    }

    let communities: Vec<Community> = members
        .into_par_iter()
        .enumerate()
        .map(|(group, members)| {
            let mut category_counts = vec![0; categories.len()];
            for &u in &members {
                category_counts[categories.codes[u as usize]] += 1;
            }
            let mean_confidence = if members.is_empty() {
                0.0
            } else {
                members
                    .iter()
                    .map(|&u| result.marginal(u as usize)[group])
                    .sum::<f64>()
                    / members.len() as f64
            };

            Community {
                id: group as u32,
                size: members.len(),
                density: calculate_density(graph, &members),
                central_nodes: identify_central_nodes(graph, &members),
                mean_confidence,
                category_counts,
                members,
            }
        })
        .collect();

    for community in &communities {
        log::info!(
            "Group {}: {} vertices, density {:.4}, mean confidence {:.4}",
            community.id,
            community.size,
            community.density,
            community.mean_confidence
        );
    }

    communities
}
