//! Graph algorithms shared by the inference passes

use crate::error::InferenceError;
use crate::graph::CompressedGraph;
use rayon::prelude::*;

/// Find, for every slot `u -> v`, the slot of `v` that points back at `u`.
///
/// Uses the first matching entry of `v`'s list, so parallel edges between
/// the same pair share a reciprocal. A slot without any reciprocal means the
/// adjacency structure is not symmetric, which the model cannot handle.
pub fn reciprocal_slots(graph: &CompressedGraph) -> Result<Vec<u32>, InferenceError> {
    log::debug!("Resolving reciprocal slots for {} slots", graph.slot_count());

    (0..graph.slot_count())
        .into_par_iter()
        .map(|slot| {
            let node = graph.sources[slot] as usize;
            let neighbor = graph.targets[slot] as usize;
            graph
                .reciprocal_slot(node, neighbor)
                .map(|back| back as u32)
                .ok_or(InferenceError::MissingReciprocalEdge {
                    vertex: node,
                    neighbor,
                })
        })
        .collect()
}

/// Expected group degrees `d[r] = sum_u q[u][r] * degree(u)`.
///
/// `marginals` is the flat `node_count x groups` buffer. Summed in vertex
/// order so the result does not depend on the thread count.
pub fn expected_group_degrees(graph: &CompressedGraph, marginals: &[f64], groups: usize) -> Vec<f64> {
    let mut degrees = vec![0.0; groups];
    for (node, q) in marginals.chunks_exact(groups).enumerate() {
        let degree = graph.degree(node) as f64;
        for (d, &p) in degrees.iter_mut().zip(q) {
            *d += p * degree;
        }
    }
    degrees
}
