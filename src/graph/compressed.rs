//! Memory-efficient graph representation

use serde::{Deserialize, Serialize};
use std::mem;
use std::ops::Range;

/// Compressed sparse row adjacency store.
///
/// Every incident edge of a vertex occupies one *slot*. Vertex `u` owns the
/// slots `offsets[u]..offsets[u+1]`; the slot order is the order in which
/// the edges were read. Per-slot data used by inference (messages) lives in
/// flat buffers indexed the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedGraph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// offsets[i] to offsets[i+1] defines the slot range for node i
    pub offsets: Vec<u32>,

    /// Neighbor reached through each slot
    pub targets: Vec<u32>,

    /// Vertex owning each slot
    pub sources: Vec<u32>,

    /// Edge weight per slot (carried, not used by the model)
    pub weights: Vec<f64>,

    /// External string IDs in index order
    pub node_ids: Vec<String>,

    /// Optional per-vertex label text
    pub labels: Vec<Option<String>>,
}

impl CompressedGraph {
    /// Create an empty graph with pre-allocated capacity
    pub fn with_capacity(node_count: usize, slot_count: usize) -> Self {
        Self {
            node_count: 0,
            offsets: Vec::with_capacity(node_count + 1),
            targets: Vec::with_capacity(slot_count),
            sources: Vec::with_capacity(slot_count),
            weights: Vec::with_capacity(slot_count),
            node_ids: Vec::with_capacity(node_count),
            labels: Vec::with_capacity(node_count),
        }
    }

    /// Total number of slots (twice the edge count for undirected input)
    pub fn slot_count(&self) -> usize {
        self.targets.len()
    }

    /// Slot range owned by a node
    pub fn slot_range(&self, node: usize) -> Range<usize> {
        self.offsets[node] as usize..self.offsets[node + 1] as usize
    }

    /// Neighbors of a node in slot order
    pub fn neighbors(&self, node: usize) -> &[u32] {
        &self.targets[self.slot_range(node)]
    }

    /// Degree of a node (number of slots it owns)
    pub fn degree(&self, node: usize) -> usize {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        end - start
    }

    /// Sum of all degrees
    pub fn twice_edge_count(&self) -> usize {
        self.slot_count()
    }

    /// Slot of `neighbor` that points back at `node`, given that `node`
    /// reaches `neighbor`. Scans the neighbor's list and takes the first hit.
    pub fn reciprocal_slot(&self, node: usize, neighbor: usize) -> Option<usize> {
        let range = self.slot_range(neighbor);
        let start = range.start;
        self.targets[range]
            .iter()
            .position(|&t| t as usize == node)
            .map(|pos| start + pos)
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let offsets = self.offsets.capacity() * mem::size_of::<u32>();
        let slots = (self.targets.capacity() + self.sources.capacity()) * mem::size_of::<u32>()
            + self.weights.capacity() * mem::size_of::<f64>();
        let ids = self.node_ids.iter().map(|s| s.capacity()).sum::<usize>();
        let labels = self
            .labels
            .iter()
            .map(|l| l.as_ref().map_or(0, |s| s.capacity()))
            .sum::<usize>();

        base + offsets + slots + ids + labels
    }
}
