//! Graph construction module

use crate::graph::CompressedGraph;
use std::collections::HashMap;

/// Builder for incrementally constructing a CompressedGraph
pub struct GraphBuilder {
    /// Edges are stored on both endpoints unless the input is directed
    directed: bool,

    /// Mapping from string IDs to node indices
    id_to_index: HashMap<String, u32>,

    /// Node string IDs
    node_ids: Vec<String>,

    /// Node labels, if any
    labels: Vec<Option<String>>,

    /// Adjacency lists (target, weight) for each node, in insertion order
    adjacency_lists: Vec<Vec<(u32, f64)>>,
}

impl GraphBuilder {
    pub fn new(directed: bool) -> Self {
        Self::with_capacity(directed, 0)
    }

    /// Create a new graph builder with the given capacity
    pub fn with_capacity(directed: bool, capacity: usize) -> Self {
        Self {
            directed,
            id_to_index: HashMap::with_capacity(capacity),
            node_ids: Vec::with_capacity(capacity),
            labels: Vec::with_capacity(capacity),
            adjacency_lists: Vec::with_capacity(capacity),
        }
    }

    /// Number of nodes seen so far
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Whether a node with this ID exists
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    /// Get or create a node ID for the given string ID
    pub fn get_or_create_node(&mut self, id: &str) -> u32 {
        if let Some(&idx) = self.id_to_index.get(id) {
            return idx;
        }

        let idx = self.node_ids.len() as u32;
        self.id_to_index.insert(id.to_string(), idx);
        self.node_ids.push(id.to_string());
        self.labels.push(None);
        self.adjacency_lists.push(Vec::new());

        idx
    }

    /// Attach a label to a node, creating the node if needed
    pub fn set_label(&mut self, id: &str, label: &str) {
        let idx = self.get_or_create_node(id) as usize;
        self.labels[idx] = Some(label.to_string());
    }

    /// Add an edge from one node to another.
    ///
    /// Undirected edges land in both lists, so a self-loop takes two slots
    /// of the same node.
    pub fn add_edge(&mut self, src_id: &str, dst_id: &str, weight: f64) {
        let src_idx = self.get_or_create_node(src_id);
        let dst_idx = self.get_or_create_node(dst_id);
        self.add_edge_by_index(src_idx, dst_idx, weight);
    }

    /// Add an edge between two existing node indices
    pub fn add_edge_by_index(&mut self, src_idx: u32, dst_idx: u32, weight: f64) {
        self.adjacency_lists[src_idx as usize].push((dst_idx, weight));
        if !self.directed {
            self.adjacency_lists[dst_idx as usize].push((src_idx, weight));
        }
    }

    /// Build the compressed graph
    pub fn build(self) -> CompressedGraph {
        let node_count = self.node_ids.len();
        let slot_count: usize = self.adjacency_lists.iter().map(|list| list.len()).sum();

        let mut graph = CompressedGraph::with_capacity(node_count, slot_count);
        graph.offsets.push(0);

        let mut offset = 0u32;
        for (node, list) in self.adjacency_lists.iter().enumerate() {
            for &(target, weight) in list {
                graph.targets.push(target);
                graph.sources.push(node as u32);
                graph.weights.push(weight);
            }
            offset += list.len() as u32;
            graph.offsets.push(offset);
        }

        graph.node_count = node_count;
        graph.node_ids = self.node_ids;
        graph.labels = self.labels;

        graph
    }
}
