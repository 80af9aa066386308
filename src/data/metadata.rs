//! Categorical vertex attribute extracted from labels

use crate::graph::CompressedGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Category assigned to vertices that carry no label
pub const UNLABELED: &str = "NA";

/// Integer coding of the per-vertex category.
///
/// Categories are numbered in order of first appearance, so every category
/// has at least one member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryIndex {
    /// Category code per vertex
    pub codes: Vec<usize>,

    /// Label text per category code
    pub labels: Vec<String>,

    /// Number of vertices per category code
    pub counts: Vec<usize>,
}

impl CategoryIndex {
    /// Index the labels of a graph
    pub fn from_graph(graph: &CompressedGraph) -> Self {
        Self::from_labels(graph.labels.iter().map(|l| l.as_deref()))
    }

    /// Index an ordered sequence of optional labels
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut lookup: HashMap<&'a str, usize> = HashMap::new();
        let mut index = CategoryIndex {
            codes: Vec::new(),
            labels: Vec::new(),
            counts: Vec::new(),
        };

        for label in labels {
            let label = label.unwrap_or(UNLABELED);
            let code = *lookup.entry(label).or_insert_with(|| {
                index.labels.push(label.to_string());
                index.counts.push(0);
                index.labels.len() - 1
            });
            index.counts[code] += 1;
            index.codes.push(code);
        }

        log::info!("Found {} distinct metadata values", index.len());
        for (code, label) in index.labels.iter().enumerate() {
            log::debug!(" {} {} ({} vertices)", code, label, index.counts[code]);
        }

        index
    }

    /// Number of distinct categories
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label text of a vertex's category
    pub fn label_of(&self, vertex: usize) -> &str {
        &self.labels[self.codes[vertex]]
    }
}
