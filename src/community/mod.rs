//! Community readout of the inferred marginals

pub mod assignment;
pub mod metrics;

use serde::{Deserialize, Serialize};

/// Vertices whose most probable group is the same
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    /// Group index
    pub id: u32,

    /// Members of this community (node indices)
    pub members: Vec<u32>,

    /// Size of the community
    pub size: usize,

    /// Density: internal adjacency slots / potential ordered pairs
    pub density: f32,

    /// Mean marginal probability of the group among its members
    pub mean_confidence: f64,

    /// Members with the most neighbors inside the community
    pub central_nodes: Vec<u32>,

    /// Member count per attribute category
    pub category_counts: Vec<usize>,
}
