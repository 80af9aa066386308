//! EM/BP inference for the degree-corrected block model with a
//! categorical vertex attribute
//!
//! The E-step is loopy belief propagation ([`bp::run_bp`]); the M-step
//! re-estimates the affinity and emission matrices
//! ([`params::update_parameters`]); [`em::EmDriver`] alternates the two.

pub mod bp;
pub mod em;
pub mod params;
pub mod random;
pub mod state;

use crate::config::InferenceConfig;
use crate::data::metadata::CategoryIndex;
use crate::error::InferenceError;
use crate::graph::algorithms::reciprocal_slots;
use crate::graph::CompressedGraph;

pub use bp::{run_bp, BpOutcome};
pub use em::{EmDriver, EmPhase, InferenceResult};
pub use params::update_parameters;
pub use random::{SeededUniform, UniformSource};
pub use state::{InferenceState, Parameters};

/// Read-only inputs shared by BP and the M-step for one run
pub struct InferenceContext<'a> {
    pub graph: &'a CompressedGraph,
    pub categories: &'a CategoryIndex,
    pub groups: usize,
    /// Reciprocal slot of every slot
    pub reciprocal: Vec<u32>,
}

impl<'a> InferenceContext<'a> {
    /// Validate the inputs and resolve reciprocal slots
    pub fn new(
        graph: &'a CompressedGraph,
        categories: &'a CategoryIndex,
        groups: usize,
    ) -> Result<Self, InferenceError> {
        if groups == 0 {
            return Err(InferenceError::InvalidGroupCount(groups));
        }
        if graph.slot_count() == 0 {
            return Err(InferenceError::EmptyNetwork);
        }
        if categories.codes.len() != graph.node_count {
            return Err(InferenceError::CategoryMismatch(format!(
                "{} category codes for {} vertices",
                categories.codes.len(),
                graph.node_count
            )));
        }
        if categories.counts.len() != categories.len() {
            return Err(InferenceError::CategoryMismatch(format!(
                "{} counts for {} categories",
                categories.counts.len(),
                categories.len()
            )));
        }
        for (vertex, &code) in categories.codes.iter().enumerate() {
            if code >= categories.len() {
                return Err(InferenceError::CategoryOutOfRange {
                    vertex,
                    code,
                    categories: categories.len(),
                });
            }
        }
        if let Some(empty) = categories.counts.iter().position(|&c| c == 0) {
            return Err(InferenceError::CategoryMismatch(format!(
                "category {} has no members",
                empty
            )));
        }

        let reciprocal = reciprocal_slots(graph)?;

        Ok(Self {
            graph,
            categories,
            groups,
            reciprocal,
        })
    }

    /// Number of adjacency slots, i.e. twice the number of edges
    pub fn twice_edge_count(&self) -> f64 {
        self.graph.twice_edge_count() as f64
    }
}

/// Run the full EM/BP inference and apply the convergence policy
pub fn infer(
    graph: &CompressedGraph,
    categories: &CategoryIndex,
    config: &InferenceConfig,
) -> Result<InferenceResult, InferenceError> {
    let ctx = InferenceContext::new(graph, categories, config.groups)?;

    let mut source = match config.seed {
        Some(seed) => SeededUniform::new(seed),
        None => SeededUniform::from_entropy(),
    };
    log::info!("Random seed {}", source.seed());

    let mut driver = EmDriver::new(ctx, config, &mut source);
    driver.run();
    let result = driver.finish();

    if config.strict_convergence {
        result.ensure_converged()
    } else {
        Ok(result)
    }
}
