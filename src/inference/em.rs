//! EM outer loop alternating BP and the M-step

use crate::config::InferenceConfig;
use crate::error::InferenceError;
use crate::inference::bp::{run_bp, BpOutcome};
use crate::inference::params::update_parameters;
use crate::inference::random::{random_unity, UniformSource};
use crate::inference::{InferenceContext, InferenceState, Parameters};
use itertools::Itertools;
use ndarray::Array2;

/// Driver state: still iterating, or stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmPhase {
    Running,
    Stopped { converged: bool },
}

/// Final estimate of one inference run
#[derive(Debug, Clone)]
pub struct InferenceResult {
    pub groups: usize,

    /// One-vertex marginals, `node_count x groups`
    pub marginals: Vec<f64>,

    pub parameters: Parameters,

    /// Affinity rescaled by twice the edge count
    pub raw_affinity: Array2<f64>,

    /// Expected log-likelihood from the last M-step
    pub log_likelihood: Option<f64>,

    pub em_steps: usize,

    pub em_converged: bool,

    /// Largest change of the raw affinity in the last EM step
    pub last_change: f64,

    /// BP run of the last EM step
    pub last_bp: Option<BpOutcome>,
}

impl InferenceResult {
    pub fn marginal(&self, node: usize) -> &[f64] {
        &self.marginals[node * self.groups..(node + 1) * self.groups]
    }

    pub fn node_count(&self) -> usize {
        self.marginals.len() / self.groups
    }

    /// Whether the last BP run met its tolerance
    pub fn bp_converged(&self) -> bool {
        self.last_bp.map_or(false, |bp| bp.converged)
    }

    /// Both loops met their tolerance
    pub fn converged(&self) -> bool {
        self.em_converged && self.bp_converged()
    }

    /// Turn a non-converged result into an error
    pub fn ensure_converged(self) -> Result<Self, InferenceError> {
        if self.converged() {
            Ok(self)
        } else {
            Err(InferenceError::NotConverged {
                em_steps: self.em_steps,
                bp_converged: self.bp_converged(),
            })
        }
    }
}

/// Alternates BP and the M-step until the raw affinity matrix settles.
///
/// Callers that need to stop early can drive it with [`EmDriver::step`]
/// and check between steps.
pub struct EmDriver<'a> {
    ctx: InferenceContext<'a>,
    config: InferenceConfig,
    state: InferenceState,
    params: Parameters,
    raw_affinity: Array2<f64>,
    steps: usize,
    last_change: f64,
    last_bp: Option<BpOutcome>,
    log_likelihood: Option<f64>,
    phase: EmPhase,
}

impl<'a> EmDriver<'a> {
    /// Allocate the run's buffers and draw the initial values.
    ///
    /// Draw order: marginals vertex by vertex, emission columns category by
    /// category, then the upper triangle of the raw affinity row by row.
    /// Messages start as copies of the neighbor's marginal.
    pub fn new(ctx: InferenceContext<'a>, config: &InferenceConfig, source: &mut dyn UniformSource) -> Self {
        let graph = ctx.graph;
        let k = ctx.groups;
        let categories = ctx.categories.len();

        let mut state = InferenceState::new(graph.node_count, graph.slot_count(), k);
        for q in state.marginals.chunks_exact_mut(k) {
            random_unity(source, q);
        }
        for slot in 0..graph.slot_count() {
            let v = graph.targets[slot] as usize;
            let (start, end) = (v * k, (v + 1) * k);
            state.messages[slot * k..(slot + 1) * k].copy_from_slice(&state.marginals[start..end]);
        }

        let mut params = Parameters::zeros(k, categories);
        let mut column = vec![0.0; k];
        for i in 0..categories {
            random_unity(source, &mut column);
            for r in 0..k {
                params.gmma[[r, i]] = column[r];
            }
        }

        // Assortative start: diagonal in [1, 2), off-diagonal in [0, 1)
        let twom = ctx.twice_edge_count();
        let mut raw_affinity = Array2::<f64>::zeros((k, k));
        for r in 0..k {
            for s in 0..k {
                raw_affinity[[r, s]] = if r == s {
                    1.0 + source.next_uniform()
                } else if r < s {
                    source.next_uniform()
                } else {
                    raw_affinity[[s, r]]
                };
                params.omega[[r, s]] = raw_affinity[[r, s]] / twom;
            }
        }

        let phase = if config.em_max_steps == 0 {
            EmPhase::Stopped { converged: false }
        } else {
            EmPhase::Running
        };

        log::info!(
            "Starting EM with {} groups, {} vertices, {} categories",
            k,
            graph.node_count,
            categories
        );

        Self {
            ctx,
            config: config.clone(),
            state,
            params,
            raw_affinity,
            steps: 0,
            last_change: f64::INFINITY,
            last_bp: None,
            log_likelihood: None,
            phase,
        }
    }

    pub fn phase(&self) -> EmPhase {
        self.phase
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn state(&self) -> &InferenceState {
        &self.state
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn context(&self) -> &InferenceContext<'a> {
        &self.ctx
    }

    /// Run one EM step: BP to quiescence, M-step, convergence check
    pub fn step(&mut self) -> EmPhase {
        if self.phase != EmPhase::Running {
            return self.phase;
        }

        let bp = run_bp(
            &self.ctx,
            &self.params,
            &mut self.state,
            self.config.bp_tolerance,
            self.config.bp_max_sweeps,
        );
        if !bp.converged {
            log::debug!(
                "BP stopped after {} sweeps with max change {:e}",
                bp.sweeps,
                bp.max_change
            );
        }
        self.last_bp = Some(bp);

        let likelihood = update_parameters(&self.ctx, &self.state, &mut self.params);
        self.log_likelihood = Some(likelihood);

        let raw_affinity = &self.params.omega * self.ctx.twice_edge_count();
        let max_change = raw_affinity
            .iter()
            .zip(self.raw_affinity.iter())
            .map(|(new, old)| (new - old).abs())
            .fold(0.0, f64::max);
        self.raw_affinity = raw_affinity;
        self.last_change = max_change;
        self.steps += 1;

        log::info!("EM step {}, max change = {:e}", self.steps, max_change);
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("gamma =");
            for row in self.params.gmma.rows() {
                log::debug!(" {}", row.iter().map(|g| format!("{:.6}", g)).join(" "));
            }
            log::debug!("c =");
            for row in self.raw_affinity.rows() {
                log::debug!(" {}", row.iter().map(|c| format!("{:.6}", c)).join(" "));
            }
        }

        if max_change <= self.config.em_tolerance {
            self.phase = EmPhase::Stopped { converged: true };
        } else if self.steps >= self.config.em_max_steps {
            log::warn!(
                "Solution failed to converge in {} EM steps",
                self.config.em_max_steps
            );
            self.phase = EmPhase::Stopped { converged: false };
        }

        self.phase
    }

    /// Step until stopped
    pub fn run(&mut self) -> EmPhase {
        while self.step() == EmPhase::Running {}
        self.phase
    }

    /// Hand over the current estimate
    pub fn finish(self) -> InferenceResult {
        let em_converged = matches!(self.phase, EmPhase::Stopped { converged: true });

        if let Some(bp) = self.last_bp {
            if !bp.converged {
                log::warn!("BP failed to converge on final EM step");
            }
        }
        if let Some(likelihood) = self.log_likelihood {
            log::info!("Log-likelihood = {}", likelihood);
        }

        InferenceResult {
            groups: self.ctx.groups,
            marginals: self.state.marginals,
            parameters: self.params,
            raw_affinity: self.raw_affinity,
            log_likelihood: self.log_likelihood,
            em_steps: self.steps,
            em_converged,
            last_change: self.last_change,
            last_bp: self.last_bp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::metadata::CategoryIndex;
    use crate::graph::{CompressedGraph, GraphBuilder};
    use crate::inference::random::SeededUniform;
    use approx::assert_abs_diff_eq;

    fn star() -> CompressedGraph {
        let mut builder = GraphBuilder::new(false);
        for leaf in ["b", "c", "d", "e"] {
            builder.add_edge("a", leaf, 1.0);
        }
        builder.build()
    }

    #[test]
    fn initial_values_are_valid() {
        let graph = star();
        let categories = CategoryIndex::from_labels(vec![Some("hub"), Some("leaf"), Some("leaf"), Some("leaf"), Some("leaf")]);
        let ctx = InferenceContext::new(&graph, &categories, 3).unwrap();
        let mut source = SeededUniform::new(11);
        let driver = EmDriver::new(ctx, &InferenceConfig::new(3, Some(11)), &mut source);

        let params = driver.parameters();
        for i in 0..2 {
            assert_abs_diff_eq!(params.gmma.column(i).sum(), 1.0, epsilon = 1e-12);
        }
        for r in 0..3 {
            for s in 0..3 {
                assert_eq!(params.omega[[r, s]], params.omega[[s, r]]);
                if r != s {
                    assert!(params.omega[[r, r]] > params.omega[[r, s]]);
                }
            }
        }
        // leaf slots carry the hub's marginal
        let state = driver.state();
        assert_eq!(state.message(0), state.marginal(1));
        assert_eq!(state.message(4), state.marginal(0));
        assert_eq!(driver.phase(), EmPhase::Running);
    }

    #[test]
    fn step_counts_stay_within_caps() {
        let graph = star();
        let categories = CategoryIndex::from_labels(vec![None; 5]);
        let mut config = InferenceConfig::new(2, Some(5));
        config.em_max_steps = 3;
        config.bp_max_sweeps = 4;
        config.em_tolerance = 0.0;

        let ctx = InferenceContext::new(&graph, &categories, 2).unwrap();
        let mut source = SeededUniform::new(5);
        let mut driver = EmDriver::new(ctx, &config, &mut source);
        assert_eq!(driver.run(), EmPhase::Stopped { converged: false });
        assert_eq!(driver.steps(), 3);
        // stopped drivers do not advance
        driver.step();
        assert_eq!(driver.steps(), 3);

        let result = driver.finish();
        assert_eq!(result.em_steps, 3);
        assert!(!result.em_converged);
        assert!(result.last_bp.unwrap().sweeps <= 4);
        assert!(matches!(
            result.ensure_converged(),
            Err(InferenceError::NotConverged { em_steps: 3, .. })
        ));
    }

    #[test]
    fn zero_step_cap_returns_the_initial_state() {
        let graph = star();
        let categories = CategoryIndex::from_labels(vec![None; 5]);
        let mut config = InferenceConfig::new(2, Some(1));
        config.em_max_steps = 0;

        let ctx = InferenceContext::new(&graph, &categories, 2).unwrap();
        let mut source = SeededUniform::new(1);
        let mut driver = EmDriver::new(ctx, &config, &mut source);
        assert_eq!(driver.run(), EmPhase::Stopped { converged: false });

        let result = driver.finish();
        assert_eq!(result.em_steps, 0);
        assert!(result.log_likelihood.is_none());
        assert!(result.last_bp.is_none());
    }
}
