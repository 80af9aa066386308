//! Buffers owned by one inference run

use ndarray::Array2;

/// Model parameters re-estimated by every M-step
#[derive(Debug, Clone)]
pub struct Parameters {
    /// Group affinity, `groups x groups`
    pub omega: Array2<f64>,

    /// Emission weights, `groups x categories`; each column sums to one
    pub gmma: Array2<f64>,

    /// Expected category counts per group, `groups x categories`
    pub nrx: Array2<f64>,
}

impl Parameters {
    pub fn zeros(groups: usize, categories: usize) -> Self {
        Self {
            omega: Array2::zeros((groups, groups)),
            gmma: Array2::zeros((groups, categories)),
            nrx: Array2::zeros((groups, categories)),
        }
    }
}

/// Marginals and messages, stored flat with a stride of `groups`.
///
/// `messages[slot]` is the message that arrives at the slot's owner from
/// the slot's target and describes the target's group. `scratch` receives
/// the next sweep's messages so every update reads the previous sweep only.
#[derive(Debug, Clone)]
pub struct InferenceState {
    pub groups: usize,
    pub marginals: Vec<f64>,
    pub messages: Vec<f64>,
    pub(crate) scratch: Vec<f64>,
}

impl InferenceState {
    pub fn new(node_count: usize, slot_count: usize, groups: usize) -> Self {
        Self {
            groups,
            marginals: vec![0.0; node_count * groups],
            messages: vec![0.0; slot_count * groups],
            scratch: vec![0.0; slot_count * groups],
        }
    }

    /// One-vertex marginal of `node`
    pub fn marginal(&self, node: usize) -> &[f64] {
        &self.marginals[node * self.groups..(node + 1) * self.groups]
    }

    /// Message stored at `slot`
    pub fn message(&self, slot: usize) -> &[f64] {
        &self.messages[slot * self.groups..(slot + 1) * self.groups]
    }
}
