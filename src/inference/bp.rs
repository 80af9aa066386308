//! Loopy belief propagation for the degree-corrected block model
//!
//! One sweep:
//! 1. expected group degrees `d[r]` from the previous marginals
//! 2. shared log prefactor `logpre[r] = -sum_s omega[r][s] d[s]`
//! 3. new marginals for every vertex from the previous messages
//! 4. new messages for every slot into the scratch buffer, leaving out the
//!    neighbor's slots that point back at the receiver
//! 5. normalize, measure the largest change, swap scratch and messages
//!
//! Marginals are written in place because no marginal reads another
//! vertex's new value. Messages are double-buffered.

use crate::config::SMALL;
use crate::graph::algorithms::expected_group_degrees;
use crate::inference::{InferenceContext, InferenceState, Parameters};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

/// Result of one BP run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpOutcome {
    /// Sweeps executed, at most the configured cap
    pub sweeps: usize,

    /// Largest message change of the last sweep
    pub max_change: f64,

    /// Whether the last sweep met the tolerance
    pub converged: bool,
}

/// `ln(max(sum_s message[s] * omega_row[s], SMALL))`
#[inline]
fn clamped_log_sum(message: &[f64], omega_row: ArrayView1<f64>) -> f64 {
    let mut sum = 0.0;
    for (m, w) in message.iter().zip(omega_row.iter()) {
        sum += m * w;
    }
    if sum < SMALL {
        sum = SMALL;
    }
    sum.ln()
}

/// Turn unnormalized log values into a probability vector (log-sum-exp)
pub(crate) fn normalize_log(values: &mut [f64]) {
    let largest = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut norm = 0.0;
    for v in values.iter_mut() {
        *v = (*v - largest).exp();
        norm += *v;
    }
    for v in values.iter_mut() {
        *v /= norm;
    }
}

/// Run BP sweeps until the largest message change is at most `tolerance`
/// or `max_sweeps` sweeps have run.
pub fn run_bp(
    ctx: &InferenceContext,
    params: &Parameters,
    state: &mut InferenceState,
    tolerance: f64,
    max_sweeps: usize,
) -> BpOutcome {
    let graph = ctx.graph;
    let codes = &ctx.categories.codes;
    let k = ctx.groups;
    let omega = &params.omega;
    let log_gmma: Array2<f64> = params.gmma.mapv(f64::ln);

    let InferenceState {
        marginals,
        messages,
        scratch,
        ..
    } = state;

    let mut outcome = BpOutcome {
        sweeps: 0,
        max_change: f64::INFINITY,
        converged: false,
    };

    for sweep in 1..=max_sweeps {
        let d = expected_group_degrees(graph, &marginals[..], k);
        let logpre: Vec<f64> = (0..k)
            .map(|r| {
                let mut pre = 0.0;
                for s in 0..k {
                    pre -= omega[[r, s]] * d[s];
                }
                pre
            })
            .collect();

        let incoming: &[f64] = &messages[..];

        marginals
            .par_chunks_mut(k)
            .enumerate()
            .for_each(|(u, q)| {
                let degree = graph.degree(u) as f64;
                let code = codes[u];
                for r in 0..k {
                    let mut logq = log_gmma[[r, code]] + degree * logpre[r];
                    for slot in graph.slot_range(u) {
                        logq += clamped_log_sum(&incoming[slot * k..(slot + 1) * k], omega.row(r));
                    }
                    q[r] = logq;
                }
                normalize_log(q);
            });

        scratch
            .par_chunks_mut(k)
            .enumerate()
            .for_each(|(slot, eta)| {
                let u = graph.sources[slot];
                let v = graph.targets[slot] as usize;
                let degree = graph.degree(v) as f64;
                let code = codes[v];
                for r in 0..k {
                    let mut logeta = log_gmma[[r, code]] + degree * logpre[r];
                    for back in graph.slot_range(v) {
                        if graph.targets[back] != u {
                            logeta += clamped_log_sum(&incoming[back * k..(back + 1) * k], omega.row(r));
                        }
                    }
                    eta[r] = logeta;
                }
                normalize_log(eta);
            });

        let max_change = scratch
            .par_chunks(k)
            .zip(incoming.par_chunks(k))
            .map(|(new, old)| {
                new.iter()
                    .zip(old)
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0, f64::max)
            })
            .reduce(|| 0.0, f64::max);

        std::mem::swap(messages, scratch);

        log::debug!("BP sweep {}, max change = {:e}", sweep, max_change);

        outcome = BpOutcome {
            sweeps: sweep,
            max_change,
            converged: max_change <= tolerance,
        };
        if outcome.converged {
            break;
        }
    }

    outcome
}
