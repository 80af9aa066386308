//! Parameter re-estimation (M-step) and the expected log-likelihood

use crate::graph::algorithms::expected_group_degrees;
use crate::inference::{InferenceContext, InferenceState, Parameters};
use ndarray::Array2;

/// Recompute `nrx`, `gmma` and `omega` from the current marginals and
/// messages, and return the expected log-likelihood.
///
/// The edge marginals are formed with the incoming `omega`, so the
/// likelihood's entropy term belongs to the messages BP just produced.
/// Every undirected edge is visited once per direction.
pub fn update_parameters(ctx: &InferenceContext, state: &InferenceState, params: &mut Parameters) -> f64 {
    let graph = ctx.graph;
    let categories = ctx.categories;
    let k = ctx.groups;

    let d = expected_group_degrees(graph, &state.marginals, k);

    params.nrx.fill(0.0);
    for (u, q) in state.marginals.chunks_exact(k).enumerate() {
        let code = categories.codes[u];
        for r in 0..k {
            params.nrx[[r, code]] += q[r];
        }
    }

    for r in 0..k {
        for (i, &count) in categories.counts.iter().enumerate() {
            params.gmma[[r, i]] = params.nrx[[r, i]] / count as f64;
        }
    }

    // Edge marginals, summed sequentially so the result is independent of
    // the thread pool
    let mut sum = Array2::<f64>::zeros((k, k));
    let mut term = Array2::<f64>::zeros((k, k));
    let mut esum = 0.0;

    for slot in 0..graph.slot_count() {
        let back = ctx.reciprocal[slot] as usize;
        let eta_uv = state.message(slot);
        let eta_vu = state.message(back);

        let mut norm = 0.0;
        for r in 0..k {
            for s in 0..k {
                let t = params.omega[[r, s]] * eta_uv[r] * eta_vu[s];
                term[[r, s]] = t;
                norm += t;
            }
        }
        if !(norm > 0.0) {
            continue;
        }

        for r in 0..k {
            for s in 0..k {
                let quvrs = term[[r, s]] / norm;
                sum[[r, s]] += quvrs;
                if quvrs > 0.0 {
                    esum += quvrs * quvrs.ln();
                }
            }
        }
    }

    for r in 0..k {
        for s in 0..k {
            let mass = d[r] * d[s];
            params.omega[[r, s]] = if mass > 0.0 { sum[[r, s]] / mass } else { 0.0 };
        }
    }

    // Internal energy
    let mut likelihood = 0.0;
    for r in 0..k {
        for s in 0..k {
            if sum[[r, s]] > 0.0 {
                likelihood += 0.5 * sum[[r, s]] * params.omega[[r, s]].ln();
            }
        }
        for (i, &count) in categories.counts.iter().enumerate() {
            let g = params.gmma[[r, i]];
            if g > 0.0 {
                likelihood += count as f64 * g * g.ln();
            }
        }
    }

    // Entropy; isolated vertices have no (degree - 1) correction
    likelihood -= 0.5 * esum;
    for (u, q) in state.marginals.chunks_exact(k).enumerate() {
        let degree = graph.degree(u);
        if degree == 0 {
            continue;
        }
        for &p in q {
            if p > 0.0 {
                likelihood += (degree as f64 - 1.0) * p * p.ln();
            }
        }
    }

    likelihood
}
