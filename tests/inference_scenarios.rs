//! End-to-end inference scenarios on small hand-built networks

use approx::assert_abs_diff_eq;
use dcsbm_community::community::assignment::{build_communities, most_probable_groups};
use dcsbm_community::config::InferenceConfig;
use dcsbm_community::data::metadata::CategoryIndex;
use dcsbm_community::graph::{CompressedGraph, GraphBuilder};
use dcsbm_community::inference::random::random_unity;
use dcsbm_community::inference::{
    infer, run_bp, update_parameters, EmDriver, EmPhase, InferenceContext, InferenceState, Parameters,
    SeededUniform,
};
use dcsbm_community::InferenceError;
use ndarray::array;

fn ring(n: usize) -> CompressedGraph {
    let mut builder = GraphBuilder::new(false);
    for u in 0..n {
        builder.set_label(&u.to_string(), "same");
    }
    for u in 0..n {
        builder.add_edge(&u.to_string(), &((u + 1) % n).to_string(), 1.0);
    }
    builder.build()
}

/// Two 5-cliques joined by the edge 4 - 5; the label names the clique
fn bridged_cliques() -> CompressedGraph {
    let mut builder = GraphBuilder::new(false);
    for u in 0..10 {
        builder.set_label(&u.to_string(), if u < 5 { "left" } else { "right" });
    }
    for base in [0, 5] {
        for a in base..base + 5 {
            for b in a + 1..base + 5 {
                builder.add_edge(&a.to_string(), &b.to_string(), 1.0);
            }
        }
    }
    builder.add_edge("4", "5", 1.0);
    builder.build()
}

fn assert_probability_vectors(values: &[f64], k: usize) {
    for chunk in values.chunks_exact(k) {
        assert!(chunk.iter().all(|&p| p >= 0.0));
        assert_abs_diff_eq!(chunk.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn ring_bp_fixed_point_is_uniform_without_attribute_signal() {
    let graph = ring(6);
    let categories = CategoryIndex::from_graph(&graph);
    let ctx = InferenceContext::new(&graph, &categories, 2).unwrap();

    let mut params = Parameters::zeros(2, 1);
    params.omega = array![[1.2, 0.8], [0.8, 1.2]] / 12.0;
    params.gmma = array![[0.5], [0.5]];

    for seed in 0..4 {
        let mut source = SeededUniform::new(seed);
        let mut state = InferenceState::new(graph.node_count, graph.slot_count(), 2);
        for q in state.marginals.chunks_exact_mut(2) {
            random_unity(&mut source, q);
        }
        for m in state.messages.chunks_exact_mut(2) {
            random_unity(&mut source, m);
        }

        let outcome = run_bp(&ctx, &params, &mut state, 1e-4, 20);
        assert!(outcome.converged, "seed {} did not converge", seed);
        for u in 0..6 {
            assert_abs_diff_eq!(state.marginal(u)[0], 0.5, epsilon = 1e-3);
        }
    }
}

#[test]
fn ring_em_gives_every_vertex_the_same_marginal() {
    let graph = ring(6);
    let categories = CategoryIndex::from_graph(&graph);

    for seed in 1..=4 {
        let result = infer(&graph, &categories, &InferenceConfig::new(2, Some(seed))).unwrap();
        assert_probability_vectors(&result.marginals, 2);
        let first = result.marginal(0)[0];
        for u in 1..6 {
            assert_abs_diff_eq!(result.marginal(u)[0], first, epsilon = 1e-4);
        }
    }
}

#[test]
fn bridged_cliques_split_into_two_groups() {
    let graph = bridged_cliques();
    let categories = CategoryIndex::from_graph(&graph);

    // EM can settle in a poor local optimum from an unlucky start
    let mut splits = 0;
    for seed in 1..=5 {
        let result = infer(&graph, &categories, &InferenceConfig::new(2, Some(seed))).unwrap();
        assert_probability_vectors(&result.marginals, 2);
        let groups = most_probable_groups(&result);

        // group labels may be swapped between runs
        let split = groups[..5].iter().all(|&g| g == groups[0])
            && groups[5..].iter().all(|&g| g == groups[5])
            && groups[0] != groups[5];
        if !split {
            continue;
        }
        splits += 1;

        let communities = build_communities(&graph, &categories, &result);
        assert_eq!(communities.len(), 2);
        assert!(communities.iter().all(|c| c.size == 5));
        assert!(communities.iter().all(|c| c.mean_confidence > 0.75));
    }
    assert!(splits >= 4, "only {} of 5 seeds split the cliques", splits);
}

#[test]
fn em_steps_keep_parameters_well_formed() {
    let graph = bridged_cliques();
    let categories = CategoryIndex::from_graph(&graph);
    let config = InferenceConfig::new(3, Some(17));
    let ctx = InferenceContext::new(&graph, &categories, 3).unwrap();
    let mut source = SeededUniform::new(17);
    let mut driver = EmDriver::new(ctx, &config, &mut source);

    loop {
        let phase = driver.step();
        assert!(driver.steps() <= config.em_max_steps);

        let state = driver.state();
        assert_probability_vectors(&state.marginals, 3);
        assert_probability_vectors(&state.messages, 3);

        let params = driver.parameters();
        for i in 0..categories.len() {
            assert_abs_diff_eq!(params.gmma.column(i).sum(), 1.0, epsilon = 1e-9);
        }
        for r in 0..3 {
            for s in 0..3 {
                assert!(params.omega[[r, s]] >= 0.0);
                assert_abs_diff_eq!(params.omega[[r, s]], params.omega[[s, r]], epsilon = 1e-12);
            }
        }

        if phase != EmPhase::Running {
            break;
        }
    }

    let result = driver.finish();
    let bp = result.last_bp.unwrap();
    assert!(bp.sweeps >= 1 && bp.sweeps <= config.bp_max_sweeps);
    assert!(result.em_steps >= 1 && result.em_steps <= config.em_max_steps);
    assert!(result.log_likelihood.unwrap().is_finite());
}

#[test]
fn isolated_vertex_follows_its_category_prior() {
    let mut builder = GraphBuilder::new(false);
    builder.add_edge("a", "b", 1.0);
    builder.add_edge("b", "c", 1.0);
    builder.set_label("a", "x");
    builder.set_label("b", "x");
    builder.set_label("c", "y");
    builder.set_label("alone", "y");
    let graph = builder.build();
    let categories = CategoryIndex::from_graph(&graph);
    let ctx = InferenceContext::new(&graph, &categories, 2).unwrap();

    let mut params = Parameters::zeros(2, 2);
    params.omega = array![[0.3, 0.1], [0.1, 0.3]];
    params.gmma = array![[0.7, 0.35], [0.3, 0.65]];

    let mut state = InferenceState::new(graph.node_count, graph.slot_count(), 2);
    state.marginals.fill(0.5);
    state.messages.fill(0.5);
    run_bp(&ctx, &params, &mut state, 1e-4, 20);

    let alone = state.marginal(3);
    assert_abs_diff_eq!(alone[0], 0.35, epsilon = 1e-12);
    assert_abs_diff_eq!(alone[1], 0.65, epsilon = 1e-12);

    let result = infer(&graph, &categories, &InferenceConfig::new(2, Some(3))).unwrap();
    assert_probability_vectors(&result.marginals, 2);
}

#[test]
fn one_directional_edge_aborts_before_any_work() {
    let mut builder = GraphBuilder::new(true);
    builder.add_edge("a", "b", 1.0);
    builder.add_edge("b", "a", 1.0);
    builder.add_edge("b", "c", 1.0);
    builder.add_edge("c", "a", 1.0);
    builder.add_edge("a", "c", 1.0);
    let graph = builder.build();
    let categories = CategoryIndex::from_graph(&graph);

    let err = infer(&graph, &categories, &InferenceConfig::new(2, Some(1))).unwrap_err();
    assert!(matches!(
        err,
        InferenceError::MissingReciprocalEdge { vertex: 1, neighbor: 2 }
    ));
    assert_eq!(err.exit_code(), 23);
}

#[test]
fn invalid_runs_are_rejected() {
    let graph = ring(4);
    let categories = CategoryIndex::from_graph(&graph);
    assert!(matches!(
        infer(&graph, &categories, &InferenceConfig::new(0, Some(1))),
        Err(InferenceError::InvalidGroupCount(0))
    ));

    let mut builder = GraphBuilder::new(false);
    builder.get_or_create_node("solo");
    let empty = builder.build();
    let categories = CategoryIndex::from_graph(&empty);
    assert!(matches!(
        infer(&empty, &categories, &InferenceConfig::new(2, Some(1))),
        Err(InferenceError::EmptyNetwork)
    ));
}

#[test]
fn same_seed_gives_identical_marginals_for_any_thread_count() {
    let graph = bridged_cliques();
    let categories = CategoryIndex::from_graph(&graph);
    let config = InferenceConfig::new(3, Some(99));

    let run_with = |threads: usize| {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
        pool.install(|| infer(&graph, &categories, &config).unwrap())
    };

    let single = run_with(1);
    let again = run_with(1);
    let parallel = run_with(4);

    let bits = |values: &[f64]| values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&single.marginals), bits(&again.marginals));
    assert_eq!(bits(&single.marginals), bits(&parallel.marginals));
    assert_eq!(single.em_steps, parallel.em_steps);
}

#[test]
fn repeated_m_steps_on_fixed_marginals_do_not_grow() {
    let graph = bridged_cliques();
    let categories = CategoryIndex::from_graph(&graph);
    let config = InferenceConfig::new(2, Some(8));
    let ctx = InferenceContext::new(&graph, &categories, 2).unwrap();
    let mut source = SeededUniform::new(8);
    let mut driver = EmDriver::new(ctx, &config, &mut source);
    driver.run();

    let twom = driver.context().twice_edge_count();
    let change = |a: &Parameters, b: &Parameters| {
        a.omega
            .iter()
            .zip(b.omega.iter())
            .map(|(x, y)| (x - y).abs() * twom)
            .fold(0.0, f64::max)
    };

    let start = driver.parameters().clone();
    let mut first = start.clone();
    update_parameters(driver.context(), driver.state(), &mut first);
    let mut second = first.clone();
    update_parameters(driver.context(), driver.state(), &mut second);

    assert!(change(&first, &second) <= change(&start, &first) + 1e-12);
    assert_eq!(first.gmma, second.gmma);
}

#[test]
fn strict_policy_reports_non_convergence() {
    let graph = bridged_cliques();
    let categories = CategoryIndex::from_graph(&graph);
    let mut config = InferenceConfig::new(2, Some(4)).with_strict_convergence(true);
    config.em_max_steps = 1;
    config.em_tolerance = 0.0;

    let err = infer(&graph, &categories, &config).unwrap_err();
    assert!(matches!(err, InferenceError::NotConverged { em_steps: 1, .. }));
    assert_eq!(err.exit_code(), 3);

    config.strict_convergence = false;
    let result = infer(&graph, &categories, &config).unwrap();
    assert!(!result.converged());
    assert_eq!(result.em_steps, 1);
}
