//! Results output module

use crate::community::Community;
use crate::data::metadata::CategoryIndex;
use crate::graph::CompressedGraph;
use crate::inference::InferenceResult;
use anyhow::Result;
use itertools::Itertools;
use ndarray::Array2;
use serde_json::{json, to_string_pretty, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write one line per vertex: index, category label, marginals to six places
pub fn write_marginals<W: Write>(
    writer: &mut W,
    categories: &CategoryIndex,
    result: &InferenceResult,
) -> Result<()> {
    for u in 0..result.node_count() {
        let probabilities = result
            .marginal(u)
            .iter()
            .map(|p| format!("{:.6}", p))
            .join(" ");
        writeln!(writer, "{} {} {}", u, categories.label_of(u), probabilities)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the marginals to a file, or to stdout when no path is given
pub fn save_marginals(
    output: Option<&str>,
    categories: &CategoryIndex,
    result: &InferenceResult,
) -> Result<()> {
    match output {
        Some(path) => {
            log::info!("Saving marginals to {}", path);
            let mut file = BufWriter::new(File::create(path)?);
            write_marginals(&mut file, categories, result)
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_marginals(&mut lock, categories, result)
        }
    }
}

fn matrix_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Build the JSON summary of a run
pub fn summary_json(
    graph: &CompressedGraph,
    categories: &CategoryIndex,
    result: &InferenceResult,
    communities: &[Community],
) -> Value {
    let edge_count = graph.twice_edge_count() as f64 / 2.0;
    let isolated = (0..graph.node_count).filter(|&u| graph.degree(u) == 0).count();

    json!({
        "graph_stats": {
            "node_count": graph.node_count,
            "edge_count": edge_count,
            "avg_degree": graph.twice_edge_count() as f64 / graph.node_count.max(1) as f64,
            "isolated_nodes": isolated,
        },
        "categories": categories.labels.iter().zip(&categories.counts).map(|(label, count)| {
            json!({ "label": label, "count": count })
        }).collect::<Vec<_>>(),
        "convergence": {
            "converged": result.converged(),
            "em_converged": result.em_converged,
            "em_steps": result.em_steps,
            "em_last_change": result.last_change,
            "bp_converged": result.bp_converged(),
            "bp_sweeps": result.last_bp.map(|bp| bp.sweeps),
            "bp_last_change": result.last_bp.map(|bp| bp.max_change),
        },
        "log_likelihood": result.log_likelihood,
        "groups": result.groups,
        "gamma": matrix_rows(&result.parameters.gmma),
        "raw_affinity": matrix_rows(&result.raw_affinity),
        "communities": communities,
    })
}

/// Save the JSON summary to `path`
pub fn save_summary(
    path: &str,
    graph: &CompressedGraph,
    categories: &CategoryIndex,
    result: &InferenceResult,
    communities: &[Community],
) -> Result<()> {
    log::info!("Saving summary to {}", path);

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let summary = summary_json(graph, categories, result, communities);
    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(&summary)?.as_bytes())?;

    Ok(())
}
