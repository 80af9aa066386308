//! Parquet file handling for graph data

use crate::error::InputError;
use crate::graph::{CompressedGraph, GraphBuilder};
use anyhow::Result;
use polars::prelude::*;
use std::path::Path;

fn scan(path: &str) -> Result<DataFrame> {
    if !Path::new(path).exists() {
        return Err(anyhow::anyhow!("File not found: {}", path));
    }
    let df = LazyFrame::scan_parquet(path, Default::default())?.collect()?;
    log::info!("File schema: {:?}", df.schema());
    Ok(df)
}

fn require(df: &DataFrame, name: &str) -> Result<()> {
    if df.column(name).is_ok() {
        Ok(())
    } else {
        Err(InputError::MissingColumn(name.to_string()).into())
    }
}

/// Load an undirected network from a Parquet edge table.
///
/// The edge table needs string columns `Source` and `Target`. An optional
/// vertex table with string columns `Id` and `Label` supplies the categorical
/// attribute; vertices listed there but absent from the edge table are kept
/// as isolated vertices, and they come first in index order.
pub fn load_edge_table(edges_path: &str, labels_path: Option<&str>) -> Result<CompressedGraph> {
    log::info!("Reading parquet edge table: {}", edges_path);

    let mut builder = GraphBuilder::new(false);

    if let Some(labels_path) = labels_path {
        log::info!("Reading parquet label table: {}", labels_path);
        let df = scan(labels_path)?;
        require(&df, "Id")?;
        require(&df, "Label")?;

        let id_col = df.column("Id")?.str()?;
        let label_col = df.column("Label")?.str()?;
        for i in 0..df.height() {
            if let Some(id) = id_col.get(i) {
                match label_col.get(i) {
                    Some(label) => builder.set_label(id, label),
                    None => {
                        builder.get_or_create_node(id);
                    }
                }
            }
        }
        log::info!("Loaded {} labelled vertices", builder.node_count());
    }

    let df = scan(edges_path)?;
    require(&df, "Source")?;
    require(&df, "Target")?;

    let src_col = df.column("Source")?.str()?;
    let dst_col = df.column("Target")?.str()?;

    let mut skipped = 0usize;
    for i in 0..df.height() {
        match (src_col.get(i), dst_col.get(i)) {
            (Some(src), Some(dst)) => builder.add_edge(src, dst, 1.0),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!("Skipped {} edges with a missing endpoint", skipped);
    }

    let graph = builder.build();
    log::info!(
        "Loaded graph with {} nodes and {} adjacency slots",
        graph.node_count,
        graph.slot_count()
    );

    Ok(graph)
}
