//! Input readers: network files and the categorical attribute

pub mod gml;
pub mod metadata;
pub mod parquet;

use crate::graph::CompressedGraph;
use anyhow::Result;

/// Load a network, choosing the reader from the file extension
pub fn load_network(path: &str, labels_path: Option<&str>) -> Result<CompressedGraph> {
    if path.ends_with(".parquet") {
        parquet::load_edge_table(path, labels_path)
    } else {
        if labels_path.is_some() {
            log::warn!("Label table is only used with Parquet edge tables; ignoring it");
        }
        gml::load_gml(path)
    }
}
