//! Error types for input loading and inference

use thiserror::Error;

/// Exit status for a graph whose adjacency lists are not reciprocal
pub const EXIT_MISSING_RECIPROCAL: i32 = 23;

/// Exit status for a non-converged run under the strict policy
pub const EXIT_NOT_CONVERGED: i32 = 3;

/// Errors raised by the inference core
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Vertex `vertex` lists `neighbor` but `neighbor` does not list `vertex`
    #[error("edge {vertex} -> {neighbor} has no reciprocal entry in the adjacency list of {neighbor}")]
    MissingReciprocalEdge { vertex: usize, neighbor: usize },

    #[error("number of groups must be at least 1, got {0}")]
    InvalidGroupCount(usize),

    #[error("network has no edges")]
    EmptyNetwork,

    #[error("vertex {vertex} has category {code} but only {categories} categories exist")]
    CategoryOutOfRange {
        vertex: usize,
        code: usize,
        categories: usize,
    },

    #[error("category table does not match the network: {0}")]
    CategoryMismatch(String),

    #[error("EM failed to converge in {em_steps} steps (final BP converged: {bp_converged})")]
    NotConverged { em_steps: usize, bp_converged: bool },
}

impl InferenceError {
    /// Process exit status reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            InferenceError::MissingReciprocalEdge { .. } => EXIT_MISSING_RECIPROCAL,
            InferenceError::NotConverged { .. } => EXIT_NOT_CONVERGED,
            _ => 1,
        }
    }
}

/// Errors raised while reading a network description
#[derive(Debug, Error)]
pub enum InputError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("no top-level `graph` block found")]
    MissingGraph,

    #[error("node block without an `id` key")]
    MissingNodeId,

    #[error("duplicate node id {0}")]
    DuplicateNode(String),

    #[error("edge block without `{0}`")]
    MissingEndpoint(String),

    #[error("edge refers to undeclared node id {0}")]
    UnknownNode(String),

    #[error("missing column `{0}`")]
    MissingColumn(String),
}
