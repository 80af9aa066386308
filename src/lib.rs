//! Community detection on attributed networks with a degree-corrected
//! stochastic block model, fitted by EM with loopy belief propagation

pub mod community;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod inference;
pub mod storage;

pub use anyhow::{anyhow, Result};
pub use config::InferenceConfig;
pub use error::{InferenceError, InputError};
pub use inference::{infer, InferenceResult};
