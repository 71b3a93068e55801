use super::config::ConfigError;
use super::utils::sampling::SamplingError;
use crate::core::io::a3m::A3mError;
use crate::core::models::alignment::AlignmentError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read alignment '{path}': {source}", path = path.display())]
    AlignmentRead {
        path: PathBuf,
        #[source]
        source: A3mError,
    },

    #[error("Radius search failed: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Invalid alignment: {0}")]
    Alignment(#[from] AlignmentError),

    #[error("Failed to write cluster partition: {0}")]
    PartitionWrite(#[source] A3mError),

    #[error("Run log '{path}' could not be updated: {source}", path = path.display())]
    RunLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
