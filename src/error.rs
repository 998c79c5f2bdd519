//! Error types surfaced by the dataset store and the query engine.

use std::path::PathBuf;

/// Contract violations at the query engine boundary.
///
/// Querying an empty dataset is not an error; it yields no results.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),
}

/// Failures while reading a cleaned dataset file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("dataset file not found at: {0}")]
    NotFound(PathBuf),
    #[error("column '{0}' not found")]
    MissingColumn(&'static str),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
