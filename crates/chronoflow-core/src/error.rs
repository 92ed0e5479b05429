use thiserror::Error;

use crate::types::ColType;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("column {label:?} has type {actual}, expected {expected}")]
    TypeMismatch {
        label: String,
        expected: ColType,
        actual: ColType,
    },

    #[error("table builder already has a column {0:?}")]
    DuplicateColumn(String),

    #[error("column index {idx} out of range ({len} columns)")]
    ColumnIndex { idx: usize, len: usize },

    #[error("table columns have different lengths: {0}")]
    RaggedTable(String),

    // Errors raised by a downstream stage travel back through the sink as text
    // so that `Error` stays `Clone` for fan-out.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
