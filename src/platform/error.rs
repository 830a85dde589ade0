//! Crate-wide error types.

use thiserror::Error;

pub type PerftraceResult<T> = Result<T, PerftraceError>;

#[derive(Debug, Error)]
pub enum PerftraceError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("trace error: {0}")]
    Trace(String),

    #[error("report error: {0}")]
    Report(String),
}

