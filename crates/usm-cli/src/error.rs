//! CLI error types

use thiserror::Error;
use usm_core::PoolError;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Malformed instruction line
    #[error("Parse error: {0}")]
    Parse(String),

    /// Instruction rejected by the pool engine
    #[error("Rejected: {0}")]
    Pool(#[from] PoolError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
