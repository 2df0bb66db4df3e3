use solbatch_batch_tx::TxBatchError;
use std::path::PathBuf;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read keypair {}: {reason}", .path.display())]
    Keypair { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operations file is invalid ({0} errors)")]
    Validation(usize),

    #[error("Batch execution failed: {0}")]
    Batch(#[from] TxBatchError),

    #[error("{failed} of {total} operations failed")]
    OperationsFailed { failed: usize, total: usize },
}
