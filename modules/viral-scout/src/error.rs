use std::time::Duration;

use thiserror::Error;

use crate::launcher::ProviderFailure;

pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("No upstream actor could be started ({} tried). Last error: {last_error}", .attempts.len())]
    ProviderExhausted {
        attempts: Vec<ProviderFailure>,
        last_error: String,
    },

    #[error("Upstream run ended with status: {status}. Message: {message}")]
    UpstreamJobFailure { status: String, message: String },

    #[error("Polling timed out after {}s", .timeout.as_secs())]
    PollingTimeout { timeout: Duration },

    #[error("Upstream response is missing {0}")]
    MissingRunArtifact(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Platform(#[from] anyhow::Error),
}

impl From<std::io::Error> for ScoutError {
    fn from(err: std::io::Error) -> Self {
        ScoutError::Storage(err.to_string())
    }
}
