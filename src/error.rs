//! Error types for Reelcast.

use std::time::Duration;
use thiserror::Error;

/// Library-level error type for Reelcast operations.
#[derive(Error, Debug)]
pub enum ReelcastError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Job submission failed: {0}")]
    Submission(String),

    #[error("Job status check failed: {message}")]
    Poll { message: String, transient: bool },

    #[error("Remote job failed: {0}")]
    RemoteJobFailed(String),

    #[error("Job {job} did not finish within {waited:?}")]
    PollTimeout { job: String, waited: Duration },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Artifact download failed: {message}")]
    ArtifactDownload { message: String, transient: bool },

    #[error("{0}")]
    Extraction(String),

    #[error("Speech synthesis failed: {0}")]
    Speech(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Reelcast operations.
pub type Result<T> = std::result::Result<T, ReelcastError>;

impl ReelcastError {
    /// Whether retrying the failed operation could succeed.
    ///
    /// Only network faults, timeouts, server errors and rate limiting qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            ReelcastError::Poll { transient, .. } => *transient,
            ReelcastError::ArtifactDownload { transient, .. } => *transient,
            ReelcastError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Whether an HTTP status is worth retrying (server errors and rate limiting).
pub fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}
