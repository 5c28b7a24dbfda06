// crates/recall-server/src/error.rs
// Standardized error types for the Recall engine

use thiserror::Error;

/// Main error type for the Recall library.
///
/// The pipeline recovers low and reports only terminal failures:
/// `InvalidInput` and `Fatal` are the only variants a caller of
/// `ContextPipeline::retrieve` will ever see; everything else is handled
/// internally and logged.
#[derive(Error, Debug)]
pub enum RecallError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("intent analysis failed: {0}")]
    Plan(String),

    #[error("dimension {dimension} failed: {cause}")]
    Dimension {
        dimension: &'static str,
        cause: String,
    },

    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("all retrieval dimensions failed: {0}")]
    Fatal(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("task cancelled")]
    Cancelled,

    #[error("unknown error: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Convenience type alias for Result using RecallError
pub type Result<T> = std::result::Result<T, RecallError>;

impl RecallError {
    /// Terminal errors cross the public retrieval boundary; the rest are
    /// recovered by fallbacks
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecallError::InvalidInput(_) | RecallError::Fatal(_))
    }
}

impl From<String> for RecallError {
    fn from(s: String) -> Self {
        RecallError::Other(s)
    }
}

impl From<tokio::task::JoinError> for RecallError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            RecallError::Cancelled
        } else {
            RecallError::Other(err.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for RecallError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RecallError::Cancelled
    }
}
