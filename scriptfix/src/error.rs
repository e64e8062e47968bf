//! Fatal error taxonomy for a scriptfix run.
//!
//! Only input and backend failures abort a run. Malformed responses and
//! per-action anomalies are folded into [`crate::core::parse::ParseReport`]
//! and [`crate::io::apply::AppliedSummary`] instead.

use std::time::Duration;

/// Failure while assembling a request envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("render request envelope: {0}")]
    Render(#[from] minijinja::Error),
}

/// Failure of the generation capability. Never retried internally.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("backend error: {0:#}")]
    Backend(anyhow::Error),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

impl GenerationError {
    pub fn backend(message: impl Into<String>) -> Self {
        GenerationError::Backend(anyhow::anyhow!(message.into()))
    }
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Required input empty or unreadable. Raised before any backend call.
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<EnvelopeError> for PipelineError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::MissingInput(what) => PipelineError::MissingInput(what),
            other => PipelineError::Other(anyhow::Error::new(other)),
        }
    }
}
