//! Error types for HealthRAG.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Missing credential for provider '{0}'")]
    MissingCredential(String),

    #[error("Retrieval error: {reason}")]
    Retrieval { reason: String },

    #[error("Generation error ({provider}): {cause}")]
    Generation { provider: String, cause: String },

    #[error("Timed out after {after:?} during {operation}")]
    Timeout { operation: String, after: Duration },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn retrieval(reason: impl Into<String>) -> Self {
        Self::Retrieval {
            reason: reason.into(),
        }
    }

    pub fn generation(provider: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Generation {
            provider: provider.into(),
            cause: cause.to_string(),
        }
    }

    /// True for failures the caller must fix by reconfiguring, not by retrying.
    pub fn is_fatal_config(&self) -> bool {
        matches!(
            self,
            Self::UnknownProvider(_) | Self::MissingCredential(_) | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
