//! Application-level errors

use domain::entities::ErrorKind;
use domain::errors::DomainError;
use thiserror::Error;

/// Errors surfaced by ports and services in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Network failure or timeout while talking to the provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// The API key could not be derived from the legacy page
    #[error("Key derivation failed: {0}")]
    AuthDerivation(String),

    /// The provider rejected the API key even after a refresh
    #[error("Key rejected: {0}")]
    AuthRejected(String),

    /// Malformed payload from the provider
    #[error("Parse error: {0}")]
    Parse(String),

    /// The stop id is unknown to the provider
    #[error("Stop not found: {0}")]
    StopNotFound(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Domain validation failure
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ApplicationError {
    /// Classify this error for a [`domain::StopSnapshot`]'s error field
    #[must_use]
    pub const fn snapshot_kind(&self) -> ErrorKind {
        match self {
            Self::AuthDerivation(_) => ErrorKind::AuthDerivation,
            Self::AuthRejected(_) => ErrorKind::AuthRejected,
            Self::Parse(_) => ErrorKind::Parse,
            Self::StopNotFound(_) => ErrorKind::StopNotFound,
            Self::Transport(_) | Self::Configuration(_) | Self::Domain(_) => ErrorKind::Transport,
        }
    }
}
