//! ANM integration error types

use application::ApplicationError;
use thiserror::Error;

/// Errors that can occur while talking to the ANM service
#[derive(Debug, Error)]
pub enum AnmError {
    /// Connection to the service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP request failed with a non-success status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Request timed out
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// Failed to parse a response payload
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The API key could not be derived from the legacy InfoClick page
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// The service rejected the API key even after a refresh
    #[error("Key rejected: {0}")]
    KeyRejected(String),

    /// The stop id is not in the provider's directory
    #[error("Stop not found: {stop_id}")]
    StopNotFound {
        /// The unknown stop id
        stop_id: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl AnmError {
    /// Returns true if the condition can heal on a later cycle
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::RequestFailed(_)
                | Self::Timeout { .. }
                | Self::KeyDerivationFailed(_)
                | Self::KeyRejected(_)
        )
    }
}

impl From<AnmError> for ApplicationError {
    fn from(err: AnmError) -> Self {
        match err {
            AnmError::ConnectionFailed(message) | AnmError::RequestFailed(message) => {
                Self::Transport(message)
            },
            AnmError::Timeout { timeout_secs } => {
                Self::Transport(format!("request timed out after {timeout_secs} seconds"))
            },
            AnmError::ParseError(message) => Self::Parse(message),
            AnmError::KeyDerivationFailed(message) => Self::AuthDerivation(message),
            AnmError::KeyRejected(message) => Self::AuthRejected(message),
            AnmError::StopNotFound { stop_id } => Self::StopNotFound(stop_id),
            AnmError::ConfigurationError(message) => Self::Configuration(message),
        }
    }
}
