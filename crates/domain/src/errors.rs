//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// Stop identifier failed validation
    #[error("Invalid stop id: {0}")]
    InvalidStopId(String),

    /// Line filter expression failed validation
    #[error("Invalid line filter: {0}")]
    InvalidLineFilter(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}
