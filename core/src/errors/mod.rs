//! Domain-specific error types and error handling.

mod types;


pub use types::TokenError;

use thiserror::Error;

/// Core domain errors
///
/// Soft refresh failures (unknown, revoked, expired, superseded tokens) are
/// never represented here; they are `Ok(None)` from the refresh operation.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Conflict: {resource} already exists")]
    Conflict { resource: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Storage unavailable: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl DomainError {
    /// Build a storage error from any displayable backend failure
    pub fn storage(err: impl std::fmt::Display) -> Self {
        DomainError::Storage {
            message: err.to_string(),
        }
    }

    /// Whether the failure may succeed if the caller retries later
    ///
    /// The token manager never retries on its own; retrying a rotation can
    /// consume a single-use token twice.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Storage { .. })
    }

    /// Stable machine-readable code for logs and outer layers
    pub fn error_code(&self) -> &'static str {
        match self {
            DomainError::Conflict { .. } => "CONFLICT",
            DomainError::NotFound { .. } => "NOT_FOUND",
            DomainError::Storage { .. } => "STORAGE_UNAVAILABLE",
            DomainError::Internal { .. } => "INTERNAL_ERROR",
            DomainError::Token(err) => err.error_code(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
