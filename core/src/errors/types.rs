//! Token lifecycle errors surfaced to callers as distinct kinds

use thiserror::Error;

/// Token-specific failures
///
/// Why a refresh token stopped working is never reported here; refresh
/// answers `None` for every such case.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Principal not found: {principal_id}")]
    PrincipalNotFound { principal_id: String },

    #[error("Token generation failed: {reason}")]
    GenerationFailed { reason: String },

    #[error("Refresh lifetime of {lifetime_seconds}s does not fit in a timestamp")]
    ExpiryOverflow { lifetime_seconds: i64 },
}

impl TokenError {
    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            TokenError::PrincipalNotFound { .. } => "PRINCIPAL_NOT_FOUND",
            TokenError::GenerationFailed { .. } => "TOKEN_GENERATION_FAILED",
            TokenError::ExpiryOverflow { .. } => "TOKEN_EXPIRY_OVERFLOW",
        }
    }
}
