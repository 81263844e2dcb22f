//! # Tokenward Core
//!
//! Refresh/access token lifecycle: issue, single-use rotation, revocation and
//! cascade on principal deletion. Persistence is reached through the
//! [`TokenStore`] and [`PrincipalRepository`] traits; in-memory
//! implementations of both are included.

pub mod clock;
pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::entities::{value_fingerprint, PrincipalId, TokenPair, TokenRecord};
pub use errors::{DomainError, DomainResult, TokenError};
pub use repositories::{
    InMemoryPrincipalRepository, InMemoryTokenStore, PrincipalRepository, TokenStore,
};
pub use services::{
    PrincipalDeletionListener, TokenCleanupService, TokenManager, TokenManagerConfig,
};
