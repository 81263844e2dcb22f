//! Services containing the token lifecycle logic.

pub mod token;

pub use token::{
    CleanupResult, PrincipalDeletionListener, TokenCleanupConfig, TokenCleanupService,
    TokenGenerator, TokenManager, TokenManagerConfig,
};
