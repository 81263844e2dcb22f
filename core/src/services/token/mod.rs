//! Token lifecycle services
//!
//! - Issuing refresh/access pairs bound to a principal
//! - Single-use refresh with atomic rotation
//! - Revocation and cascade on principal deletion
//! - Background purge of dead records

mod cleanup;
mod config;
mod generator;
mod listener;
mod manager;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupResult, TokenCleanupService};
pub use config::{TokenCleanupConfig, TokenManagerConfig};
pub use generator::TokenGenerator;
pub use listener::PrincipalDeletionListener;
pub use manager::TokenManager;
