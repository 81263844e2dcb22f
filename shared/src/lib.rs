//! Shared configuration for the Tokenward crates
//!
//! This crate holds the configuration surface used by the core and
//! infrastructure layers:
//! - Deployment environment and logging settings
//! - Database connection settings
//! - Token lifecycle tunables (refresh lifetime, store timeout, cleanup)

pub mod config;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, DatabaseConfig, Environment, LogFormat, LoggingConfig, TokenConfig,
};
