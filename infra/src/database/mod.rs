//! Database module - MySQL implementations using SQLx
//!
//! - Connection pool management
//! - Durable token store
//! - Principal directory with deletion polling

pub mod connection;
pub mod mysql;


// Re-export commonly used types
pub use connection::{DatabasePool, PoolStatistics};
pub use mysql::{MySqlPrincipalDirectory, MySqlTokenStore};
