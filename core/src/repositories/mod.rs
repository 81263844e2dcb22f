//! Persistence contracts and their in-memory reference implementations.

pub mod principal;
pub mod token;

pub use principal::{InMemoryPrincipalRepository, PrincipalRepository};
pub use token::{InMemoryTokenStore, TokenStore};
