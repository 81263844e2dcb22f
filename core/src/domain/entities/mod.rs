//! Domain entities representing token state and its owner.

pub mod principal;
pub mod token;


pub use principal::PrincipalId;
pub use token::{value_digest, value_fingerprint, TokenPair, TokenRecord};
