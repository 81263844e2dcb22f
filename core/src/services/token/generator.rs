//! Generation of unguessable refresh and access values

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use tw_shared::config::token::MIN_TOKEN_BYTES;

use crate::errors::{DomainError, TokenError};

/// Produces opaque, URL-safe token values from the operating system CSPRNG
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    byte_len: usize,
}

impl TokenGenerator {
    /// Creates a generator emitting `byte_len` random bytes per value
    ///
    /// # Returns
    ///
    /// * `Ok(TokenGenerator)` - Generator ready for use
    /// * `Err(DomainError)` - `byte_len` is below the minimum safe size
    pub fn new(byte_len: usize) -> Result<Self, DomainError> {
        if byte_len < MIN_TOKEN_BYTES {
            return Err(TokenError::GenerationFailed {
                reason: format!("token size {} is below the minimum of {} bytes", byte_len, MIN_TOKEN_BYTES),
            }
            .into());
        }
        Ok(Self { byte_len })
    }

    /// Generates a new value, base64url-encoded without padding
    pub fn generate(&self) -> Result<String, DomainError> {
        let mut bytes = vec![0u8; self.byte_len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TokenError::GenerationFailed {
                reason: e.to_string(),
            })?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Length in characters of every generated value
    pub fn encoded_len(&self) -> usize {
        (self.byte_len * 4 + 2) / 3
    }
}
