//! Token entities for refresh/access pair lifecycle.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::principal::PrincipalId;
use crate::errors::TokenError;

/// Hex characters kept from the SHA-256 digest when identifying a token in logs
const FINGERPRINT_LEN: usize = 12;

/// Hex SHA-256 of a token value, used where a value must be remembered
/// without being kept
pub fn value_digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Short, non-reversible identifier for a secret token value
///
/// Raw refresh and access values never appear in logs; this digest prefix
/// does instead.
pub fn value_fingerprint(value: &str) -> String {
    let mut encoded = value_digest(value);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}

/// Persisted state of one issued refresh/access pair
///
/// A record only moves forward: it is created live, and then either replaced
/// by rotation, revoked, deleted with its principal, or left to expire.
/// Expiry is derived from `expires_at`, never stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Row identifier
    pub id: Uuid,

    /// Owning principal, immutable after creation
    pub principal_id: PrincipalId,

    /// Single-use refresh value, unique across every record ever issued
    pub refresh_value: String,

    /// Access value paired with this refresh value
    pub access_value: String,

    /// Creation or last rotation time
    pub issued_at: DateTime<Utc>,

    /// First instant at which the refresh value is no longer honored
    pub expires_at: DateTime<Utc>,

    /// Terminal revocation flag
    pub revoked: bool,
}

impl TokenRecord {
    /// Creates a fresh, live record
    ///
    /// # Arguments
    ///
    /// * `principal_id` - Owner of the pair
    /// * `refresh_value` - Newly generated refresh value
    /// * `access_value` - Newly generated access value
    /// * `now` - Issue instant taken from the manager's clock
    /// * `lifetime` - Configured refresh lifetime
    ///
    /// # Returns
    ///
    /// * `Err(TokenError::ExpiryOverflow)` - `now + lifetime` is not a valid timestamp
    pub fn issue(
        principal_id: PrincipalId,
        refresh_value: String,
        access_value: String,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<Self, TokenError> {
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or(TokenError::ExpiryOverflow {
                lifetime_seconds: lifetime.num_seconds(),
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            principal_id,
            refresh_value,
            access_value,
            issued_at: now,
            expires_at,
            revoked: false,
        })
    }

    /// `true` once `now` has reached `expires_at`; the boundary itself is expired
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Neither revoked nor expired at `now`
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }

    /// Marks the record revoked
    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    /// Time left before expiry, or zero
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Duration {
        if self.expires_at > now {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }

    /// Log-safe identifier of the refresh value
    pub fn fingerprint(&self) -> String {
        value_fingerprint(&self.refresh_value)
    }
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("id", &self.id)
            .field("principal_id", &self.principal_id)
            .field("refresh", &self.fingerprint())
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("revoked", &self.revoked)
            .finish_non_exhaustive()
    }
}

/// New credentials handed back after a successful refresh
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access value for subsequent requests
    pub access_value: String,

    /// Replacement refresh value; the one presented is now dead
    pub refresh_value: String,

    /// Expiry of the new refresh value
    pub expires_at: DateTime<Utc>,
}

impl From<&TokenRecord> for TokenPair {
    fn from(record: &TokenRecord) -> Self {
        Self {
            access_value: record.access_value.clone(),
            refresh_value: record.refresh_value.clone(),
            expires_at: record.expires_at,
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("refresh", &value_fingerprint(&self.refresh_value))
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
