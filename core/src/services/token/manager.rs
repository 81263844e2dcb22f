//! Token manager: issue, refresh, revoke and principal cascade

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::domain::entities::{value_fingerprint, PrincipalId, TokenPair, TokenRecord};
use crate::errors::{DomainError, DomainResult, TokenError};
use crate::repositories::{PrincipalRepository, TokenStore};

use super::config::TokenManagerConfig;
use super::generator::TokenGenerator;

/// Owns the lifecycle of refresh/access pairs
///
/// The manager holds no token state of its own. Every decision re-reads the
/// store, and every state change is a single atomic store call, so any number
/// of managers may share one store.
pub struct TokenManager<S, P, C = SystemClock>
where
    S: TokenStore,
    P: PrincipalRepository,
    C: Clock,
{
    store: Arc<S>,
    principals: Arc<P>,
    clock: Arc<C>,
    generator: TokenGenerator,
    config: TokenManagerConfig,
}

impl<S, P> TokenManager<S, P, SystemClock>
where
    S: TokenStore,
    P: PrincipalRepository,
{
    /// Creates a manager reading wall-clock time
    ///
    /// # Arguments
    ///
    /// * `store` - Token store backend
    /// * `principals` - Directory used to confirm principals exist
    /// * `config` - Lifetimes, value size and store timeout
    pub fn new(store: Arc<S>, principals: Arc<P>, config: TokenManagerConfig) -> DomainResult<Self> {
        Self::with_clock(store, principals, Arc::new(SystemClock), config)
    }
}

impl<S, P, C> TokenManager<S, P, C>
where
    S: TokenStore,
    P: PrincipalRepository,
    C: Clock,
{
    /// Creates a manager with an explicit clock
    ///
    /// # Returns
    ///
    /// * `Ok(TokenManager)` - Manager ready for use
    /// * `Err(DomainError)` - `config.token_bytes` is too small
    pub fn with_clock(
        store: Arc<S>,
        principals: Arc<P>,
        clock: Arc<C>,
        config: TokenManagerConfig,
    ) -> DomainResult<Self> {
        let generator = TokenGenerator::new(config.token_bytes)?;
        Ok(Self {
            store,
            principals,
            clock,
            generator,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn principals(&self) -> &P {
        &self.principals
    }

    pub fn config(&self) -> &TokenManagerConfig {
        &self.config
    }

    /// Current instant according to the injected clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issues a new pair for a principal
    ///
    /// Any record the principal already owns is deleted first, so after a
    /// successful call the principal owns exactly the returned record.
    ///
    /// The lookup, delete and create are separate store calls. If another
    /// `issue` or a `refresh` for the same principal stores a record in
    /// between, the store refuses the second record and this call returns
    /// `DomainError::Conflict`, leaving the other record in place. Calling
    /// `issue` again supersedes it.
    ///
    /// # Arguments
    ///
    /// * `principal_id` - Principal the pair is issued to
    ///
    /// # Returns
    ///
    /// * `Ok(TokenRecord)` - The stored, live record
    /// * `Err(DomainError::Token(TokenError::PrincipalNotFound))` - Unknown principal
    /// * `Err(DomainError)` - Storage failure, timeout or conflict
    pub async fn issue(&self, principal_id: &PrincipalId) -> DomainResult<TokenRecord> {
        if !self.bounded("principal_exists", self.principals.exists(principal_id)).await? {
            debug!(principal = %principal_id, "Refusing to issue tokens for unknown principal");
            return Err(TokenError::PrincipalNotFound {
                principal_id: principal_id.to_string(),
            }
            .into());
        }

        let existing = self
            .bounded("find_by_principal", self.store.find_by_principal(principal_id))
            .await?;
        if let Some(existing) = existing {
            let removed = self
                .bounded("delete", self.store.delete(&existing.refresh_value))
                .await?;
            debug!(
                principal = %principal_id,
                superseded = %existing.fingerprint(),
                removed,
                "Superseding previous token record"
            );
        }

        let record = self.new_record(principal_id.clone())?;
        let saved = self.bounded("create", self.store.create(record)).await?;

        info!(
            principal = %principal_id,
            token = %saved.fingerprint(),
            expires_at = %saved.expires_at,
            "Issued token pair"
        );
        Ok(saved)
    }

    /// Exchanges a refresh value for a new pair
    ///
    /// The presented value is consumed: on success it is gone from the store
    /// and a record with fresh values and a fresh expiry takes its place.
    /// Among concurrent calls with the same value at most one succeeds.
    ///
    /// Unknown, revoked, expired and already-consumed values all yield
    /// `Ok(None)` without saying which; only infrastructure failures are errors.
    ///
    /// Dropping the returned future before it completes leaves the presented
    /// value either fully consumed (if the rotation already committed) or
    /// fully usable.
    ///
    /// # Arguments
    ///
    /// * `refresh_value` - Value presented by the client
    ///
    /// # Returns
    ///
    /// * `Ok(Some(TokenPair))` - New credentials
    /// * `Ok(None)` - Refresh refused
    /// * `Err(DomainError)` - Storage failure or timeout
    pub async fn refresh(&self, refresh_value: &str) -> DomainResult<Option<TokenPair>> {
        let fingerprint = value_fingerprint(refresh_value);

        let current = self
            .bounded("find_by_refresh_value", self.store.find_by_refresh_value(refresh_value))
            .await?;
        let Some(current) = current else {
            debug!(token = %fingerprint, reason = "unknown", "Refresh refused");
            return Ok(None);
        };

        if current.revoked {
            debug!(token = %fingerprint, reason = "revoked", "Refresh refused");
            return Ok(None);
        }

        let now = self.clock.now();
        if current.is_expired_at(now) {
            debug!(
                token = %fingerprint,
                reason = "expired",
                expires_at = %current.expires_at,
                "Refresh refused"
            );
            if self.config.purge_expired_on_read {
                if let Err(e) = self.bounded("delete", self.store.delete(refresh_value)).await {
                    warn!(token = %fingerprint, error = %e, "Failed to delete expired token record");
                }
            }
            return Ok(None);
        }

        // Catches a principal whose deletion notification was missed or is
        // still in flight.
        if !self
            .bounded("principal_exists", self.principals.exists(&current.principal_id))
            .await?
        {
            let removed = self.bounded("delete", self.store.delete(refresh_value)).await?;
            warn!(
                principal = %current.principal_id,
                token = %fingerprint,
                removed,
                "Refresh refused for deleted principal"
            );
            return Ok(None);
        }

        let replacement = self.new_record(current.principal_id.clone())?;
        let pair = TokenPair::from(&replacement);

        let rotated = self
            .bounded("rotate", self.store.rotate(refresh_value, replacement))
            .await?;
        if !rotated {
            debug!(token = %fingerprint, reason = "consumed", "Refresh refused");
            return Ok(None);
        }

        info!(
            principal = %current.principal_id,
            consumed = %fingerprint,
            token = %value_fingerprint(&pair.refresh_value),
            expires_at = %pair.expires_at,
            "Rotated refresh token"
        );
        Ok(Some(pair))
    }

    /// Revokes a record on behalf of its owner
    ///
    /// Revocation is terminal and idempotent. The record is looked up again
    /// by its refresh value; a record that is already gone, or that the
    /// principal does not own, is left alone.
    ///
    /// # Arguments
    ///
    /// * `principal_id` - Principal requesting revocation
    /// * `record` - Record previously returned by `issue` or looked up by value
    pub async fn revoke(&self, principal_id: &PrincipalId, record: &TokenRecord) -> DomainResult<()> {
        let fingerprint = record.fingerprint();

        if &record.principal_id != principal_id {
            warn!(
                principal = %principal_id,
                owner = %record.principal_id,
                token = %fingerprint,
                "Ignoring revocation of a record owned by another principal"
            );
            return Ok(());
        }

        let current = self
            .bounded("find_by_refresh_value", self.store.find_by_refresh_value(&record.refresh_value))
            .await?;
        let Some(mut current) = current else {
            debug!(principal = %principal_id, token = %fingerprint, "Revocation target already gone");
            return Ok(());
        };

        if &current.principal_id != principal_id {
            warn!(
                principal = %principal_id,
                owner = %current.principal_id,
                token = %fingerprint,
                "Ignoring revocation of a record owned by another principal"
            );
            return Ok(());
        }

        if current.revoked {
            return Ok(());
        }

        current.revoke();
        let updated = self.bounded("update", self.store.update(current)).await?;

        info!(principal = %principal_id, token = %fingerprint, updated, "Revoked token record");
        Ok(())
    }

    /// Revokes whatever record a principal currently owns
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A live record was revoked
    /// * `Ok(false)` - The principal owned no unrevoked record
    pub async fn revoke_all(&self, principal_id: &PrincipalId) -> DomainResult<bool> {
        let existing = self
            .bounded("find_by_principal", self.store.find_by_principal(principal_id))
            .await?;
        match existing {
            Some(record) if !record.revoked => {
                self.revoke(principal_id, &record).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Removes every record of a deleted principal
    ///
    /// Idempotent: a second notification for the same principal is a no-op.
    pub async fn on_principal_deleted(&self, principal_id: &PrincipalId) -> DomainResult<()> {
        let existing = self
            .bounded("find_by_principal", self.store.find_by_principal(principal_id))
            .await?;
        let Some(existing) = existing else {
            debug!(principal = %principal_id, "Deleted principal owned no token record");
            return Ok(());
        };

        let removed = self
            .bounded("delete", self.store.delete(&existing.refresh_value))
            .await?;
        info!(
            principal = %principal_id,
            token = %existing.fingerprint(),
            removed,
            "Removed token record of deleted principal"
        );
        Ok(())
    }

    /// Looks up a record by refresh value without judging it
    pub async fn find_by_refresh_value(&self, refresh_value: &str) -> DomainResult<Option<TokenRecord>> {
        self.bounded("find_by_refresh_value", self.store.find_by_refresh_value(refresh_value))
            .await
    }

    /// Whether a record is neither revoked nor expired right now
    pub fn is_live(&self, record: &TokenRecord) -> bool {
        record.is_live_at(self.clock.now())
    }

    /// Deletes every revoked or expired record
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of records removed
    pub async fn purge_dead(&self) -> DomainResult<usize> {
        let now = self.clock.now();
        self.bounded("purge", self.store.purge(now)).await
    }

    fn new_record(&self, principal_id: PrincipalId) -> DomainResult<TokenRecord> {
        let refresh_value = self.generator.generate()?;
        let access_value = self.generator.generate()?;
        let record = TokenRecord::issue(
            principal_id,
            refresh_value,
            access_value,
            self.clock.now(),
            self.config.refresh_lifetime,
        )?;
        Ok(record)
    }

    /// Runs a store or directory call under the configured timeout
    ///
    /// A timed-out call is dropped, which the atomic store contract turns
    /// into "nothing happened" unless the backend had already committed.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        let result = match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.config.store_timeout.as_millis() as u64,
                    "Token store call timed out"
                );
                return Err(DomainError::Storage {
                    message: format!("{} timed out after {:?}", operation, self.config.store_timeout),
                });
            }
        };

        if let Err(DomainError::Internal { message }) = &result {
            error!(operation, %message, "Token store invariant violated");
        }
        result
    }
}
