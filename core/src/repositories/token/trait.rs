//! Token store trait defining the persistence contract for token records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{PrincipalId, TokenRecord};
use crate::errors::DomainError;

/// Durable keyed storage for [`TokenRecord`]s
///
/// The store never decides whether a record is expired or usable. The token
/// manager makes those decisions and re-reads state on every call.
///
/// # Atomicity
/// Every method must be atomic on its own. In particular [`TokenStore::delete`]
/// is a delete-if-present and [`TokenStore::rotate`] is a compare-and-swap, so
/// two callers racing on the same refresh value resolve to exactly one winner
/// without any lock in the caller.
///
/// # Uniqueness
/// - A refresh value is accepted by `create`/`rotate` at most once for the
///   lifetime of the store, even after the record holding it is deleted.
/// - A principal owns at most one record at a time.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a new record
    ///
    /// # Returns
    /// * `Ok(TokenRecord)` - The stored record
    /// * `Err(DomainError::Conflict)` - The refresh value was issued before, or
    ///   the principal already owns a record
    /// * `Err(DomainError)` - Storage failure
    ///
    /// # Example
    /// ```no_run
    /// # use chrono::{Duration, Utc};
    /// # use tw_core::repositories::TokenStore;
    /// # use tw_core::domain::entities::{PrincipalId, TokenRecord};
    /// # async fn example(store: &impl TokenStore) -> Result<(), Box<dyn std::error::Error>> {
    /// let record = TokenRecord::issue(
    ///     PrincipalId::from("user-a"),
    ///     "refresh".to_string(),
    ///     "access".to_string(),
    ///     Utc::now(),
    ///     Duration::days(1),
    /// )?;
    /// let saved = store.create(record).await?;
    /// println!("Stored record {}", saved.id);
    /// # Ok(())
    /// # }
    /// ```
    async fn create(&self, record: TokenRecord) -> Result<TokenRecord, DomainError>;

    /// Find a record by its refresh value
    ///
    /// # Returns
    /// * `Ok(Some(TokenRecord))` - Record found (it may be revoked or expired)
    /// * `Ok(None)` - No record holds this value
    /// * `Err(DomainError)` - Storage failure
    async fn find_by_refresh_value(&self, refresh_value: &str) -> Result<Option<TokenRecord>, DomainError>;

    /// Find the record owned by a principal
    ///
    /// # Returns
    /// * `Ok(Some(TokenRecord))` - The principal's record
    /// * `Ok(None)` - The principal owns no record
    /// * `Err(DomainError::Internal)` - More than one record exists for the
    ///   principal; implementations must not pick one
    /// * `Err(DomainError)` - Storage failure
    async fn find_by_principal(&self, principal_id: &PrincipalId) -> Result<Option<TokenRecord>, DomainError>;

    /// Delete a record if it is present
    ///
    /// # Returns
    /// * `Ok(true)` - This call removed the record
    /// * `Ok(false)` - No record held this value (already consumed or deleted)
    /// * `Err(DomainError)` - Storage failure
    async fn delete(&self, refresh_value: &str) -> Result<bool, DomainError>;

    /// Replace an existing record, matched by refresh value
    ///
    /// Only used to flip `revoked`.
    ///
    /// # Returns
    /// * `Ok(true)` - Record updated
    /// * `Ok(false)` - The record no longer exists
    /// * `Err(DomainError)` - Storage failure
    async fn update(&self, record: TokenRecord) -> Result<bool, DomainError>;

    /// Atomically consume one refresh value and store its replacement
    ///
    /// Either both the removal of `consumed` and the insert of `replacement`
    /// happen, or neither does. A cancelled call therefore never leaves the
    /// principal with no record at all.
    ///
    /// The swap only happens while `consumed` is still present and not
    /// revoked, so a revocation that lands between the caller's read and this
    /// call is never overwritten by a fresh record.
    ///
    /// # Returns
    /// * `Ok(true)` - `consumed` was removed and `replacement` stored
    /// * `Ok(false)` - `consumed` was already gone or revoked; nothing changed
    /// * `Err(DomainError::Conflict)` - `replacement` violates uniqueness;
    ///   nothing changed
    /// * `Err(DomainError)` - Storage failure; nothing changed
    async fn rotate(&self, consumed: &str, replacement: TokenRecord) -> Result<bool, DomainError>;

    /// Delete every record that is revoked or whose `expires_at` is at or
    /// before `cutoff`
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records removed
    /// * `Err(DomainError)` - Storage failure
    async fn purge(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Check whether a refresh value is currently held by any record
    async fn contains(&self, refresh_value: &str) -> Result<bool, DomainError> {
        Ok(self.find_by_refresh_value(refresh_value).await?.is_some())
    }
}
