//! In-memory implementation of TokenStore
//!
//! Reference backend for tests and single-process deployments. All state sits
//! behind one lock and every operation completes inside a single critical
//! section with no `.await` while the guard is held, which is what makes each
//! call atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::{value_digest, PrincipalId, TokenRecord};
use crate::errors::DomainError;

use super::r#trait::TokenStore;

#[derive(Default)]
struct Inner {
    /// Records keyed by refresh value
    records: HashMap<String, TokenRecord>,
    /// principal -> refresh value of the record it owns
    by_principal: HashMap<PrincipalId, String>,
    /// Digests of every refresh value ever accepted; never shrinks
    issued: HashSet<String>,
}

impl Inner {
    fn check_insertable(&self, record: &TokenRecord) -> Result<String, DomainError> {
        let digest = value_digest(&record.refresh_value);
        if self.issued.contains(&digest) {
            return Err(DomainError::Conflict {
                resource: "refresh token value".to_string(),
            });
        }
        if self.by_principal.contains_key(&record.principal_id) {
            return Err(DomainError::Conflict {
                resource: "token record for principal".to_string(),
            });
        }
        Ok(digest)
    }

    fn insert(&mut self, digest: String, record: TokenRecord) {
        self.issued.insert(digest);
        self.by_principal
            .insert(record.principal_id.clone(), record.refresh_value.clone());
        self.records.insert(record.refresh_value.clone(), record);
    }

    fn remove(&mut self, refresh_value: &str) -> Option<TokenRecord> {
        let record = self.records.remove(refresh_value)?;
        if self.by_principal.get(&record.principal_id).map(String::as_str) == Some(refresh_value) {
            self.by_principal.remove(&record.principal_id);
        }
        Some(record)
    }
}

/// Token store backed by process memory
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryTokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn create(&self, record: TokenRecord) -> Result<TokenRecord, DomainError> {
        let mut inner = self.inner.write().await;
        let digest = inner.check_insertable(&record)?;
        inner.insert(digest, record.clone());
        Ok(record)
    }

    async fn find_by_refresh_value(&self, refresh_value: &str) -> Result<Option<TokenRecord>, DomainError> {
        let inner = self.inner.read().await;
        Ok(inner.records.get(refresh_value).cloned())
    }

    async fn find_by_principal(&self, principal_id: &PrincipalId) -> Result<Option<TokenRecord>, DomainError> {
        let inner = self.inner.read().await;
        let Some(refresh_value) = inner.by_principal.get(principal_id) else {
            return Ok(None);
        };

        debug_assert!(
            inner.records.values().filter(|r| &r.principal_id == principal_id).count() <= 1,
            "principal index out of step with records"
        );

        match inner.records.get(refresh_value) {
            Some(record) if &record.principal_id == principal_id => Ok(Some(record.clone())),
            _ => Err(DomainError::Internal {
                message: format!("principal index is stale for principal {}", principal_id),
            }),
        }
    }

    async fn delete(&self, refresh_value: &str) -> Result<bool, DomainError> {
        let mut inner = self.inner.write().await;
        Ok(inner.remove(refresh_value).is_some())
    }

    async fn update(&self, record: TokenRecord) -> Result<bool, DomainError> {
        let mut inner = self.inner.write().await;
        match inner.records.get_mut(&record.refresh_value) {
            Some(existing) if existing.principal_id == record.principal_id => {
                *existing = record;
                Ok(true)
            }
            Some(_) => Err(DomainError::Internal {
                message: "update attempted to change the owner of a token record".to_string(),
            }),
            None => Ok(false),
        }
    }

    async fn rotate(&self, consumed: &str, replacement: TokenRecord) -> Result<bool, DomainError> {
        let mut inner = self.inner.write().await;

        let Some(old) = inner.records.get(consumed).filter(|r| !r.revoked) else {
            return Ok(false);
        };
        if old.principal_id != replacement.principal_id {
            return Err(DomainError::Internal {
                message: "rotation replacement belongs to a different principal".to_string(),
            });
        }

        // Validate before mutating so a conflict leaves the old record in place.
        let digest = value_digest(&replacement.refresh_value);
        if inner.issued.contains(&digest) {
            return Err(DomainError::Conflict {
                resource: "refresh token value".to_string(),
            });
        }

        inner.remove(consumed);
        inner.insert(digest, replacement);
        Ok(true)
    }

    async fn purge(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut inner = self.inner.write().await;
        let dead: Vec<String> = inner
            .records
            .values()
            .filter(|r| r.revoked || r.expires_at <= cutoff)
            .map(|r| r.refresh_value.clone())
            .collect();

        for value in &dead {
            inner.remove(value);
        }
        Ok(dead.len())
    }
}
