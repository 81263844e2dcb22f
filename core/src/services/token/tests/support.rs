//! Shared fixtures for token service tests

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::ManualClock;
use crate::domain::entities::{PrincipalId, TokenRecord};
use crate::errors::DomainError;
use crate::repositories::{InMemoryPrincipalRepository, InMemoryTokenStore, TokenStore};
use crate::services::token::{TokenManager, TokenManagerConfig};

pub type TestManager = TokenManager<InMemoryTokenStore, InMemoryPrincipalRepository, ManualClock>;

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn test_config() -> TokenManagerConfig {
    TokenManagerConfig::default()
        .with_refresh_lifetime(Duration::days(1))
        .with_store_timeout(std::time::Duration::from_secs(2))
}

pub struct Fixture {
    pub manager: Arc<TestManager>,
    pub store: Arc<InMemoryTokenStore>,
    pub principals: Arc<InMemoryPrincipalRepository>,
    pub clock: ManualClock,
}

/// Manager over fresh in-memory backends with `user-a` and `user-b` registered
pub async fn fixture() -> Fixture {
    fixture_with(InMemoryPrincipalRepository::new()).await
}

pub async fn fixture_with(principals: InMemoryPrincipalRepository) -> Fixture {
    let store = Arc::new(InMemoryTokenStore::new());
    let principals = Arc::new(principals);
    principals.create(PrincipalId::from("user-a")).await.unwrap();
    principals.create(PrincipalId::from("user-b")).await.unwrap();
    let clock = ManualClock::new(epoch());

    let manager = TokenManager::with_clock(
        store.clone(),
        principals.clone(),
        Arc::new(clock.clone()),
        test_config(),
    )
    .unwrap();

    Fixture {
        manager: Arc::new(manager),
        store,
        principals,
        clock,
    }
}

/// When `rotate` sleeps relative to the wrapped store's commit
#[derive(Debug, Clone, Copy)]
pub enum Stall {
    BeforeCommit,
    AfterCommit,
}

/// Store whose `rotate` stalls while `stalling` is set
pub struct StallingStore {
    pub inner: InMemoryTokenStore,
    pub stall: Stall,
    pub stalling: AtomicBool,
    pub delay: std::time::Duration,
}

impl StallingStore {
    pub fn new(stall: Stall) -> Self {
        Self {
            inner: InMemoryTokenStore::new(),
            stall,
            stalling: AtomicBool::new(true),
            delay: std::time::Duration::from_millis(500),
        }
    }

    async fn pause(&self) {
        if self.stalling.load(Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl TokenStore for StallingStore {
    async fn create(&self, record: TokenRecord) -> Result<TokenRecord, DomainError> {
        self.inner.create(record).await
    }

    async fn find_by_refresh_value(&self, refresh_value: &str) -> Result<Option<TokenRecord>, DomainError> {
        self.inner.find_by_refresh_value(refresh_value).await
    }

    async fn find_by_principal(&self, principal_id: &PrincipalId) -> Result<Option<TokenRecord>, DomainError> {
        self.inner.find_by_principal(principal_id).await
    }

    async fn delete(&self, refresh_value: &str) -> Result<bool, DomainError> {
        self.inner.delete(refresh_value).await
    }

    async fn update(&self, record: TokenRecord) -> Result<bool, DomainError> {
        self.inner.update(record).await
    }

    async fn rotate(&self, consumed: &str, replacement: TokenRecord) -> Result<bool, DomainError> {
        match self.stall {
            Stall::BeforeCommit => {
                self.pause().await;
                self.inner.rotate(consumed, replacement).await
            }
            Stall::AfterCommit => {
                let rotated = self.inner.rotate(consumed, replacement).await;
                self.pause().await;
                rotated
            }
        }
    }

    async fn purge(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        self.inner.purge(cutoff).await
    }
}

/// Store that lets a refresh rotate the record an `issue` is about to delete
///
/// While `interleave` is set, the next `delete` first rotates the value it
/// was asked to remove, so the delete finds nothing and the caller's follow-up
/// `create` meets the replacement.
pub struct RefreshingStore {
    pub inner: InMemoryTokenStore,
    pub interleave: AtomicBool,
}

impl RefreshingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryTokenStore::new(),
            interleave: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl TokenStore for RefreshingStore {
    async fn create(&self, record: TokenRecord) -> Result<TokenRecord, DomainError> {
        self.inner.create(record).await
    }

    async fn find_by_refresh_value(&self, refresh_value: &str) -> Result<Option<TokenRecord>, DomainError> {
        self.inner.find_by_refresh_value(refresh_value).await
    }

    async fn find_by_principal(&self, principal_id: &PrincipalId) -> Result<Option<TokenRecord>, DomainError> {
        self.inner.find_by_principal(principal_id).await
    }

    async fn delete(&self, refresh_value: &str) -> Result<bool, DomainError> {
        if self.interleave.swap(false, Ordering::SeqCst) {
            if let Some(current) = self.inner.find_by_refresh_value(refresh_value).await? {
                let replacement = TokenRecord::issue(
                    current.principal_id,
                    "refreshed-in-between".to_string(),
                    "refreshed-access".to_string(),
                    epoch(),
                    Duration::days(1),
                )
                .unwrap();
                self.inner.rotate(refresh_value, replacement).await?;
            }
        }
        self.inner.delete(refresh_value).await
    }

    async fn update(&self, record: TokenRecord) -> Result<bool, DomainError> {
        self.inner.update(record).await
    }

    async fn rotate(&self, consumed: &str, replacement: TokenRecord) -> Result<bool, DomainError> {
        self.inner.rotate(consumed, replacement).await
    }

    async fn purge(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        self.inner.purge(cutoff).await
    }
}

/// Store that fails every call
pub struct UnavailableStore;

#[async_trait]
impl TokenStore for UnavailableStore {
    async fn create(&self, _record: TokenRecord) -> Result<TokenRecord, DomainError> {
        Err(DomainError::storage("connection refused"))
    }

    async fn find_by_refresh_value(&self, _refresh_value: &str) -> Result<Option<TokenRecord>, DomainError> {
        Err(DomainError::storage("connection refused"))
    }

    async fn find_by_principal(&self, _principal_id: &PrincipalId) -> Result<Option<TokenRecord>, DomainError> {
        Err(DomainError::storage("connection refused"))
    }

    async fn delete(&self, _refresh_value: &str) -> Result<bool, DomainError> {
        Err(DomainError::storage("connection refused"))
    }

    async fn update(&self, _record: TokenRecord) -> Result<bool, DomainError> {
        Err(DomainError::storage("connection refused"))
    }

    async fn rotate(&self, _consumed: &str, _replacement: TokenRecord) -> Result<bool, DomainError> {
        Err(DomainError::storage("connection refused"))
    }

    async fn purge(&self, _cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        Err(DomainError::storage("connection refused"))
    }
}
