//! In-memory principal repository
//!
//! Stands in for the external user store in tests and embedded setups.
//! Deleting a principal publishes its id to every deletion subscriber.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::domain::entities::PrincipalId;
use crate::errors::DomainError;

use super::trait_::PrincipalRepository;

/// Default deletion channel buffer
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Principal repository backed by process memory
#[derive(Clone)]
pub struct InMemoryPrincipalRepository {
    principals: Arc<RwLock<HashSet<PrincipalId>>>,
    deletions: broadcast::Sender<PrincipalId>,
}

impl InMemoryPrincipalRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create an empty repository whose deletion channel buffers `capacity`
    /// notifications per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        let (deletions, _) = broadcast::channel(capacity.max(1));
        Self {
            principals: Arc::new(RwLock::new(HashSet::new())),
            deletions,
        }
    }

    /// Register a principal
    ///
    /// # Returns
    /// * `Ok(())` - Principal registered
    /// * `Err(DomainError::Conflict)` - Principal already exists
    pub async fn create(&self, principal_id: PrincipalId) -> Result<(), DomainError> {
        let mut principals = self.principals.write().await;
        if !principals.insert(principal_id) {
            return Err(DomainError::Conflict {
                resource: "principal".to_string(),
            });
        }
        Ok(())
    }

    /// Remove a principal and notify deletion subscribers
    ///
    /// # Returns
    /// * `Ok(true)` - Principal removed and notification published
    /// * `Ok(false)` - Principal did not exist
    pub async fn delete(&self, principal_id: &PrincipalId) -> Result<bool, DomainError> {
        let removed = self.principals.write().await.remove(principal_id);
        if removed {
            // No subscribers is not an error; the token manager also checks
            // existence on refresh.
            let receivers = self.deletions.send(principal_id.clone()).unwrap_or(0);
            debug!(principal = %principal_id, receivers, "Published principal deletion");
        }
        Ok(removed)
    }

    /// Number of registered principals
    pub async fn len(&self) -> usize {
        self.principals.read().await.len()
    }

    /// Whether no principals are registered
    pub async fn is_empty(&self) -> bool {
        self.principals.read().await.is_empty()
    }
}

impl Default for InMemoryPrincipalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrincipalRepository for InMemoryPrincipalRepository {
    async fn exists(&self, principal_id: &PrincipalId) -> Result<bool, DomainError> {
        Ok(self.principals.read().await.contains(principal_id))
    }

    fn subscribe_deletions(&self) -> broadcast::Receiver<PrincipalId> {
        self.deletions.subscribe()
    }
}
