//! Principal repository trait: the token layer's view of principal lifecycle.
//!
//! Principals (users, service accounts) are owned elsewhere. The token layer
//! only needs to know whether one exists and to hear about deletions so it
//! can drop the tokens bound to it.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::entities::PrincipalId;
use crate::errors::DomainError;

/// Boundary to the external principal store
///
/// # Example Implementation
/// ```no_run
/// use async_trait::async_trait;
/// use tokio::sync::broadcast;
/// use tw_core::domain::entities::PrincipalId;
/// use tw_core::errors::DomainError;
/// use tw_core::repositories::PrincipalRepository;
///
/// struct Directory {
///     deletions: broadcast::Sender<PrincipalId>,
/// }
///
/// #[async_trait]
/// impl PrincipalRepository for Directory {
///     async fn exists(&self, id: &PrincipalId) -> Result<bool, DomainError> {
///         // Look the principal up in the user database
///         Ok(false)
///     }
///
///     fn subscribe_deletions(&self) -> broadcast::Receiver<PrincipalId> {
///         self.deletions.subscribe()
///     }
/// }
/// ```
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// Check whether a principal currently exists
    ///
    /// # Returns
    /// * `Ok(true)` - Principal exists
    /// * `Ok(false)` - Principal is unknown or deleted
    /// * `Err(DomainError)` - Lookup failed
    async fn exists(&self, principal_id: &PrincipalId) -> Result<bool, DomainError>;

    /// Subscribe to ids of principals deleted from now on
    ///
    /// Each call returns an independent receiver. Notifications published
    /// before subscribing are not replayed.
    fn subscribe_deletions(&self) -> broadcast::Receiver<PrincipalId>;
}
