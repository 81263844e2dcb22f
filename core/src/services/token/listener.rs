//! Bridges principal deletion notifications to the token manager

use std::sync::Arc;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::domain::entities::PrincipalId;
use crate::repositories::{PrincipalRepository, TokenStore};

use super::manager::TokenManager;

/// Consumes deletion notifications and cascades them to token records
///
/// Notifications are at-least-once and may be dropped if the listener lags.
/// Dropped ones are not fatal: refresh re-checks that the principal exists.
pub struct PrincipalDeletionListener<S, P, C>
where
    S: TokenStore + 'static,
    P: PrincipalRepository + 'static,
    C: Clock + 'static,
{
    manager: Arc<TokenManager<S, P, C>>,
    receiver: Receiver<PrincipalId>,
}

impl<S, P, C> PrincipalDeletionListener<S, P, C>
where
    S: TokenStore + 'static,
    P: PrincipalRepository + 'static,
    C: Clock + 'static,
{
    /// Subscribe to the manager's principal repository
    ///
    /// Only deletions published after this call are observed.
    pub fn new(manager: Arc<TokenManager<S, P, C>>) -> Self {
        let receiver = manager.principals().subscribe_deletions();
        Self { manager, receiver }
    }

    /// Wait for the next deletion and cascade it
    ///
    /// # Returns
    /// * `Some(PrincipalId)` - The principal that was handled
    /// * `None` - The notification source is gone
    pub async fn process_next(&mut self) -> Option<PrincipalId> {
        loop {
            match self.receiver.recv().await {
                Ok(principal_id) => {
                    if let Err(e) = self.manager.on_principal_deleted(&principal_id).await {
                        error!(
                            principal = %principal_id,
                            error = %e,
                            "Failed to remove token records of deleted principal"
                        );
                    }
                    return Some(principal_id);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Principal deletion notifications dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Run the listener until the notification source closes
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Principal deletion listener started");
            while self.process_next().await.is_some() {}
            info!("Principal deletion listener stopped");
        })
    }
}
