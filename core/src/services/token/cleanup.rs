//! Periodic removal of dead token records
//!
//! Revoked and expired records are already unusable; this service only
//! reclaims the space they occupy.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::errors::DomainError;
use crate::repositories::{PrincipalRepository, TokenStore};

use super::config::TokenCleanupConfig;
use super::manager::TokenManager;

/// Service that purges revoked and expired records on a timer
pub struct TokenCleanupService<S, P, C>
where
    S: TokenStore + 'static,
    P: PrincipalRepository + 'static,
    C: Clock + 'static,
{
    manager: Arc<TokenManager<S, P, C>>,
    config: TokenCleanupConfig,
}

impl<S, P, C> TokenCleanupService<S, P, C>
where
    S: TokenStore + 'static,
    P: PrincipalRepository + 'static,
    C: Clock + 'static,
{
    /// Create a new token cleanup service
    pub fn new(manager: Arc<TokenManager<S, P, C>>, config: TokenCleanupConfig) -> Self {
        Self { manager, config }
    }

    /// Run a single cleanup cycle
    ///
    /// # Returns
    /// * `Ok(CleanupResult)` - Summary of the cycle; store failures are
    ///   collected in `errors` rather than returned
    /// * `Err(DomainError)` - Reserved for failures outside the store
    pub async fn run_cleanup(&self) -> Result<CleanupResult, DomainError> {
        if !self.config.enabled {
            return Ok(CleanupResult::default());
        }

        info!("Starting token cleanup cycle");

        let mut result = CleanupResult::default();

        match self.manager.purge_dead().await {
            Ok(count) => {
                result.records_purged = count;
            }
            Err(e) => {
                error!(error = %e, "Failed to purge dead token records");
                result.errors.push(format!("Purge error: {}", e));
            }
        }

        info!(purged = result.records_purged, "Token cleanup completed");

        Ok(result)
    }

    /// Start the cleanup service as a background task
    ///
    /// Returns `None` without spawning anything when cleanup is disabled.
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Token cleanup service is disabled");
            return None;
        }

        let interval = std::time::Duration::from_secs(self.config.interval_seconds);

        Some(tokio::spawn(async move {
            info!(
                interval_seconds = self.config.interval_seconds,
                "Token cleanup service started"
            );

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                match self.run_cleanup().await {
                    Ok(result) => {
                        if !result.errors.is_empty() {
                            warn!(errors = ?result.errors, "Cleanup completed with errors");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Token cleanup cycle failed");
                    }
                }
            }
        }))
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of revoked or expired records deleted
    pub records_purged: usize,
    /// Any errors encountered during cleanup
    pub errors: Vec<String>,
}

impl CleanupResult {
    /// Check if the cleanup was successful (no errors)
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
