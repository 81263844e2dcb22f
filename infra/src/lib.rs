//! # Infrastructure Layer
//!
//! Concrete backends for the Tokenward core:
//! - **Database**: MySQL token store and principal directory using SQLx
//! - **Telemetry**: `tracing-subscriber` initialisation
//!
//! ## Features
//!
//! - `mysql`: Enable MySQL database support (default)

use std::sync::Arc;

use tokio::task::JoinHandle;
use tw_core::services::{
    PrincipalDeletionListener, TokenCleanupConfig, TokenCleanupService, TokenManager,
    TokenManagerConfig,
};
use tw_shared::config::AppConfig;

// Re-export core types for convenience
pub use tw_core::errors::*;

/// Database module - MySQL implementations using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// Structured logging setup
pub mod telemetry;

#[cfg(feature = "mysql")]
use database::{DatabasePool, MySqlPrincipalDirectory, MySqlTokenStore};

/// Token manager wired to the MySQL backends
#[cfg(feature = "mysql")]
pub type MySqlTokenManager = TokenManager<MySqlTokenStore, MySqlPrincipalDirectory>;

/// Running infrastructure: the token manager plus its background tasks
#[cfg(feature = "mysql")]
pub struct Infrastructure {
    pub pool: DatabasePool,
    pub manager: Arc<MySqlTokenManager>,
    pub tasks: Vec<JoinHandle<()>>,
}

#[cfg(feature = "mysql")]
impl Infrastructure {
    /// Stop background tasks and close the pool
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        self.pool.close().await;
    }
}

/// Initialize infrastructure services
///
/// This function sets up:
/// - The database connection pool
/// - MySQL token store and principal directory
/// - The token manager
/// - Deletion polling, the deletion listener and periodic cleanup
#[cfg(feature = "mysql")]
pub async fn initialize(config: &AppConfig) -> Result<Infrastructure, InfrastructureError> {
    tracing::info!(environment = %config.environment, "Initializing infrastructure services");

    let pool = DatabasePool::new(config.database.clone()).await?;

    let store = Arc::new(MySqlTokenStore::new(pool.get_pool().clone()));
    let directory = Arc::new(MySqlPrincipalDirectory::new(
        pool.get_pool().clone(),
        config.tokens.deletion_channel_capacity,
    ));

    let manager = Arc::new(TokenManager::new(
        store,
        directory.clone(),
        TokenManagerConfig::from(&config.tokens),
    )?);

    // Subscribe before polling starts so no deletion is published unobserved.
    let listener = PrincipalDeletionListener::new(manager.clone());
    let mut tasks = vec![
        listener.spawn(),
        directory.start_polling(DELETION_POLL_INTERVAL),
    ];

    let cleanup = Arc::new(TokenCleanupService::new(
        manager.clone(),
        TokenCleanupConfig::from(&config.tokens),
    ));
    if let Some(task) = cleanup.start_background_task() {
        tasks.push(task);
    }

    tracing::info!(tasks = tasks.len(), "Infrastructure services initialized successfully");

    Ok(Infrastructure {
        pool,
        manager,
        tasks,
    })
}

/// Upper bound on the delay between principal deletion polls
#[cfg(feature = "mysql")]
const DELETION_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

/// Load configuration from `.env`, the environment's config file and
/// `TOKENWARD__*` variables
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok(); // Load .env file if present

    AppConfig::load().map_err(|e| InfrastructureError::Config(e.to_string()))
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Domain layer rejected the wiring
    #[error(transparent)]
    Domain(#[from] DomainError),
}
