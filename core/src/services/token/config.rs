//! Configuration for the token manager and its background tasks

use chrono::Duration;
use tw_shared::config::TokenConfig;

/// Settings the token manager reads on every operation
#[derive(Debug, Clone)]
pub struct TokenManagerConfig {
    /// How long a refresh value is honored after issue or rotation
    pub refresh_lifetime: Duration,
    /// Random bytes per generated value
    pub token_bytes: usize,
    /// Upper bound on each store or principal-repository round-trip
    pub store_timeout: std::time::Duration,
    /// Delete an expired record when a refresh attempt finds it
    pub purge_expired_on_read: bool,
}

impl Default for TokenManagerConfig {
    fn default() -> Self {
        Self::from(&TokenConfig::default())
    }
}

impl From<&TokenConfig> for TokenManagerConfig {
    fn from(config: &TokenConfig) -> Self {
        Self {
            refresh_lifetime: config.refresh_lifetime(),
            token_bytes: config.token_bytes,
            store_timeout: config.store_timeout(),
            purge_expired_on_read: config.purge_expired_on_read,
        }
    }
}

impl TokenManagerConfig {
    /// Override the refresh lifetime
    pub fn with_refresh_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_lifetime = lifetime;
        self
    }

    /// Override the store timeout
    pub fn with_store_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}

/// Configuration for the background cleanup task
#[derive(Debug, Clone)]
pub struct TokenCleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_seconds: u64,
    /// Whether to enable automatic cleanup
    pub enabled: bool,
}

impl Default for TokenCleanupConfig {
    fn default() -> Self {
        Self::from(&TokenConfig::default())
    }
}

impl From<&TokenConfig> for TokenCleanupConfig {
    fn from(config: &TokenConfig) -> Self {
        Self {
            interval_seconds: config.cleanup_interval_seconds,
            enabled: config.cleanup_enabled,
        }
    }
}
