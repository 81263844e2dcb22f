//! Token lifecycle configuration

use serde::{Deserialize, Serialize};

/// Smallest accepted token size; anything below is guessable in practice
pub const MIN_TOKEN_BYTES: usize = 16;

/// Longest accepted refresh lifetime: 100 years
pub const MAX_REFRESH_LIFETIME_SECONDS: i64 = 100 * 365 * 86_400;

/// Tunables for issuing, rotating and cleaning up refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// How long a refresh token is honored after issue or rotation, in seconds
    pub refresh_lifetime_seconds: i64,

    /// Random bytes per generated refresh/access value
    pub token_bytes: usize,

    /// Upper bound on a single store round-trip, in milliseconds
    pub store_timeout_ms: u64,

    /// Delete an expired record when a refresh attempt finds it
    pub purge_expired_on_read: bool,

    /// Buffer size of the principal deletion broadcast channel
    pub deletion_channel_capacity: usize,

    /// Interval between background cleanup cycles, in seconds
    pub cleanup_interval_seconds: u64,

    /// Whether the background cleanup task runs at all
    pub cleanup_enabled: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            refresh_lifetime_seconds: 86_400, // 1 day
            token_bytes: 32,
            store_timeout_ms: 5_000,
            purge_expired_on_read: true,
            deletion_channel_capacity: 1_024,
            cleanup_interval_seconds: 3_600,
            cleanup_enabled: true,
        }
    }
}

impl TokenConfig {
    /// Read overrides from `REFRESH_TOKEN_LIFETIME_SECONDS`, `TOKEN_BYTES`
    /// and `TOKEN_STORE_TIMEOUT_MS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            refresh_lifetime_seconds: env_or("REFRESH_TOKEN_LIFETIME_SECONDS", defaults.refresh_lifetime_seconds),
            token_bytes: env_or("TOKEN_BYTES", defaults.token_bytes),
            store_timeout_ms: env_or("TOKEN_STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            ..defaults
        }
    }

    /// Set the refresh lifetime in days
    ///
    /// Saturates instead of overflowing; `validate()` rejects the result.
    pub fn with_refresh_lifetime_days(mut self, days: i64) -> Self {
        self.refresh_lifetime_seconds = days.saturating_mul(86_400);
        self
    }

    /// Refresh lifetime as a calendar duration
    ///
    /// Clamped to `0..=MAX_REFRESH_LIFETIME_SECONDS`; `validate()` reports
    /// values outside that range.
    pub fn refresh_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_lifetime_seconds.clamp(0, MAX_REFRESH_LIFETIME_SECONDS))
    }

    /// Store round-trip bound
    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.store_timeout_ms)
    }

    /// Background cleanup interval
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_seconds)
    }

    /// Reject settings that would produce dead-on-arrival or guessable tokens
    pub fn validate(&self) -> Result<(), String> {
        if self.refresh_lifetime_seconds <= 0 {
            return Err(format!(
                "refresh_lifetime_seconds must be positive, got {}",
                self.refresh_lifetime_seconds
            ));
        }
        if self.refresh_lifetime_seconds > MAX_REFRESH_LIFETIME_SECONDS {
            return Err(format!(
                "refresh_lifetime_seconds must be at most {}, got {}",
                MAX_REFRESH_LIFETIME_SECONDS, self.refresh_lifetime_seconds
            ));
        }
        if self.token_bytes < MIN_TOKEN_BYTES {
            return Err(format!(
                "token_bytes must be at least {}, got {}",
                MIN_TOKEN_BYTES, self.token_bytes
            ));
        }
        if self.store_timeout_ms == 0 {
            return Err("store_timeout_ms must be non-zero".to_string());
        }
        if self.deletion_channel_capacity == 0 {
            return Err("deletion_channel_capacity must be non-zero".to_string());
        }
        if self.cleanup_enabled && self.cleanup_interval_seconds == 0 {
            return Err("cleanup_interval_seconds must be non-zero when cleanup is enabled".to_string());
        }
        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
