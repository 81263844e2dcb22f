//! Configuration module
//!
//! Configuration is organized into logical areas:
//! - `database` - MySQL connection pool settings
//! - `environment` - Environment detection and logging configuration
//! - `token` - Token lifecycle tunables

pub mod database;
pub mod environment;
pub mod token;

use serde::{Deserialize, Serialize};

pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use token::TokenConfig;

/// Prefix for environment variable overrides, e.g. `TOKENWARD__TOKENS__TOKEN_BYTES=48`
pub const ENV_PREFIX: &str = "TOKENWARD";

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Token lifecycle configuration
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            database: DatabaseConfig::default(),
            tokens: TokenConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::new("mysql://localhost:3306/tokenward_dev"),
            tokens: TokenConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig::new("mysql://prod-db:3306/tokenward")
                .with_max_connections(50),
            tokens: TokenConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Build the preset for the environment named in the process environment,
    /// reading the database URL and token overrides from plain env variables
    pub fn from_env() -> Self {
        let env = Environment::from_env();
        let mut config = match env {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
            Environment::Staging => {
                let mut config = Self::development();
                config.environment = Environment::Staging;
                config.logging = LoggingConfig::for_environment(Environment::Staging);
                config
            }
        };
        config.database = DatabaseConfig::from_env();
        config.tokens = TokenConfig::from_env();
        config
    }

    /// Load layered configuration
    ///
    /// Sources, lowest precedence first:
    /// 1. The preset for the detected environment
    /// 2. `config.<environment>.toml` in the working directory, if present
    /// 3. `TOKENWARD__<SECTION>__<KEY>` environment variables
    ///
    /// The token section is validated before returning.
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = Environment::from_env();
        let mut preset = Self::from_env();
        preset.environment = env;

        let defaults = config::Config::try_from(&preset)?;
        let loaded: AppConfig = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(env.config_file()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded
            .tokens
            .validate()
            .map_err(config::ConfigError::Message)?;

        Ok(loaded)
    }
}
