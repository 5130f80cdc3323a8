//! Configuration loading

use anyhow::{bail, Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Prefix of environment overrides, e.g. `USERS__AUTH__JWT_SECRET`
const ENV_PREFIX: &str = "USERS";
const ENV_SEPARATOR: &str = "__";

/// Placeholder secret shipped in the defaults
const PLACEHOLDER_JWT_SECRET: &str = "change-me-in-production";

/// Longest accepted token lifetime (ten years)
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub directory: DirectorySettings,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// Keep users in process memory instead of SQLite
    pub in_memory: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:./data/users.db?mode=rwc".to_string(),
            in_memory: false,
        }
    }
}

impl DatabaseConfig {
    /// Path of the SQLite file behind `url`, if it names one
    pub fn sqlite_file(&self) -> Option<PathBuf> {
        let rest = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or_default();

        if path.is_empty() || path == ":memory:" {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: PLACEHOLDER_JWT_SECRET.to_string(),
            token_ttl_secs: 86400,
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

/// User directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    pub store_timeout_ms: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            store_timeout_ms: 5000,
        }
    }
}

impl From<&DirectorySettings> for users_core::DirectoryConfig {
    fn from(settings: &DirectorySettings) -> Self {
        users_core::DirectoryConfig {
            store_timeout: Duration::from_millis(settings.store_timeout_ms),
        }
    }
}

/// Logging output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then `USERS__*` variables
    pub fn load(path: &str) -> Result<Self> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true);
        Self::load_with_env(path, env)
    }

    fn load_with_env(path: &str, env: Environment) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration: {}", path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse configuration: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret must not be empty");
        }
        if self.auth.token_ttl_secs == 0 {
            bail!("auth.token_ttl_secs must be greater than zero");
        }
        if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            bail!(
                "auth.token_ttl_secs must be at most {} (got {})",
                MAX_TOKEN_TTL_SECS,
                self.auth.token_ttl_secs
            );
        }
        if self.directory.store_timeout_ms == 0 {
            bail!("directory.store_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    /// Whether the signing secret is still the shipped placeholder
    pub fn uses_placeholder_secret(&self) -> bool {
        self.auth.jwt_secret == PLACEHOLDER_JWT_SECRET
    }
}
