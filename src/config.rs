use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for the business manager service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub pool: PoolConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Datastore connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// How long SQLite waits on a locked database before giving up
    pub busy_timeout_ms: u64,
}

/// Connection pool sizing and timeouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_size: u32,
    pub min_idle: u32,
    /// Upper bound on how long a request waits for a free connection
    pub acquire_timeout_ms: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_on_check_out: bool,
    /// Delay between attempts when re-establishing discarded capacity
    pub replenish_backoff_ms: u64,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// In-flight requests get this long to finish once shutdown starts
    pub shutdown_grace_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub target: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://app.db".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_idle: 1,
            acquire_timeout_ms: 5_000,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1_800,
            test_on_check_out: false,
            replenish_backoff_ms: 500,
        }
    }
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn replenish_backoff(&self) -> Duration {
        Duration::from_millis(self.replenish_backoff_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
            shutdown_grace_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(), // pretty, json, compact
            target: "stdout".to_string(), // stdout, stderr
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. config.toml file (if exists)
    /// 3. Environment variables (BIZ_SECTION__KEY)
    /// 4. Platform variables (PORT, HOST, DATABASE_URL)
    pub fn load() -> Result<Self> {
        Self::load_from_dir(&std::env::current_dir()?)
    }

    /// Load configuration from a specific directory
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_file = dir.join("config.toml");
        if config_file.exists() {
            builder = builder.add_source(File::from(config_file));
        }

        builder = builder.add_source(
            Environment::with_prefix("BIZ")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut result: Config = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        result.merge_env_vars()?;
        result.validate()?;

        Ok(result)
    }

    /// Create a new Config for testing
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                busy_timeout_ms: 1_000,
            },
            pool: PoolConfig {
                max_size: 2,
                min_idle: 0,
                acquire_timeout_ms: 100,
                ..PoolConfig::default()
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Use any available port
                shutdown_grace_secs: 1,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
                target: "stdout".to_string(),
            },
        }
    }

    /// Conventional variables set by hosting platforms win over everything else
    fn merge_env_vars(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.pool.max_size == 0 {
            anyhow::bail!("pool.max_size must be at least 1");
        }
        if self.pool.min_idle > self.pool.max_size {
            anyhow::bail!(
                "pool.min_idle ({}) cannot exceed pool.max_size ({})",
                self.pool.min_idle,
                self.pool.max_size
            );
        }
        Ok(())
    }
}
