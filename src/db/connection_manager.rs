//! SQLite connection manager for the pool
//!
//! Implements `bb8::ManageConnection` over `sqlx::SqliteConnection` so the
//! pool can open, validate and retire database sessions.

use crate::config::DatabaseConfig;
use async_trait::async_trait;
use bb8::ManageConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Errors that can occur during connection management
#[derive(Error, Debug)]
pub enum ConnectionManagerError {
    #[error("Failed to create SQLite connection: {0}")]
    ConnectionCreation(#[source] sqlx::Error),

    #[error("Connection validation failed: {0}")]
    ValidationFailed(#[source] sqlx::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Connection manager for SQLite that implements bb8::ManageConnection
#[derive(Debug, Clone)]
pub struct SqliteConnectionManager {
    url: String,
    options: SqliteConnectOptions,
}

impl SqliteConnectionManager {
    /// Parse the connection string and apply the session settings every
    /// pooled connection shares
    pub fn new(config: &DatabaseConfig) -> Result<Self, ConnectionManagerError> {
        if !config.url.starts_with("sqlite:") {
            return Err(ConnectionManagerError::Configuration(format!(
                "unsupported database url {:?}, expected sqlite:",
                config.url
            )));
        }

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| {
                ConnectionManagerError::Configuration(format!(
                    "invalid database url {:?}: {}",
                    config.url, e
                ))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        debug!("Creating SQLite connection manager for {}", config.url);
        Ok(Self {
            url: config.url.clone(),
            options,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ManageConnection for SqliteConnectionManager {
    type Connection = SqliteConnection;
    type Error = ConnectionManagerError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        debug!("Creating new SQLite connection");

        let connection = self.options.connect().await.map_err(|e| {
            error!("Failed to create SQLite connection: {}", e);
            ConnectionManagerError::ConnectionCreation(e)
        })?;

        debug!("Successfully created SQLite connection");
        Ok(connection)
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.ping().await.map_err(|e| {
            warn!("Connection validation failed: {}", e);
            ConnectionManagerError::ValidationFailed(e)
        })
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        // Broken sessions are reported by the store layer when a query fails
        false
    }
}

impl fmt::Display for SqliteConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqliteConnectionManager(url={})", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            busy_timeout_ms: 1_000,
        }
    }

    #[test]
    fn test_connection_manager_creation() {
        let manager = SqliteConnectionManager::new(&config_for("sqlite://app.db")).unwrap();
        assert!(manager.to_string().contains("sqlite://app.db"));
        assert_eq!(manager.url(), "sqlite://app.db");
    }

    #[test]
    fn test_rejects_non_sqlite_url() {
        let result = SqliteConnectionManager::new(&config_for("postgres://localhost/app"));
        assert!(matches!(result, Err(ConnectionManagerError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_connect_and_validate_file_database() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("manager.db").display());
        let manager = SqliteConnectionManager::new(&config_for(&url)).unwrap();

        let mut connection = manager.connect().await.unwrap();
        assert!(manager.is_valid(&mut connection).await.is_ok());
        assert!(!manager.has_broken(&mut connection));
    }
}
