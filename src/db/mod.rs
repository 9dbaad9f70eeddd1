//! Database connection pooling module
//!
//! The pool in [`pool`] is generic over `bb8::ManageConnection`;
//! [`SqliteConnectionManager`] plugs SQLite sessions into it.

pub mod connection_manager;
pub mod pool;
pub mod schema;

pub use connection_manager::{ConnectionManagerError, SqliteConnectionManager};
pub use pool::{ConnectionPool, ConnectionPoolBuilder, PoolError, PoolStats, PooledConnection};

/// The pool the service runs on
pub type DbPool = ConnectionPool<SqliteConnectionManager>;

/// A connection lent from [`DbPool`]
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

use crate::config::{DatabaseConfig, PoolConfig};
use crate::error::is_connection_error;
use crate::{BusinessError, Result};
use tracing::warn;

/// Close the operation started with [`PooledConnection::session`].
///
/// A failure that leaves the session unusable marks the connection broken
/// so it is discarded rather than lent again; statement errors on a healthy
/// session keep it.
pub fn settle<T>(
    conn: &mut DbConnection,
    result: std::result::Result<T, sqlx::Error>,
) -> Result<T> {
    match result {
        Ok(value) => {
            conn.settle(true);
            Ok(value)
        }
        Err(err) => {
            let healthy = !is_connection_error(&err);
            if !healthy {
                warn!("Database session failed, discarding connection: {}", err);
            }
            conn.settle(healthy);
            Err(err.into())
        }
    }
}

/// Build the service pool from configuration
pub async fn connect(database: &DatabaseConfig, pool: &PoolConfig) -> Result<DbPool> {
    let manager = SqliteConnectionManager::new(database)
        .map_err(|e| BusinessError::Configuration(e.to_string()))?;

    Ok(ConnectionPoolBuilder::new(manager)
        .pool_config(pool.clone())
        .build()
        .await?)
}
