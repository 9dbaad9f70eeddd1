use crate::db::pool::PoolError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BusinessError>;

#[derive(Error, Debug)]
pub enum BusinessError {
    // Standard library errors with automatic conversion
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Connection lifecycle errors, all retryable by the client
    #[error("No database connection available within {0} ms")]
    PoolExhausted(u64),

    #[error("Database connection lost: {0}")]
    ConnectionLost(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Service is shutting down")]
    ShuttingDown,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    // Client request errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl BusinessError {
    /// Whether a client may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BusinessError::PoolExhausted(_)
                | BusinessError::ConnectionLost(_)
                | BusinessError::Unavailable(_)
                | BusinessError::ShuttingDown
        )
    }
}

/// Errors that mean the session itself is unusable, as opposed to a bad
/// statement or a constraint violation on a healthy session.
pub fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::PoolClosed
            | sqlx::Error::PoolTimedOut
    )
}

/// SQLite gave up waiting for a lock held by another session (`SQLITE_BUSY`
/// or `SQLITE_LOCKED`, including their extended codes). The session itself
/// stays usable.
pub fn is_busy_error(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = err else {
        return false;
    };
    let primary = db
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .map(|code| code & 0xff);
    matches!(primary, Some(SQLITE_BUSY | SQLITE_LOCKED))
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl From<sqlx::Error> for BusinessError {
    fn from(err: sqlx::Error) -> Self {
        if is_connection_error(&err) {
            return BusinessError::ConnectionLost(err.to_string());
        }
        if is_busy_error(&err) {
            return BusinessError::Unavailable(format!("database is busy: {}", err));
        }
        match err {
            sqlx::Error::RowNotFound => BusinessError::NotFound("record not found".to_string()),
            other => BusinessError::Database(other),
        }
    }
}

impl From<PoolError> for BusinessError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Exhausted(waited) => BusinessError::PoolExhausted(waited.as_millis() as u64),
            PoolError::Connect(msg) => BusinessError::Unavailable(msg),
            PoolError::Closed => BusinessError::ShuttingDown,
            PoolError::Configuration(msg) => BusinessError::Configuration(msg),
            PoolError::ShutdownTimeout(lent) => {
                BusinessError::Internal(format!("{} connections still lent at shutdown", lent))
            }
        }
    }
}

impl From<&str> for BusinessError {
    fn from(msg: &str) -> Self {
        BusinessError::Internal(msg.to_string())
    }
}

impl From<String> for BusinessError {
    fn from(msg: String) -> Self {
        BusinessError::Internal(msg)
    }
}

// Convert from anyhow::Error for CLI integration
impl From<anyhow::Error> for BusinessError {
    fn from(err: anyhow::Error) -> Self {
        BusinessError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sqlx_io_error_is_connection_lost() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: BusinessError = sqlx::Error::Io(io).into();
        assert!(matches!(err, BusinessError::ConnectionLost(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: BusinessError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, BusinessError::NotFound(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_locked_database_is_retryable() {
        use sqlx::sqlite::SqliteConnectOptions;
        use sqlx::{ConnectOptions, Executor};

        let dir = tempfile::TempDir::new().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("locked.db"))
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(50));

        let mut holder = options.connect().await.unwrap();
        holder.execute("CREATE TABLE t (id INTEGER)").await.unwrap();
        holder.execute("BEGIN IMMEDIATE").await.unwrap();
        holder.execute("INSERT INTO t VALUES (1)").await.unwrap();

        let mut contender = options.connect().await.unwrap();
        let err = contender.execute("INSERT INTO t VALUES (2)").await.unwrap_err();
        assert!(is_busy_error(&err));
        assert!(!is_connection_error(&err));

        let err: BusinessError = err.into();
        assert!(matches!(err, BusinessError::Unavailable(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_pool_errors_map_to_lifecycle_kinds() {
        let err: BusinessError = PoolError::Exhausted(Duration::from_millis(250)).into();
        assert!(matches!(err, BusinessError::PoolExhausted(250)));

        let err: BusinessError = PoolError::Closed.into();
        assert!(matches!(err, BusinessError::ShuttingDown));

        let err: BusinessError = PoolError::Connect("refused".to_string()).into();
        assert!(matches!(err, BusinessError::Unavailable(_)));
    }
}
