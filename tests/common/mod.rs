//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bb8::ManageConnection;
use business_manager::config::{DatabaseConfig, PoolConfig};
use business_manager::db::{self, ConnectionPool, ConnectionPoolBuilder, schema};
use business_manager::http_server::AppState;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug)]
pub struct MockConnection {
    pub id: u32,
    pub broken: bool,
}

/// In-memory connection source with switches for failure modes
#[derive(Clone, Default)]
pub struct MockManager {
    pub opened: Arc<AtomicU32>,
    pub fail_connect: Arc<AtomicBool>,
    pub invalid: Arc<AtomicBool>,
    pub connect_delay: Duration,
    pub validate_delay: Duration,
}

impl MockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_delay(delay: Duration) -> Self {
        Self {
            connect_delay: delay,
            ..Self::default()
        }
    }

    pub fn with_validate_delay(delay: Duration) -> Self {
        Self {
            validate_delay: delay,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManageConnection for MockManager {
    type Connection = MockConnection;
    type Error = std::io::Error;

    async fn connect(&self) -> Result<MockConnection, std::io::Error> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            let refused = std::io::ErrorKind::ConnectionRefused;
            return Err(std::io::Error::new(refused, "mock refused"));
        }
        Ok(MockConnection {
            id: self.opened.fetch_add(1, Ordering::SeqCst),
            broken: false,
        })
    }

    async fn is_valid(&self, _conn: &mut MockConnection) -> Result<(), std::io::Error> {
        if !self.validate_delay.is_zero() {
            tokio::time::sleep(self.validate_delay).await;
        }
        if self.invalid.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "mock invalid"));
        }
        Ok(())
    }

    fn has_broken(&self, conn: &mut MockConnection) -> bool {
        conn.broken
    }
}

pub async fn mock_pool(
    manager: MockManager,
    max_size: u32,
    min_idle: u32,
    timeout: Duration,
) -> ConnectionPool<MockManager> {
    ConnectionPoolBuilder::new(manager)
        .max_size(max_size)
        .min_idle(min_idle)
        .acquire_timeout(timeout)
        .replenish_backoff(Duration::from_millis(10))
        .build()
        .await
        .unwrap()
}

pub fn temp_database(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("business.db").display()),
        busy_timeout_ms: 5_000,
    }
}

pub fn small_pool(max_size: u32, acquire_timeout_ms: u64) -> PoolConfig {
    PoolConfig {
        max_size,
        min_idle: 0,
        acquire_timeout_ms,
        ..PoolConfig::default()
    }
}

/// Application state over a freshly migrated SQLite file in `dir`
pub async fn test_state(dir: &TempDir, pool: PoolConfig) -> AppState {
    let pool = db::connect(&temp_database(dir), &pool).await.unwrap();
    {
        let mut conn = pool.acquire().await.unwrap();
        schema::migrate(&mut conn).await.unwrap();
    }
    AppState::new(pool)
}

/// Poll `condition` until it holds or a second has passed
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
