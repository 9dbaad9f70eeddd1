//! Health check and monitoring module
//!
//! `/health` answers load balancers with a plain `OK`; `/status` reports the
//! database round-trip and connection pool occupancy.

use crate::db::{DbPool, PoolStats, settle};
use crate::{BusinessError, Result};
use serde::{Deserialize, Serialize};
use sqlx::Connection;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument, warn};

/// Round-trips slower than this mark the database degraded
const SLOW_PING: Duration = Duration::from_secs(1);

/// Overall health status of the service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Reachable, but slow or close to running out of connections
    Degraded,
    Unhealthy,
}

/// Connection pool occupancy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionPoolHealth {
    pub size: u32,
    pub active: u32,
    pub idle: u32,
    pub waiting: u32,
    pub max: u32,
    pub utilization_percent: f64,
    pub total_created: u64,
    pub total_discarded: u64,
    pub total_timeouts: u64,
}

impl From<PoolStats> for ConnectionPoolHealth {
    fn from(stats: PoolStats) -> Self {
        Self {
            utilization_percent: stats.utilization_percent(),
            size: stats.size,
            active: stats.active,
            idle: stats.idle,
            waiting: stats.waiting,
            max: stats.max_size,
            total_created: stats.total_created,
            total_discarded: stats.total_discarded,
            total_timeouts: stats.total_timeouts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: HealthStatus,
    pub latency_ms: u64,
    pub connection_pool: ConnectionPoolHealth,
    pub message: Option<String>,
}

/// Comprehensive service status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: DatabaseHealth,
    pub timestamp: u64, // Unix timestamp
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Checks the database by borrowing a pooled connection and pinging it
#[derive(Clone)]
pub struct DatabaseHealthChecker {
    pool: DbPool,
}

impl DatabaseHealthChecker {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let result = conn.session().ping().await;
        settle(&mut conn, result)
    }

    #[instrument(skip(self))]
    pub async fn check_detailed_health(&self) -> DatabaseHealth {
        let start = Instant::now();
        let ping = self.ping().await;
        let latency = start.elapsed();
        let stats = self.pool.stats();

        let (status, message) = match ping {
            Ok(()) if latency > SLOW_PING => {
                (HealthStatus::Degraded, Some("High latency".to_string()))
            }
            Ok(()) if stats.utilization_percent() > 80.0 || stats.waiting > 0 => (
                HealthStatus::Degraded,
                Some("High connection pool utilization".to_string()),
            ),
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => {
                warn!("Database health check failed: {}", e);
                (HealthStatus::Unhealthy, Some(format!("Connection failed: {}", e)))
            }
        };

        DatabaseHealth {
            status,
            latency_ms: latency.as_millis() as u64,
            connection_pool: stats.into(),
            message,
        }
    }
}

/// Main health service that coordinates all health checks
#[derive(Clone)]
pub struct HealthService {
    database: DatabaseHealthChecker,
    start_time: Instant,
}

impl HealthService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            database: DatabaseHealthChecker::new(pool),
            start_time: Instant::now(),
        }
    }

    /// Fast check for load balancers: can we borrow a connection and ping it
    #[instrument(skip(self))]
    pub async fn check_health(&self) -> Result<String> {
        match self.database.ping().await {
            Ok(()) => {
                debug!("Health check passed");
                Ok("OK".to_string())
            }
            Err(e) if e.is_retryable() => Err(e),
            Err(e) => {
                warn!("Health check failed: {}", e);
                Err(BusinessError::Unavailable("database ping failed".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn detailed_status(&self) -> ServiceStatus {
        let database = self.database.check_detailed_health().await;

        ServiceStatus {
            status: database.status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            database,
            timestamp: unix_now(),
        }
    }
}
