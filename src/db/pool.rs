//! Bounded connection pool
//!
//! Lends connections produced by any `bb8::ManageConnection` to one task at
//! a time. Waiting acquirers sit in an explicit FIFO wait-list; the idle
//! set, the wait-list and the `open`/`lent` counters live under a single
//! mutex so that `lent <= open <= max_size` holds at every unlock.
//!
//! A returned connection is handed straight to the oldest live waiter when
//! there is one, otherwise it goes back on the idle stack. Discarding a
//! broken connection frees its slot; a waiter receives the slot and opens
//! the replacement itself, and with nobody waiting a background task refills
//! the pool up to `min_idle`.

use crate::config::PoolConfig;
use bb8::ManageConnection;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, error, info, instrument, warn};

/// Give up refilling after this many consecutive connect failures
const MAX_REPLENISH_ATTEMPTS: u32 = 5;

/// Errors that can occur with the connection pool
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Timed out after {0:?} waiting for a connection")]
    Exhausted(Duration),

    #[error("Failed to establish connection: {0}")]
    Connect(String),

    #[error("Connection pool is closed")]
    Closed,

    #[error("Pool configuration error: {0}")]
    Configuration(String),

    #[error("{0} connections were still lent when shutdown gave up")]
    ShutdownTimeout(u32),
}

/// Connection pool statistics for monitoring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStats {
    /// Connections alive or being established
    pub size: u32,
    /// Connections parked in the idle set
    pub idle: u32,
    /// Connections currently lent out
    pub active: u32,
    /// Acquirers queued for a connection
    pub waiting: u32,
    pub max_size: u32,
    pub total_created: u64,
    pub total_discarded: u64,
    pub total_timeouts: u64,
}

impl PoolStats {
    pub fn utilization_percent(&self) -> f64 {
        if self.max_size == 0 {
            return 0.0;
        }
        self.active as f64 / self.max_size as f64 * 100.0
    }
}

struct Lent<C> {
    conn: C,
    created_at: Instant,
}

struct Idle<C> {
    conn: C,
    created_at: Instant,
    idle_since: Instant,
}

/// What a releasing task hands to a waiter: a ready connection, or the
/// right to open one against capacity that is already counted.
enum Grant<C> {
    Connection(Lent<C>),
    Slot,
}

struct PoolState<C> {
    idle: VecDeque<Idle<C>>,
    waiters: VecDeque<oneshot::Sender<Grant<C>>>,
    open: u32,
    lent: u32,
    closed: bool,
}

#[derive(Default)]
struct PoolCounters {
    created: AtomicU64,
    discarded: AtomicU64,
    timeouts: AtomicU64,
}

struct SharedPool<M: ManageConnection> {
    manager: M,
    config: PoolConfig,
    state: Mutex<PoolState<M::Connection>>,
    drained: Notify,
    counters: PoolCounters,
}

enum Step<C> {
    Idle(Idle<C>),
    Open,
    Wait(oneshot::Receiver<Grant<C>>),
}

impl<M: ManageConnection> SharedPool<M> {
    fn lock(&self) -> MutexGuard<'_, PoolState<M::Connection>> {
        // A panic while holding the lock cannot leave the counters half-updated
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn acquire(self: &Arc<Self>) -> Result<PooledConnection<M>, PoolError> {
        let deadline = tokio::time::Instant::now() + self.config.acquire_timeout();

        loop {
            let step = {
                let mut state = self.lock();
                if state.closed {
                    return Err(PoolError::Closed);
                }
                if let Some(idle) = state.idle.pop_back() {
                    state.lent += 1;
                    Step::Idle(idle)
                } else if state.open < self.config.max_size {
                    state.open += 1;
                    state.lent += 1;
                    Step::Open
                } else {
                    let (tx, rx) = oneshot::channel();
                    state.waiters.retain(|waiter| !waiter.is_closed());
                    state.waiters.push_back(tx);
                    Step::Wait(rx)
                }
            };

            let lent = match step {
                Step::Idle(idle) => {
                    if self.is_expired(&idle) {
                        debug!("Retiring expired idle connection");
                        self.discard(idle.conn);
                        continue;
                    }
                    let mut conn = PooledConnection::new(
                        Lent {
                            conn: idle.conn,
                            created_at: idle.created_at,
                        },
                        Arc::clone(self),
                    );
                    if self.config.test_on_check_out {
                        let checked =
                            tokio::time::timeout_at(deadline, self.manager.is_valid(conn.session()))
                                .await;
                        match checked {
                            Ok(Ok(())) => conn.settle(true),
                            Ok(Err(e)) => {
                                warn!("Idle connection failed validation: {:?}", e);
                                conn.settle(false);
                                continue;
                            }
                            Err(_) => {
                                conn.settle(false);
                                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                                warn!("Timed out while validating an idle connection");
                                return Err(PoolError::Exhausted(self.config.acquire_timeout()));
                            }
                        }
                    }
                    return Ok(conn);
                }
                Step::Open => self.open_connection(deadline).await?,
                Step::Wait(rx) => match self.wait_for_grant(rx, deadline).await? {
                    Grant::Connection(lent) => lent,
                    Grant::Slot => self.open_connection(deadline).await?,
                },
            };

            return Ok(PooledConnection::new(lent, Arc::clone(self)));
        }
    }

    fn is_expired(&self, idle: &Idle<M::Connection>) -> bool {
        self.outlived(idle.created_at) || idle.idle_since.elapsed() >= self.config.idle_timeout()
    }

    fn outlived(&self, created_at: Instant) -> bool {
        created_at.elapsed() >= self.config.max_lifetime()
    }

    /// Open a connection against a slot the caller has already counted
    async fn open_connection(
        self: &Arc<Self>,
        deadline: tokio::time::Instant,
    ) -> Result<Lent<M::Connection>, PoolError> {
        let mut reservation = Reservation::new(self);

        match tokio::time::timeout_at(deadline, self.manager.connect()).await {
            Ok(Ok(conn)) => {
                reservation.fulfil();
                self.counters.created.fetch_add(1, Ordering::Relaxed);
                debug!("Opened new connection");
                Ok(Lent {
                    conn,
                    created_at: Instant::now(),
                })
            }
            Ok(Err(e)) => {
                error!("Failed to open connection: {:?}", e);
                Err(PoolError::Connect(format!("{:?}", e)))
            }
            Err(_) => {
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!("Timed out while opening a connection");
                Err(PoolError::Exhausted(self.config.acquire_timeout()))
            }
        }
    }

    async fn wait_for_grant(
        self: &Arc<Self>,
        rx: oneshot::Receiver<Grant<M::Connection>>,
        deadline: tokio::time::Instant,
    ) -> Result<Grant<M::Connection>, PoolError> {
        let mut waiter = Waiter { rx, pool: self };
        debug!("Pool exhausted, queueing for a connection");

        match tokio::time::timeout_at(deadline, &mut waiter.rx).await {
            Ok(Ok(grant)) => Ok(grant),
            // Senders are only dropped unsent when the pool closes
            Ok(Err(_)) => Err(PoolError::Closed),
            Err(_) => {
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!("Connection pool timeout - consider increasing pool size or timeout");
                Err(PoolError::Exhausted(self.config.acquire_timeout()))
            }
        }
    }

    /// Hand `grant` to the oldest waiter still listening, or give it back
    fn offer(
        state: &mut PoolState<M::Connection>,
        mut grant: Grant<M::Connection>,
    ) -> Option<Grant<M::Connection>> {
        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.send(grant) {
                Ok(()) => return None,
                Err(returned) => grant = returned,
            }
        }
        Some(grant)
    }

    /// Nobody wanted `grant`: park the connection or release the slot
    fn stow(state: &mut PoolState<M::Connection>, grant: Grant<M::Connection>) {
        state.lent = state.lent.saturating_sub(1);
        match grant {
            Grant::Connection(lent) => state.idle.push_back(Idle {
                conn: lent.conn,
                created_at: lent.created_at,
                idle_since: Instant::now(),
            }),
            Grant::Slot => state.open = state.open.saturating_sub(1),
        }
    }

    /// Return a lent connection or slot to the pool
    fn reclaim(self: &Arc<Self>, grant: Grant<M::Connection>) {
        let mut state = self.lock();

        if state.closed {
            state.lent = state.lent.saturating_sub(1);
            state.open = state.open.saturating_sub(1);
            let drained = state.lent == 0;
            drop(state);
            drop(grant);
            if drained {
                self.drained.notify_one();
            }
            return;
        }

        if let Some(grant) = Self::offer(&mut state, grant) {
            Self::stow(&mut state, grant);
        }
    }

    /// Drop a connection that must never be lent again and free its slot
    fn discard(self: &Arc<Self>, conn: M::Connection) {
        self.counters.discarded.fetch_add(1, Ordering::Relaxed);
        drop(conn);
        self.reclaim(Grant::Slot);
        self.replenish();
    }

    /// Spawn a background refill when the pool fell below `min_idle`
    fn replenish(self: &Arc<Self>) {
        let short = {
            let state = self.lock();
            !state.closed && state.open < self.config.min_idle
        };
        if !short {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let pool = Arc::clone(self);
        handle.spawn(async move { pool.fill_to_min_idle().await });
    }

    async fn fill_to_min_idle(self: Arc<Self>) {
        let mut failures = 0;

        loop {
            {
                let mut state = self.lock();
                if state.closed
                    || state.open >= self.config.min_idle
                    || state.open >= self.config.max_size
                {
                    return;
                }
                state.open += 1;
                state.lent += 1;
            }

            let mut reservation = Reservation::new(&self);
            match self.manager.connect().await {
                Ok(conn) => {
                    reservation.fulfil();
                    failures = 0;
                    self.counters.created.fetch_add(1, Ordering::Relaxed);
                    debug!("Replenished pool capacity");
                    self.reclaim(Grant::Connection(Lent {
                        conn,
                        created_at: Instant::now(),
                    }));
                }
                Err(e) => {
                    drop(reservation);
                    failures += 1;
                    if failures >= MAX_REPLENISH_ATTEMPTS {
                        error!(
                            "Giving up on replenishing pool after {} attempts: {:?}",
                            failures, e
                        );
                        return;
                    }
                    warn!("Replenish attempt {} failed: {:?}", failures, e);
                    tokio::time::sleep(self.config.replenish_backoff() * failures).await;
                }
            }
        }
    }
}

/// Counted slot whose connection is still being opened. Dropping it
/// unfulfilled (error, timeout, cancellation) gives the slot back.
struct Reservation<'a, M: ManageConnection> {
    pool: &'a Arc<SharedPool<M>>,
    armed: bool,
}

impl<'a, M: ManageConnection> Reservation<'a, M> {
    fn new(pool: &'a Arc<SharedPool<M>>) -> Self {
        Self { pool, armed: true }
    }

    fn fulfil(&mut self) {
        self.armed = false;
    }
}

impl<M: ManageConnection> Drop for Reservation<'_, M> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.reclaim(Grant::Slot);
        }
    }
}

/// Queued acquirer. A grant that races with a timeout or cancellation is
/// recovered on drop instead of vanishing with the channel.
struct Waiter<'a, M: ManageConnection> {
    rx: oneshot::Receiver<Grant<M::Connection>>,
    pool: &'a Arc<SharedPool<M>>,
}

impl<M: ManageConnection> Drop for Waiter<'_, M> {
    fn drop(&mut self) {
        self.rx.close();
        if let Ok(grant) = self.rx.try_recv() {
            self.pool.reclaim(grant);
        }
    }
}

/// A connection lent to one task.
///
/// Dropping the handle returns the connection. It goes back healthy unless
/// it was marked broken, the manager reports it broken, or an operation
/// started with [`session`](Self::session) was never [`settle`](Self::settle)d,
/// which is what a cancelled query looks like.
pub struct PooledConnection<M: ManageConnection> {
    lent: Option<Lent<M::Connection>>,
    pool: Arc<SharedPool<M>>,
    in_flight: bool,
    broken: bool,
    checked_out_at: Instant,
}

impl<M: ManageConnection> PooledConnection<M> {
    fn new(lent: Lent<M::Connection>, pool: Arc<SharedPool<M>>) -> Self {
        Self {
            lent: Some(lent),
            pool,
            in_flight: false,
            broken: false,
            checked_out_at: Instant::now(),
        }
    }

    fn lent_mut(&mut self) -> &mut Lent<M::Connection> {
        self.lent
            .as_mut()
            .expect("connection is only taken when the handle drops")
    }

    /// Mark an operation as in flight and borrow the raw connection for it
    pub fn session(&mut self) -> &mut M::Connection {
        self.in_flight = true;
        &mut self.lent_mut().conn
    }

    /// Close the operation opened by `session`, recording whether the
    /// connection is still usable
    pub fn settle(&mut self, healthy: bool) {
        self.in_flight = false;
        if !healthy {
            self.broken = true;
        }
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn time_in_use(&self) -> Duration {
        self.checked_out_at.elapsed()
    }

    /// Give the connection back now
    pub fn release(mut self, healthy: bool) {
        if !healthy {
            self.broken = true;
        }
    }
}

impl<M: ManageConnection> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        &self
            .lent
            .as_ref()
            .expect("connection is only taken when the handle drops")
            .conn
    }
}

impl<M: ManageConnection> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.lent_mut().conn
    }
}

impl<M: ManageConnection> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        let Some(mut lent) = self.lent.take() else {
            return;
        };
        if self.in_flight {
            warn!("Connection dropped with an operation in flight, discarding it");
        }
        let healthy =
            !self.is_broken() && !self.in_flight && !self.pool.manager.has_broken(&mut lent.conn);

        if !healthy {
            debug!("Discarding unhealthy connection");
            self.pool.discard(lent.conn);
        } else if self.pool.outlived(lent.created_at) {
            // The next holder, waiter or idle, gets a fresh connection
            debug!("Retiring connection past its max lifetime");
            self.pool.discard(lent.conn);
        } else {
            self.pool.reclaim(Grant::Connection(lent));
        }
    }
}

impl<M: ManageConnection> fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("in_flight", &self.in_flight)
            .field("broken", &self.broken)
            .field("time_in_use", &self.time_in_use())
            .finish()
    }
}

/// Bounded pool of connections produced by `M`
pub struct ConnectionPool<M: ManageConnection> {
    shared: Arc<SharedPool<M>>,
}

impl<M: ManageConnection> Clone for ConnectionPool<M> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<M: ManageConnection> fmt::Debug for ConnectionPool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<M: ManageConnection> ConnectionPool<M> {
    /// Create the pool and open `min_idle` connections up front. Failing to
    /// open any of them fails construction, which makes a bad connection
    /// string a startup error rather than a first-request error.
    #[instrument(
        skip(manager, config),
        fields(max_size = config.max_size, min_idle = config.min_idle)
    )]
    pub async fn new(manager: M, config: PoolConfig) -> Result<Self, PoolError> {
        if config.max_size == 0 {
            return Err(PoolError::Configuration("max_size must be at least 1".to_string()));
        }
        if config.min_idle > config.max_size {
            return Err(PoolError::Configuration(format!(
                "min_idle ({}) cannot exceed max_size ({})",
                config.min_idle, config.max_size
            )));
        }

        let mut idle = VecDeque::with_capacity(config.max_size as usize);
        for _ in 0..config.min_idle {
            let conn = manager
                .connect()
                .await
                .map_err(|e| PoolError::Connect(format!("{:?}", e)))?;
            let now = Instant::now();
            idle.push_back(Idle {
                conn,
                created_at: now,
                idle_since: now,
            });
        }

        let counters = PoolCounters::default();
        counters.created.store(idle.len() as u64, Ordering::Relaxed);

        info!("Created connection pool with {} idle connections", idle.len());

        let open = idle.len() as u32;
        Ok(Self {
            shared: Arc::new(SharedPool {
                manager,
                config,
                state: Mutex::new(PoolState {
                    idle,
                    waiters: VecDeque::new(),
                    open,
                    lent: 0,
                    closed: false,
                }),
                drained: Notify::new(),
                counters,
            }),
        })
    }

    /// Borrow a connection, waiting at most the configured acquire timeout
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<PooledConnection<M>, PoolError> {
        self.shared.acquire().await
    }

    /// Return a connection, discarding it when `healthy` is false
    pub fn release(&self, conn: PooledConnection<M>, healthy: bool) {
        conn.release(healthy);
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.lock();
        PoolStats {
            size: state.open,
            idle: state.idle.len() as u32,
            active: state.lent,
            waiting: state.waiters.iter().filter(|w| !w.is_closed()).count() as u32,
            max_size: self.shared.config.max_size,
            total_created: self.shared.counters.created.load(Ordering::Relaxed),
            total_discarded: self.shared.counters.discarded.load(Ordering::Relaxed),
            total_timeouts: self.shared.counters.timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn manager(&self) -> &M {
        &self.shared.manager
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Stop lending and close the pool.
    ///
    /// Waiting acquirers fail with [`PoolError::Closed`] and idle
    /// connections are closed immediately. Lent connections are closed as
    /// they come back; this waits up to `wait` for the last of them.
    #[instrument(skip(self))]
    pub async fn close(&self, wait: Duration) -> Result<(), PoolError> {
        let (idle, waiters) = {
            let mut state = self.shared.lock();
            state.closed = true;
            let idle: Vec<_> = state.idle.drain(..).collect();
            state.open = state.open.saturating_sub(idle.len() as u32);
            (idle, std::mem::take(&mut state.waiters))
        };

        info!(
            "Shutting down connection pool: closing {} idle, failing {} waiters",
            idle.len(),
            waiters.len()
        );
        drop(waiters);
        drop(idle);

        let drained = async {
            loop {
                let lent = self.shared.lock().lent;
                if lent == 0 {
                    break;
                }
                debug!("Waiting for {} lent connections", lent);
                self.shared.drained.notified().await;
            }
        };

        match tokio::time::timeout(wait, drained).await {
            Ok(()) => {
                info!("Connection pool shutdown complete");
                Ok(())
            }
            Err(_) => {
                let lent = self.shared.lock().lent;
                warn!("{} connections still lent after {:?}", lent, wait);
                Err(PoolError::ShutdownTimeout(lent))
            }
        }
    }
}

/// Configuration builder for easy pool setup
pub struct ConnectionPoolBuilder<M: ManageConnection> {
    manager: M,
    pool_config: PoolConfig,
}

impl<M: ManageConnection> ConnectionPoolBuilder<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            pool_config: PoolConfig::default(),
        }
    }

    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    pub fn max_size(mut self, max_size: u32) -> Self {
        self.pool_config.max_size = max_size;
        self
    }

    pub fn min_idle(mut self, min_idle: u32) -> Self {
        self.pool_config.min_idle = min_idle;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.acquire_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn test_on_check_out(mut self, enabled: bool) -> Self {
        self.pool_config.test_on_check_out = enabled;
        self
    }

    /// Whole seconds; sub-second parts are dropped
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.idle_timeout_secs = timeout.as_secs();
        self
    }

    /// Whole seconds; sub-second parts are dropped
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.pool_config.max_lifetime_secs = lifetime.as_secs();
        self
    }

    pub fn replenish_backoff(mut self, backoff: Duration) -> Self {
        self.pool_config.replenish_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub async fn build(self) -> Result<ConnectionPool<M>, PoolError> {
        ConnectionPool::new(self.manager, self.pool_config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    #[derive(Default)]
    struct CountingManager {
        opened: AtomicU32,
    }

    #[async_trait]
    impl ManageConnection for CountingManager {
        type Connection = u32;
        type Error = std::io::Error;

        async fn connect(&self) -> Result<u32, std::io::Error> {
            Ok(self.opened.fetch_add(1, Ordering::SeqCst))
        }

        async fn is_valid(&self, _conn: &mut u32) -> Result<(), std::io::Error> {
            Ok(())
        }

        fn has_broken(&self, _conn: &mut u32) -> bool {
            false
        }
    }

    #[test]
    fn test_pool_builder_pattern() {
        let builder = ConnectionPoolBuilder::new(CountingManager::default())
            .max_size(20)
            .min_idle(5)
            .acquire_timeout(Duration::from_millis(250))
            .test_on_check_out(true);

        assert_eq!(builder.pool_config.max_size, 20);
        assert_eq!(builder.pool_config.min_idle, 5);
        assert_eq!(builder.pool_config.acquire_timeout_ms, 250);
        assert!(builder.pool_config.test_on_check_out);
    }

    #[tokio::test]
    async fn test_zero_max_size_is_rejected() {
        let result = ConnectionPoolBuilder::new(CountingManager::default())
            .max_size(0)
            .min_idle(0)
            .build()
            .await;
        assert!(matches!(result, Err(PoolError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_min_idle_above_max_is_rejected() {
        let result = ConnectionPoolBuilder::new(CountingManager::default())
            .max_size(1)
            .min_idle(2)
            .build()
            .await;
        assert!(matches!(result, Err(PoolError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_prefills_min_idle() {
        let pool = ConnectionPoolBuilder::new(CountingManager::default())
            .max_size(4)
            .min_idle(2)
            .build()
            .await
            .unwrap();

        let stats = pool.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.idle, 2);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.total_created, 2);
    }

    #[tokio::test]
    async fn test_healthy_release_reuses_connection() {
        let pool = ConnectionPoolBuilder::new(CountingManager::default())
            .max_size(1)
            .min_idle(0)
            .build()
            .await
            .unwrap();

        let first = *pool.acquire().await.unwrap();
        let second = *pool.acquire().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(pool.stats().total_created, 1);
    }

    #[tokio::test]
    async fn test_settled_session_returns_healthy() {
        let pool = ConnectionPoolBuilder::new(CountingManager::default())
            .max_size(1)
            .min_idle(0)
            .build()
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let id = *conn.session();
        conn.settle(true);
        drop(conn);

        assert_eq!(*pool.acquire().await.unwrap(), id);
    }

    #[tokio::test]
    async fn test_unsettled_session_is_discarded() {
        let pool = ConnectionPoolBuilder::new(CountingManager::default())
            .max_size(1)
            .min_idle(0)
            .build()
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let id = *conn.session();
        drop(conn);

        assert_ne!(*pool.acquire().await.unwrap(), id);
        assert_eq!(pool.stats().total_discarded, 1);
    }

    #[test]
    fn test_pool_error_types() {
        let timeout_error = PoolError::Exhausted(Duration::from_millis(10));
        assert!(timeout_error.to_string().contains("Timed out"));

        let config_error = PoolError::Configuration("test error".to_string());
        assert!(config_error.to_string().contains("test error"));
    }

    #[test]
    fn test_utilization_percent() {
        let stats = PoolStats {
            size: 5,
            idle: 1,
            active: 4,
            waiting: 0,
            max_size: 8,
            total_created: 5,
            total_discarded: 0,
            total_timeouts: 0,
        };
        assert_eq!(stats.utilization_percent(), 50.0);
    }
}
