//! In-flight request tracking for graceful shutdown
//!
//! Every request passes through [`track_request`], which counts it while it
//! runs and races it against the cancellation flag. Once the grace period
//! runs out, [`RequestTracker::cancel_all`] drops the remaining handler
//! futures; any connection they had an operation in flight on is discarded
//! by the pool rather than returned.

use crate::BusinessError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tracing::{debug, info, warn};

struct TrackerInner {
    in_flight: AtomicUsize,
    idle: Notify,
    cancel: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct RequestTracker {
    inner: Arc<TrackerInner>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTracker")
            .field("in_flight", &self.in_flight())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            inner: Arc::new(TrackerInner {
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
                cancel,
            }),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancel.borrow()
    }

    /// Abort every tracked request and refuse new ones
    pub fn cancel_all(&self) {
        self.inner.cancel.send_replace(true);
    }

    fn enter(&self) -> RequestGuard {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        RequestGuard { tracker: self.clone() }
    }

    /// Resolve once no request is in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait up to `grace` for in-flight requests, then cancel the rest.
    /// Returns how many were cancelled.
    pub async fn drain(&self, grace: Duration) -> usize {
        info!("Draining {} in-flight requests", self.in_flight());
        if tokio::time::timeout(grace, self.wait_idle()).await.is_ok() {
            debug!("All requests finished within the grace period");
            return 0;
        }
        let remaining = self.in_flight();
        warn!("Grace period of {:?} elapsed, cancelling {} requests", grace, remaining);
        self.cancel_all();
        remaining
    }

    async fn cancelled(&self) {
        let mut rx = self.inner.cancel.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

struct RequestGuard {
    tracker: RequestTracker,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if self.tracker.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.inner.idle.notify_waiters();
        }
    }
}

/// Middleware counting the request and cutting it short on cancellation
pub async fn track_request(
    State(tracker): State<RequestTracker>,
    request: Request,
    next: Next,
) -> Response {
    if tracker.is_cancelled() {
        return BusinessError::ShuttingDown.into_response();
    }

    let _guard = tracker.enter();
    tokio::select! {
        response = next.run(request) => response,
        _ = tracker.cancelled() => {
            warn!("Request cancelled by shutdown");
            BusinessError::ShuttingDown.into_response()
        }
    }
}
