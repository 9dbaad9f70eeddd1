pub mod error_response;
pub mod handlers;
pub mod shutdown;

pub use error_response::ErrorResponse;
pub use shutdown::RequestTracker;

use crate::config::ServerConfig;
use crate::db::DbPool;
use crate::health::HealthService;
use crate::{BusinessError, Result};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub health: HealthService,
    pub tracker: RequestTracker,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        Self {
            health: HealthService::new(pool.clone()),
            pool,
            tracker: RequestTracker::new(),
        }
    }
}

/// The routing table, without middleware or state
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/dashboard", get(handlers::dashboard))
        .route("/employees", get(handlers::list_employees).post(handlers::create_employee))
        .route("/roster/shifts", post(handlers::create_shift))
        .route("/roster/week", get(handlers::roster_week))
        .route("/roster/generate", post(handlers::generate_roster))
        .route("/payroll/calc", post(handlers::payroll_calc))
        .route("/taxsuper/rules", get(handlers::get_rules).post(handlers::update_rules))
        .route("/cashflow/tx", post(handlers::create_transaction))
        .route("/cashflow/summary", get(handlers::cashflow_summary))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
}

/// Attach the 404 fallback, request tracking, tracing and CORS to `router`
pub fn with_layers(router: Router<AppState>, state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    router
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.tracker.clone(),
            shutdown::track_request,
        ))
        .layer(stack)
        .with_state(state)
}

pub fn build_router(state: AppState) -> Router {
    with_layers(routes(), state)
}

/// Serve `app` until `shutdown` resolves, then stop accepting, give
/// in-flight requests `grace` to finish and cancel whatever is left.
pub async fn run<F>(
    listener: TcpListener,
    app: Router,
    tracker: RequestTracker,
    shutdown: F,
    grace: Duration,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let drain = {
        let tracker = tracker.clone();
        async move {
            shutdown.await;
            info!("Shutdown requested, no longer accepting connections");
            // Runs beside the server so the deadline holds while axum waits
            // for open connections to finish
            tokio::spawn(async move {
                tracker.drain(grace).await;
            });
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(drain)
        .await
        .map_err(BusinessError::Io)?;

    info!("HTTP server stopped with {} requests in flight", tracker.in_flight());
    Ok(())
}

/// Bind the configured address, serve until SIGINT or SIGTERM, then close
/// the pool
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| BusinessError::Configuration(format!("invalid bind address: {}", e)))?;

    let listener = TcpListener::bind(addr).await?;
    info!("Starting Business Manager API on http://{}", addr);

    let app = build_router(state.clone());
    run(listener, app, state.tracker.clone(), shutdown_signal(), config.shutdown_grace()).await?;

    if let Err(e) = state.pool.close(config.shutdown_grace()).await {
        warn!("Connection pool did not drain cleanly: {}", e);
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
