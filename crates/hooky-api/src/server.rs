//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Handler execution
//!
//! There is no timeout layer: a webhook request stays open until every
//! handler for its notification has finished.
//!
//! # Graceful Shutdown
//!
//! On CTRL+C or SIGTERM the server stops accepting connections and waits
//! for in-flight dispatches to complete.

use std::net::SocketAddr;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use hooky_dispatch::Dispatcher;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::handlers;

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    /// Dispatcher holding the immutable application registry.
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Wraps a dispatcher for use as router state.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use hooky_api::{create_router, AppState};
/// use hooky_core::AppRegistry;
/// use hooky_dispatch::{
///     client::{ClientConfig, HockeyAppClient, DEFAULT_API_URL},
///     Dispatcher,
/// };
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HockeyAppClient::new(DEFAULT_API_URL, &ClientConfig::default())?;
/// let dispatcher = Dispatcher::new(Arc::new(AppRegistry::builder().build()), Arc::new(client));
/// let app = create_router(AppState::new(dispatcher));
/// // Serve the app...
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/live", get(handlers::liveness_check));

    let webhook_routes =
        Router::new().route("/hockeyapp_webhook", post(handlers::hockeyapp_webhook));

    Router::new()
        .merge(health_routes)
        .merge(webhook_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound or the
/// listener fails while serving.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!(addr = %actual_addr, "http server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("http server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install ctrl+c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to install sigterm handler");
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received ctrl+c, starting graceful shutdown");
        },
        () = terminate => {
            info!("received sigterm, starting graceful shutdown");
        },
    }

    warn!("waiting for in-flight dispatches to complete");
}
