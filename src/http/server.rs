//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, request metrics)
//! - Bind server to listener
//! - Graceful shutdown on Ctrl+C

use axum::{
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::chain::ChainIdentity;
use crate::config::ListenerConfig;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::mechanism::MechanismRegistry;
use crate::observability::metrics;
use crate::rewards::RewardPreparer;
use crate::scoring::ScoringClient;
use crate::settlement::SettlementGate;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: MechanismRegistry,
    pub gate: Arc<SettlementGate>,
    pub scoring: ScoringClient,
    pub preparer: Arc<RewardPreparer>,
    pub chain: ChainIdentity,
    /// Whole tokens prepared by `/icm/prepare`.
    pub hit_reward: u64,
    /// Kind of signing authority bound at startup ("none" when prepare-only).
    pub signer: &'static str,
}

/// HTTP server for the bridge API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over already-wired subsystems.
    pub fn new(config: &ListenerConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/mechanisms", get(handlers::list_mechanisms))
            .route("/api/mechanisms/{name}/execute", post(handlers::execute_action))
            .route("/icm/prepare", post(handlers::prepare_reward))
            .route("/api/predict", post(handlers::predict))
            .route("/api/settlement", get(handlers::settlement))
            .route("/api/settlement/decision", post(handlers::decide))
            .route("/api/settlement/history", get(handlers::history))
            .route_layer(middleware::from_fn(track_requests))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    /// The fully layered router, for serving in-process.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Count requests by matched route template and status.
async fn track_requests(request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let id = request_id(&request).unwrap_or("unknown").to_string();
    let response = next.run(request).await;
    tracing::debug!(request_id = %id, path = %path, status = response.status().as_u16(), "Request completed");
    metrics::record_http_request(&path, response.status().as_u16());
    response
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
