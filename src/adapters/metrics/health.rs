//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live, /ready and /status endpoints via axum 0.7 for Docker
//! health checks and monitoring. Readiness follows the price client's
//! connection state: ready while prices flow from either transport.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument};

use crate::domain::price::ConnectionState;

/// Body of the `/status` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatusBody {
    /// Current connection state.
    pub state: ConnectionState,
    /// Indicator text for the state.
    pub label: &'static str,
}

/// Axum-based health check HTTP server.
///
/// Serves liveness (/live), readiness (/ready) and a JSON status
/// (/status) for orchestrator probes and dashboards.
pub struct HealthServer {
    /// Read-only view of the client's connection state.
    state_rx: watch::Receiver<ConnectionState>,
    /// Bind port (default 8080 from config).
    port: u16,
}

impl HealthServer {
    /// Create a new health server.
    pub const fn new(state_rx: watch::Receiver<ConnectionState>, port: u16) -> Self {
        Self { state_rx, port }
    }

    /// Build the router; split out so it can be served on any listener.
    pub fn router(state_rx: watch::Receiver<ConnectionState>) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/status", get(Self::status))
            .with_state(state_rx)
    }

    /// Start the health check server.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Self::router(self.state_rx);

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: 200 while Connected or Polling.
    async fn readiness(State(rx): State<watch::Receiver<ConnectionState>>) -> impl IntoResponse {
        if rx.borrow().is_serving() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    /// Current connection state as JSON.
    async fn status(State(rx): State<watch::Receiver<ConnectionState>>) -> Json<StatusBody> {
        let state = *rx.borrow();
        Json(StatusBody {
            state,
            label: state.label(),
        })
    }
}
