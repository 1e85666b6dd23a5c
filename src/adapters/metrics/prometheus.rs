//! Prometheus Metrics Registry - Feed Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers update throughput per transport, decode failures, the
//! reconnect ladder, polling failures and the current connection state.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{
    Encoder, GaugeVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::domain::price::{ConnectionState, PriceUpdate};

/// Which transport delivered an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// The live WebSocket stream.
    Stream,
    /// The HTTP polling fallback.
    Polling,
}

impl Transport {
    /// Metric label value.
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Polling => "polling",
        }
    }
}

/// Centralized Prometheus metrics for the price client.
///
/// All metrics follow the naming convention `price_client_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Updates delivered to the presentation layer, by transport.
    pub updates_received: IntCounterVec,
    /// Payloads dropped because they failed to decode, by transport.
    pub malformed_messages: IntCounterVec,
    /// Reconnect attempts scheduled.
    pub reconnect_attempts: IntCounter,
    /// Polling requests that failed.
    pub poll_failures: IntCounter,
    /// Current connection state (0=disconnected 1=connecting 2=connected 3=polling).
    pub connection_state: IntGauge,
    /// Last delivered price, by symbol.
    pub last_price: GaugeVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    ///
    /// # Errors
    /// Fails if a metric definition is invalid or registered twice.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let updates_received = IntCounterVec::new(
            Opts::new(
                "price_client_updates_received_total",
                "Price updates delivered to the presentation layer",
            ),
            &["transport"],
        )?;

        let malformed_messages = IntCounterVec::new(
            Opts::new(
                "price_client_malformed_messages_total",
                "Inbound payloads dropped because they failed to decode",
            ),
            &["transport"],
        )?;

        let reconnect_attempts = IntCounter::new(
            "price_client_reconnect_attempts_total",
            "Reconnect attempts scheduled after a transport close",
        )?;

        let poll_failures = IntCounter::new(
            "price_client_poll_failures_total",
            "Polling fallback requests that failed",
        )?;

        let connection_state = IntGauge::new(
            "price_client_connection_state",
            "Connection state (0=disconnected, 1=connecting, 2=connected, 3=polling)",
        )?;

        let last_price = GaugeVec::new(
            Opts::new("price_client_last_price", "Last delivered price"),
            &["symbol"],
        )?;

        // Register all metrics
        registry.register(Box::new(updates_received.clone()))?;
        registry.register(Box::new(malformed_messages.clone()))?;
        registry.register(Box::new(reconnect_attempts.clone()))?;
        registry.register(Box::new(poll_failures.clone()))?;
        registry.register(Box::new(connection_state.clone()))?;
        registry.register(Box::new(last_price.clone()))?;

        Ok(Self {
            registry,
            updates_received,
            malformed_messages,
            reconnect_attempts,
            poll_failures,
            connection_state,
            last_price,
        })
    }

    /// Account for one delivered update.
    pub fn record_update(&self, transport: Transport, update: &PriceUpdate) {
        self.updates_received
            .with_label_values(&[transport.as_label()])
            .inc();
        self.last_price
            .with_label_values(&[update.symbol.as_str()])
            .set(update.price);
    }

    /// Account for one dropped payload.
    pub fn record_malformed(&self, transport: Transport) {
        self.malformed_messages
            .with_label_values(&[transport.as_label()])
            .inc();
    }

    /// Mirror the client's state into the gauge.
    pub fn record_state(&self, state: ConnectionState) {
        self.connection_state.set(state.as_gauge());
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move {
                    metrics.render().map_err(|e| {
                        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                    })
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
