//! Real-Time Price Client — Entry Point
//!
//! Initializes configuration, logging, the transport adapters and the
//! price stream client. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from PRICE_CLIENT_CONFIG) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create the shutdown broadcast channel
//! 4. Create WebSocket connector + polling HTTP client
//! 5. Create metrics registry
//! 6. Construct PriceStreamClient with the terminal display wired in
//! 7. Spawn health + metrics servers
//! 8. Spawn the client (connects immediately)
//! 9. Wait for SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use realtime_price_client::adapters::api::{PollingClient, PollingClientConfig};
use realtime_price_client::adapters::display::TerminalDisplay;
use realtime_price_client::adapters::feeds::WebSocketConnector;
use realtime_price_client::adapters::metrics::{HealthServer, MetricsRegistry};
use realtime_price_client::config;
use realtime_price_client::usecases::price_stream_client::{
    PriceStreamClient, PriceStreamConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path =
        std::env::var("PRICE_CLIENT_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.client.log_level)),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    info!(
        name = %config.client.name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting real-time price client"
    );
    info!(
        config_path = %config_path,
        ws_url = %config.feed.ws_url,
        poll_base_url = %config.feed.poll_base_url,
        symbol = %config.feed.default_symbol,
        max_attempts = config.feed.max_reconnect_attempts,
        "Configuration loaded successfully"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Transport adapters ───────────────────────────────
    let connector = Arc::new(WebSocketConnector::new());
    let poller = Arc::new(
        PollingClient::new(PollingClientConfig::from(&config.feed))
            .context("Failed to create polling client")?,
    );

    // ── 5. Metrics registry ─────────────────────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);

    // ── 6. Price client with the terminal display wired in ──
    let mut price_display = TerminalDisplay::stdout();
    let mut status_display = TerminalDisplay::stdout();
    let client = PriceStreamClient::new(PriceStreamConfig::from(&config.feed), connector, poller)
        .with_metrics(Arc::clone(&metrics))
        .on_update(move |update| {
            if let Err(e) = price_display.render_update(update) {
                warn!(error = %e, "Failed to render price update");
            }
        })
        .on_status(move |state| {
            if let Err(e) = status_display.render_status(state) {
                warn!(error = %e, "Failed to render connection status");
            }
        });

    // ── 7. Health + metrics servers ─────────────────────────
    let health = HealthServer::new(client.watch_state(), config.metrics.health_port);
    let health_handle = tokio::spawn({
        let shutdown_rx = shutdown_tx.subscribe();
        async move {
            if let Err(e) = health.run(shutdown_rx).await {
                error!(error = %e, "Health server failed");
            }
        }
    });

    let metrics_handle = if config.metrics.enabled {
        let shutdown_rx = shutdown_tx.subscribe();
        let bind_address = config.metrics.bind_address.clone();
        let metrics_ref = Arc::clone(&metrics);
        Some(tokio::spawn(async move {
            if let Err(e) = metrics_ref.serve(bind_address, shutdown_rx).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    // ── 8. Start streaming ──────────────────────────────────
    let handle = client.spawn(shutdown_tx.subscribe());
    info!("Price client running — press Ctrl+C to exit");

    // ── 9. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c()
        .await
        .context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    // Signal all tasks to stop
    let _ = shutdown_tx.send(());

    // Wait for the client to close its transport (up to 5s)
    match tokio::time::timeout(Duration::from_secs(5), handle.shutdown()).await {
        Ok(Ok(())) => info!("Price client stopped"),
        Ok(Err(e)) => warn!(error = %e, "Price client task ended abnormally"),
        Err(_) => warn!("Price client did not stop within 5s"),
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;
    if let Some(metrics_handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), metrics_handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}
