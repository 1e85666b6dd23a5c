//! Configuration Module - TOML-based Client Configuration
//!
//! Loads and validates configuration from `config.toml`. Every table
//! and key has a default matching the dashboard deployment, so an empty
//! file is a valid configuration. Endpoints and retry parameters are
//! externalized here - nothing is hardcoded in the client.

pub mod loader;

use serde::Deserialize;

/// Top-level client configuration.
///
/// Loaded from `config.toml` at startup and validated before the
/// price client is constructed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Process identity and logging.
  #[serde(default)]
  pub client: ClientConfig,
  /// Price feed endpoints and retry policy.
  #[serde(default)]
  pub feed: FeedConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Process identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
  /// Human-readable client name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Price feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
  /// Streaming endpoint (`ws://` or `wss://`).
  #[serde(default = "default_ws_url")]
  pub ws_url: String,
  /// Base URL of the polling fallback; `/price/{symbol}` is appended.
  #[serde(default = "default_poll_base_url")]
  pub poll_base_url: String,
  /// Symbol subscribed on every connect until changed.
  #[serde(default = "default_symbol")]
  pub default_symbol: String,
  /// Reconnect attempts before falling back to polling.
  #[serde(default = "default_max_reconnect_attempts")]
  pub max_reconnect_attempts: u32,
  /// Linear backoff unit (milliseconds).
  #[serde(default = "default_reconnect_base_delay")]
  pub reconnect_base_delay_ms: u64,
  /// Polling fallback interval (milliseconds).
  #[serde(default = "default_poll_interval")]
  pub poll_interval_ms: u64,
  /// Give up on a connect attempt after this long (milliseconds).
  #[serde(default = "default_connect_timeout")]
  pub connect_timeout_ms: u64,
  /// HTTP timeout for one polling request (milliseconds).
  #[serde(default = "default_request_timeout")]
  pub request_timeout_ms: u64,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
    }
  }
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      ws_url: default_ws_url(),
      poll_base_url: default_poll_base_url(),
      default_symbol: default_symbol(),
      max_reconnect_attempts: default_max_reconnect_attempts(),
      reconnect_base_delay_ms: default_reconnect_base_delay(),
      poll_interval_ms: default_poll_interval(),
      connect_timeout_ms: default_connect_timeout(),
      request_timeout_ms: default_request_timeout(),
    }
  }
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: default_true(),
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "realtime-price-client".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_ws_url() -> String {
  "ws://localhost:8000/ws/price".to_string()
}

fn default_poll_base_url() -> String {
  "http://localhost:8001".to_string()
}

fn default_symbol() -> String {
  "btcusdt".to_string()
}

const fn default_max_reconnect_attempts() -> u32 {
  5
}

const fn default_reconnect_base_delay() -> u64 {
  2000
}

const fn default_poll_interval() -> u64 {
  1000
}

const fn default_connect_timeout() -> u64 {
  10_000
}

const fn default_request_timeout() -> u64 {
  5000
}

const fn default_true() -> bool {
  true
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

const fn default_health_port() -> u16 {
  8080
}
