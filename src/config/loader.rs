//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use reqwest::Url;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  parse_config(&content)
}

/// Parse and validate configuration from TOML text.
///
/// # Errors
/// Fails on TOML syntax errors or validation failures.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Streaming URL with a ws/wss scheme
/// - Polling base URL with an http/https scheme
/// - Positive intervals and a non-zero retry limit
/// - Non-empty default symbol
fn validate_config(config: &AppConfig) -> Result<()> {
  let feed = &config.feed;

  let ws_url = Url::parse(&feed.ws_url)
    .with_context(|| format!("Invalid ws_url: {}", feed.ws_url))?;
  anyhow::ensure!(
    matches!(ws_url.scheme(), "ws" | "wss"),
    "ws_url must use ws:// or wss://, got {}",
    feed.ws_url
  );

  let poll_url = Url::parse(&feed.poll_base_url)
    .with_context(|| format!("Invalid poll_base_url: {}", feed.poll_base_url))?;
  anyhow::ensure!(
    matches!(poll_url.scheme(), "http" | "https"),
    "poll_base_url must use http:// or https://, got {}",
    feed.poll_base_url
  );

  anyhow::ensure!(
    !feed.default_symbol.trim().is_empty(),
    "default_symbol must not be empty"
  );
  anyhow::ensure!(
    feed.max_reconnect_attempts > 0,
    "max_reconnect_attempts must be positive"
  );
  anyhow::ensure!(
    feed.reconnect_base_delay_ms > 0,
    "reconnect_base_delay_ms must be positive"
  );
  anyhow::ensure!(
    feed.poll_interval_ms > 0,
    "poll_interval_ms must be positive"
  );
  anyhow::ensure!(
    feed.connect_timeout_ms > 0 && feed.request_timeout_ms > 0,
    "connect_timeout_ms and request_timeout_ms must be positive"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_load_shipped_config() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml");
    let config = load_config(path).unwrap();
    assert_eq!(config.feed.ws_url, "ws://localhost:8000/ws/price");
    assert_eq!(config.metrics.health_port, 8080);
  }

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config.feed.ws_url, "ws://localhost:8000/ws/price");
    assert_eq!(config.feed.poll_base_url, "http://localhost:8001");
    assert_eq!(config.feed.default_symbol, "btcusdt");
    assert_eq!(config.feed.max_reconnect_attempts, 5);
    assert_eq!(config.feed.reconnect_base_delay_ms, 2000);
    assert_eq!(config.feed.poll_interval_ms, 1000);
    assert!(config.metrics.enabled);
  }

  #[test]
  fn test_overrides_are_applied() {
    let config = parse_config(
      r#"
      [client]
      name = "desk-7"
      log_level = "debug"

      [feed]
      ws_url = "wss://feed.example.com/ws/price"
      default_symbol = "ethusdt"
      max_reconnect_attempts = 3
      "#,
    )
    .unwrap();
    assert_eq!(config.client.name, "desk-7");
    assert_eq!(config.feed.ws_url, "wss://feed.example.com/ws/price");
    assert_eq!(config.feed.max_reconnect_attempts, 3);
    assert_eq!(config.feed.poll_interval_ms, 1000);
  }

  #[test]
  fn test_rejects_http_stream_url() {
    let result = parse_config(
      r#"
      [feed]
      ws_url = "http://localhost:8000/ws/price"
      "#,
    );
    assert!(result.is_err());
  }

  #[test]
  fn test_rejects_zero_attempts() {
    let result = parse_config(
      r"
      [feed]
      max_reconnect_attempts = 0
      ",
    );
    assert!(result.is_err());
  }

  #[test]
  fn test_rejects_blank_symbol() {
    let result = parse_config(
      r#"
      [feed]
      default_symbol = "   "
      "#,
    );
    assert!(result.is_err());
  }
}
