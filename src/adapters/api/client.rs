//! Polling HTTP Client - REST Price Lookup
//!
//! Wraps reqwest for the polling fallback: one GET to
//! `{base_url}/price/{symbol}` per tick. No retries here; the next
//! poll tick is the retry.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::FeedConfig;
use crate::domain::error::FeedError;
use crate::domain::price::PriceUpdate;
use crate::ports::price_source::PriceSource;

/// Configuration for the polling HTTP client.
#[derive(Debug, Clone)]
pub struct PollingClientConfig {
  /// Base URL of the price REST API.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
}

impl Default for PollingClientConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8001".to_string(),
      timeout: Duration::from_secs(5),
    }
  }
}

impl From<&FeedConfig> for PollingClientConfig {
  fn from(feed: &FeedConfig) -> Self {
    Self {
      base_url: feed.poll_base_url.clone(),
      timeout: Duration::from_millis(feed.request_timeout_ms),
    }
  }
}

/// HTTP client for the `/price/{symbol}` endpoint.
pub struct PollingClient {
  /// Underlying HTTP client.
  http: Client,
  /// Parsed `base_url`; symbols are appended as encoded path segments.
  base_url: Url,
}

impl PollingClient {
  /// Create a new polling client.
  ///
  /// # Errors
  /// Fails if `base_url` is not an absolute http(s) URL or the underlying
  /// HTTP client cannot be built.
  pub fn new(config: PollingClientConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .with_context(|| format!("Invalid polling base URL: {}", config.base_url))?;
    anyhow::ensure!(
      matches!(base_url.scheme(), "http" | "https"),
      "polling base URL must use http:// or https://, got {}",
      config.base_url
    );

    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(2)
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self { http, base_url })
  }

  /// Full URL polled for `symbol`. The symbol is percent-encoded as a
  /// single path segment.
  pub fn price_url(&self, symbol: &str) -> Url {
    let mut url = self.base_url.clone();
    // http(s) URLs always have a path; checked in new()
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push("price").push(symbol);
    }
    url
  }
}

#[async_trait]
impl PriceSource for PollingClient {
  async fn fetch_price(&self, symbol: &str) -> Result<PriceUpdate, FeedError> {
    let url = self.price_url(symbol);
    debug!(url = %url, "Polling price");

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| FeedError::PollingRequestFailed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(FeedError::PollingRequestFailed(format!("HTTP {status}")));
    }

    let body = response
      .text()
      .await
      .map_err(|e| FeedError::PollingRequestFailed(e.to_string()))?;

    PriceUpdate::from_json(&body).map_err(|e| FeedError::PollingRequestFailed(e.to_string()))
  }
}
