//! Price Source Port - Request/Response Price Lookup
//!
//! The polling fallback asks a `PriceSource` for the current price of
//! one symbol per tick.

use async_trait::async_trait;

use crate::domain::error::FeedError;
use crate::domain::price::PriceUpdate;

/// One-shot price lookup used when streaming is unavailable.
#[async_trait]
pub trait PriceSource: Send + Sync + 'static {
  /// Fetch the current price for `symbol`.
  ///
  /// # Errors
  /// `PollingRequestFailed` if the request fails or the response does
  /// not decode into a valid update.
  async fn fetch_price(&self, symbol: &str) -> Result<PriceUpdate, FeedError>;
}
