//! Price Stream Port - Streaming Transport Interface
//!
//! Defines the traits the client uses to open and drive a live,
//! bidirectional price stream. The client never depends on the
//! concrete socket library; adapters implement these traits.

use async_trait::async_trait;

use crate::domain::error::FeedError;

/// Opens streaming sessions to a price feed.
///
/// A connector is long-lived and shared; each successful `connect`
/// yields an independent session that the client owns exclusively.
#[async_trait]
pub trait StreamConnector: Send + Sync + 'static {
  /// Open a session to `url`.
  ///
  /// Resolves once the transport is open (the "open event").
  ///
  /// # Errors
  /// `TransportUnavailable` if the endpoint cannot be reached or the
  /// handshake is refused.
  async fn connect(&self, url: &str) -> Result<Box<dyn StreamSession>, FeedError>;
}

/// One open streaming connection.
///
/// `recv_text` must be cancel-safe: the client races it against timers
/// and commands and may drop the future between frames.
#[async_trait]
pub trait StreamSession: Send {
  /// Write one UTF-8 text frame.
  ///
  /// # Errors
  /// `TransportClosed` if the write fails.
  async fn send_text(&mut self, text: String) -> Result<(), FeedError>;

  /// Wait for the next text frame.
  ///
  /// Returns `Ok(None)` when the peer closed the stream.
  ///
  /// # Errors
  /// `TransportClosed` on a transport error.
  async fn recv_text(&mut self) -> Result<Option<String>, FeedError>;

  /// Close the session politely. Errors are swallowed.
  async fn close(&mut self);
}
