//! WebSocket Price Stream - tokio-tungstenite Transport Adapter
//!
//! Implements the `StreamConnector` / `StreamSession` ports over a
//! plain or TLS WebSocket. Control frames are handled here so the
//! client only ever sees text payloads or a close.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, instrument};

use crate::domain::error::FeedError;
use crate::ports::price_stream::{StreamConnector, StreamSession};

/// Opens WebSocket sessions to the price server.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a connector.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamConnector for WebSocketConnector {
    #[instrument(skip(self))]
    async fn connect(&self, url: &str) -> Result<Box<dyn StreamSession>, FeedError> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| FeedError::TransportUnavailable(e.to_string()))?;

        info!(status = %response.status(), "Price WebSocket connected");

        Ok(Box::new(WebSocketSession { stream }))
    }
}

/// One open WebSocket connection.
pub struct WebSocketSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl StreamSession for WebSocketSession {
    async fn send_text(&mut self, text: String) -> Result<(), FeedError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| FeedError::TransportClosed(e.to_string()))
    }

    async fn recv_text(&mut self) -> Result<Option<String>, FeedError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => return Ok(Some(text)),
                    Err(e) => {
                        debug!(error = %e, "Dropping non-UTF-8 binary frame");
                    }
                },
                Some(Ok(Message::Ping(data))) => {
                    // Pong is queued automatically by tungstenite
                    debug!(len = data.len(), "Ping received");
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(frame = ?frame, "Close frame received");
                    return Ok(None);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(FeedError::TransportClosed(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "Error while closing WebSocket");
        }
    }
}
