//! Price Feed Adapters - Real-time Price Streaming
//!
//! Provides the WebSocket implementation of the streaming transport
//! ports consumed by the price client.

pub mod websocket;

pub use websocket::{WebSocketConnector, WebSocketSession};
