//! Price feed domain types.
//!
//! Defines the update, subscription and connection-state types shared by
//! the client, its ports and the presentation layer, plus the decoder for
//! inbound feed payloads (used by both the stream and the polling path).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::FeedError;

// ────────────────────────────────────────────
// Price updates
// ────────────────────────────────────────────

/// A single price observation, stamped at receipt. Transient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceUpdate {
    /// Lowercase ticker, e.g. `btcusdt`.
    pub symbol: String,
    /// Last price, always finite and positive.
    pub price: f64,
    /// When this process received the update.
    pub received_at: DateTime<Utc>,
}

impl PriceUpdate {
    /// Build a validated update stamped with the current time.
    ///
    /// # Errors
    /// `MalformedMessage` if the symbol is blank or the price is not a
    /// finite positive number.
    pub fn new(symbol: &str, price: f64) -> Result<Self, FeedError> {
        let symbol = normalize_symbol(symbol)
            .ok_or_else(|| FeedError::MalformedMessage("empty symbol".to_string()))?;

        if !price.is_finite() || price <= 0.0 {
            return Err(FeedError::MalformedMessage(format!(
                "invalid price {price} for {symbol}"
            )));
        }

        Ok(Self {
            symbol,
            price,
            received_at: Utc::now(),
        })
    }

    /// Decode a `{"symbol": .., "price": ..}` JSON payload.
    ///
    /// # Errors
    /// `MalformedMessage` on invalid JSON, missing fields or a bad price.
    pub fn from_json(text: &str) -> Result<Self, FeedError> {
        let wire: WireUpdate = serde_json::from_str(text)?;
        wire.into_update()
    }
}

/// Trim and lowercase a ticker. Returns `None` for a blank symbol.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Update payload as it appears on the wire.
#[derive(Debug, Deserialize)]
struct WireUpdate {
    symbol: String,
    price: WirePrice,
}

/// The feed server forwards exchange prices either as numbers or strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WirePrice {
    Number(f64),
    Text(String),
}

impl WireUpdate {
    fn into_update(self) -> Result<PriceUpdate, FeedError> {
        let price = match self.price {
            WirePrice::Number(p) => p,
            WirePrice::Text(raw) => raw.trim().parse::<f64>().map_err(|_| {
                FeedError::MalformedMessage(format!("non-numeric price {raw:?}"))
            })?,
        };
        PriceUpdate::new(&self.symbol, price)
    }
}

// ────────────────────────────────────────────
// Inbound stream frames
// ────────────────────────────────────────────

/// A decoded text frame from the streaming transport.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// A price observation for the presentation layer.
    Price(PriceUpdate),
    /// Server keep-alive; carries nothing for the client.
    Heartbeat,
}

impl InboundMessage {
    /// Decode one text frame.
    ///
    /// # Errors
    /// `MalformedMessage` if the frame is neither a heartbeat nor a
    /// valid price update.
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        if value.get("type").and_then(serde_json::Value::as_str) == Some("heartbeat") {
            return Ok(Self::Heartbeat);
        }

        let wire: WireUpdate = serde_json::from_value(value)?;
        wire.into_update().map(Self::Price)
    }
}

// ────────────────────────────────────────────
// Outbound subscription
// ────────────────────────────────────────────

/// Fire-and-forget request asking the server to stream a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    /// Ticker to stream.
    pub symbol: String,
}

impl SubscriptionRequest {
    /// Request a subscription for `symbol`.
    pub fn subscribe(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    /// Wire form: `{"action":"subscribe","symbol":"<ticker>"}`.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "action": "subscribe",
            "symbol": self.symbol,
        })
        .to_string()
    }
}

// ────────────────────────────────────────────
// Connection state
// ────────────────────────────────────────────

/// Lifecycle of the price client's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport; a retry may be pending.
    Disconnected,
    /// A streaming connect attempt is in flight.
    Connecting,
    /// The stream is open and subscribed.
    Connected,
    /// Streaming abandoned; prices come from the polling fallback.
    Polling,
}

impl ConnectionState {
    /// Text for the connection-status indicator.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Real-Time Connected",
            Self::Polling => "Polling (Fallback Mode)",
        }
    }

    /// Numeric encoding for the state gauge.
    pub const fn as_gauge(self) -> i64 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::Polling => 3,
        }
    }

    /// Whether prices are currently flowing from some transport.
    pub const fn is_serving(self) -> bool {
        matches!(self, Self::Connected | Self::Polling)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_price() {
        let msg = InboundMessage::parse(r#"{"symbol":"btcusdt","price":50000.12}"#).unwrap();
        match msg {
            InboundMessage::Price(update) => {
                assert_eq!(update.symbol, "btcusdt");
                assert!((update.price - 50000.12).abs() < f64::EPSILON);
            }
            InboundMessage::Heartbeat => panic!("expected price"),
        }
    }

    #[test]
    fn test_parse_string_price_and_uppercase_symbol() {
        let update = PriceUpdate::from_json(r#"{"symbol":"ETHUSDT","price":"3012.50000000"}"#)
            .unwrap();
        assert_eq!(update.symbol, "ethusdt");
        assert!((update.price - 3012.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_heartbeat() {
        let msg = InboundMessage::parse(r#"{"type":"heartbeat","timestamp":1700000000.5}"#)
            .unwrap();
        assert_eq!(msg, InboundMessage::Heartbeat);
    }

    #[test]
    fn test_reject_not_available_price() {
        let err = InboundMessage::parse(r#"{"symbol":"BTCUSDT","price":"N/A"}"#).unwrap_err();
        assert!(matches!(err, FeedError::MalformedMessage(_)));
    }

    #[test]
    fn test_reject_error_payload_with_zero_price() {
        let body = r#"{"symbol":"BTCUSDT","price":0.0,"status":"error","message":"Failed to fetch price"}"#;
        assert!(PriceUpdate::from_json(body).is_err());
    }

    #[test]
    fn test_reject_garbage() {
        assert!(InboundMessage::parse("not json").is_err());
        assert!(InboundMessage::parse(r#"{"symbol":"btcusdt"}"#).is_err());
        assert!(InboundMessage::parse(r#"{"symbol":"  ","price":1.0}"#).is_err());
    }

    #[test]
    fn test_subscription_wire_format() {
        let req = SubscriptionRequest::subscribe("btcusdt");
        assert_eq!(req.to_json(), r#"{"action":"subscribe","symbol":"btcusdt"}"#);
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(ConnectionState::Connected.to_string(), "Real-Time Connected");
        assert!(ConnectionState::Polling.is_serving());
        assert!(!ConnectionState::Connecting.is_serving());
    }
}
