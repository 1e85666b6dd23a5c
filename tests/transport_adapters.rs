//! Transport Adapter Tests — Local WebSocket and HTTP Servers
//!
//! Exercises the tokio-tungstenite session and the reqwest polling
//! client against servers bound to an ephemeral localhost port.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::Message;

use realtime_price_client::adapters::api::{PollingClient, PollingClientConfig};
use realtime_price_client::adapters::feeds::WebSocketConnector;
use realtime_price_client::adapters::metrics::HealthServer;
use realtime_price_client::domain::{ConnectionState, FeedError, SubscriptionRequest};
use realtime_price_client::ports::{PriceSource, StreamConnector, StreamSession};
use realtime_price_client::usecases::{PriceStreamClient, PriceStreamConfig};

const HEARTBEAT: &str = r#"{"type":"heartbeat","timestamp":1700000000.5}"#;
const BTC_UPDATE: &str = r#"{"symbol":"BTCUSDT","price":"50000.12"}"#;

/// Accept one WebSocket client, send `frames` after its first message,
/// close, and return that first message.
async fn one_shot_feed(frames: Vec<&'static str>) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        let first = ws.next().await.unwrap().unwrap().into_text().unwrap();
        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        ws.close(None).await.unwrap();
        first
    });

    (format!("ws://{addr}/ws/price"), server)
}

async fn price_api() -> String {
    let app = Router::new()
        .route(
            "/price/:symbol",
            get(|Path(symbol): Path<String>| async move {
                Json(serde_json::json!({ "symbol": symbol.to_uppercase(), "price": 50000.12 }))
            }),
        )
        .route(
            "/down/price/:symbol",
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream unavailable") }),
        )
        .route(
            "/error/price/:symbol",
            get(|| async {
                Json(serde_json::json!({ "symbol": "btcusdt", "price": 0.0, "status": "error" }))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn polling_client(base_url: String) -> PollingClient {
    PollingClient::new(PollingClientConfig {
        base_url,
        timeout: Duration::from_secs(2),
    })
    .unwrap()
}

// ---- WebSocket session ----

#[tokio::test]
async fn test_websocket_session_round_trip() {
    let (url, server) = one_shot_feed(vec![HEARTBEAT, BTC_UPDATE]).await;

    let mut session = WebSocketConnector::new().connect(&url).await.unwrap();
    session
        .send_text(SubscriptionRequest::subscribe("btcusdt").to_json())
        .await
        .unwrap();

    assert_eq!(session.recv_text().await.unwrap().as_deref(), Some(HEARTBEAT));
    assert_eq!(session.recv_text().await.unwrap().as_deref(), Some(BTC_UPDATE));
    assert_eq!(session.recv_text().await.unwrap(), None);

    assert_eq!(
        server.await.unwrap(),
        r#"{"action":"subscribe","symbol":"btcusdt"}"#
    );
}

#[tokio::test]
async fn test_websocket_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = WebSocketConnector::new()
        .connect(&format!("ws://{addr}/ws/price"))
        .await;

    assert!(matches!(result, Err(FeedError::TransportUnavailable(_))));
}

// ---- Polling client ----

#[tokio::test]
async fn test_polling_client_fetches_price() {
    let client = polling_client(price_api().await);

    let update = client.fetch_price("btcusdt").await.unwrap();
    assert_eq!(update.symbol, "btcusdt");
    assert!((update.price - 50000.12).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_polling_client_sends_symbol_as_one_segment() {
    let client = polling_client(price_api().await);

    // Reaches /price/:symbol rather than a deeper path or a query
    let update = client.fetch_price("btc/usdt?x=1").await.unwrap();
    assert_eq!(update.symbol, "btc/usdt?x=1");
}

#[tokio::test]
async fn test_polling_client_rejects_http_error() {
    let client = polling_client(format!("{}/down", price_api().await));

    let err = client.fetch_price("btcusdt").await.unwrap_err();
    assert_eq!(err, FeedError::PollingRequestFailed("HTTP 502 Bad Gateway".to_string()));
}

#[tokio::test]
async fn test_polling_client_rejects_error_payload() {
    let client = polling_client(format!("{}/error", price_api().await));

    let result = client.fetch_price("btcusdt").await;
    assert!(matches!(result, Err(FeedError::PollingRequestFailed(_))));
}

#[tokio::test]
async fn test_polling_client_unreachable_host() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = polling_client(format!("http://{addr}")).fetch_price("btcusdt").await;
    assert!(matches!(result, Err(FeedError::PollingRequestFailed(_))));
}

// ---- Health endpoints ----

#[tokio::test]
async fn test_readiness_follows_connection_state() {
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, HealthServer::router(state_rx)).await.unwrap();
    });
    let http = reqwest::Client::new();

    let live = http.get(format!("{base}/live")).send().await.unwrap();
    assert_eq!(live.status(), reqwest::StatusCode::OK);

    let ready = http.get(format!("{base}/ready")).send().await.unwrap();
    assert_eq!(ready.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    state_tx.send_replace(ConnectionState::Polling);
    let ready = http.get(format!("{base}/ready")).send().await.unwrap();
    assert_eq!(ready.status(), reqwest::StatusCode::OK);

    let status: serde_json::Value = http
        .get(format!("{base}/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["state"], "polling");
    assert_eq!(status["label"], "Polling (Fallback Mode)");
}

// ---- End to end ----

#[tokio::test]
async fn test_client_streams_from_live_socket() {
    let (ws_url, server) = one_shot_feed(vec![HEARTBEAT, BTC_UPDATE]).await;
    let poll_base = price_api().await;

    let config = PriceStreamConfig {
        ws_url,
        ..PriceStreamConfig::default()
    };
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let client = PriceStreamClient::new(
        config,
        Arc::new(WebSocketConnector::new()),
        Arc::new(polling_client(poll_base)),
    )
    .on_update(move |update| sink.lock().unwrap().push(update.clone()));
    let mut updates = client.update_stream();
    let handle = client.spawn(shutdown_rx);

    let update = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.symbol, "btcusdt");
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(
        server.await.unwrap(),
        r#"{"action":"subscribe","symbol":"btcusdt"}"#
    );

    // Server closed after one update; the client backs off to retry
    let mut state_rx = handle.watch_state();
    tokio::time::timeout(
        Duration::from_secs(5),
        state_rx.wait_for(|state| *state == ConnectionState::Disconnected),
    )
    .await
    .unwrap()
    .unwrap();

    tokio_test::assert_ok!(handle.shutdown().await);
}
