//! Feed Decoding Benchmarks — Per-Update Hot Path
//!
//! Benchmarks the work done for every inbound frame: decoding the JSON
//! payload and formatting the price for display.
//!
//! Run with: cargo bench --bench parse_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use realtime_price_client::adapters::display::format_usd;
use realtime_price_client::domain::{InboundMessage, SubscriptionRequest};

/// Benchmark decoding an update with a numeric price.
fn bench_parse_numeric(c: &mut Criterion) {
    let frame = r#"{"symbol":"BTCUSDT","price":50000.12}"#;

    c.bench_function("parse_update_numeric", |b| {
        b.iter(|| {
            let _msg = InboundMessage::parse(black_box(frame));
        });
    });
}

/// Benchmark decoding an update with a string price (exchange style).
fn bench_parse_string_price(c: &mut Criterion) {
    let frame = r#"{"symbol":"BTCUSDT","price":"50000.12000000"}"#;

    c.bench_function("parse_update_string_price", |b| {
        b.iter(|| {
            let _msg = InboundMessage::parse(black_box(frame));
        });
    });
}

/// Benchmark recognising a heartbeat.
fn bench_parse_heartbeat(c: &mut Criterion) {
    let frame = r#"{"type":"heartbeat","timestamp":1700000000.25}"#;

    c.bench_function("parse_heartbeat", |b| {
        b.iter(|| {
            let _msg = InboundMessage::parse(black_box(frame));
        });
    });
}

/// Benchmark rejecting a malformed frame.
fn bench_parse_malformed(c: &mut Criterion) {
    let frame = r#"{"symbol":"BTCUSDT","price":"N/A"}"#;

    c.bench_function("parse_malformed", |b| {
        b.iter(|| {
            let _msg = InboundMessage::parse(black_box(frame));
        });
    });
}

/// Benchmark encoding a subscription request.
fn bench_subscription_json(c: &mut Criterion) {
    let request = SubscriptionRequest::subscribe("ethusdt");

    c.bench_function("subscription_to_json", |b| {
        b.iter(|| {
            let _json = black_box(&request).to_json();
        });
    });
}

/// Benchmark currency formatting for the display line.
fn bench_format_usd(c: &mut Criterion) {
    c.bench_function("format_usd", |b| {
        b.iter(|| {
            let _text = format_usd(black_box(1_234_567.891_2));
        });
    });
}

criterion_group!(
    benches,
    bench_parse_numeric,
    bench_parse_string_price,
    bench_parse_heartbeat,
    bench_parse_malformed,
    bench_subscription_json,
    bench_format_usd,
);
criterion_main!(benches);
