//! Use Cases Layer - Application Logic
//!
//! Orchestrates domain logic with port interfaces.
//!
//! Use cases:
//! - `PriceStreamClient`: live stream with reconnect ladder and polling fallback

pub mod price_stream_client;

pub use price_stream_client::{PriceStreamClient, PriceStreamConfig, PriceStreamHandle};
