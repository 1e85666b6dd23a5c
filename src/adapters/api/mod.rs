//! Price REST API Adapter
//!
//! Implements the HTTP side of the price client: the polling
//! fallback that replaces the stream once reconnects are exhausted.
//!
//! Sub-modules:
//! - `client`: reqwest-based `/price/{symbol}` lookup

pub mod client;

pub use client::{PollingClient, PollingClientConfig};
