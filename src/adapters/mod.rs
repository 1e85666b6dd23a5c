//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP client, WebSocket, terminal output).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `api`: REST polling client for the fallback path
//! - `display`: terminal rendering of prices and connection status
//! - `feeds`: WebSocket streaming transport
//! - `metrics`: Prometheus metrics export and health checks

pub mod api;
pub mod display;
pub mod feeds;
pub mod metrics;
