//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the price client requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `StreamConnector` / `StreamSession`: live bidirectional price stream
//! - `PriceSource`: request/response lookup for the polling fallback

pub mod price_source;
pub mod price_stream;

pub use price_source::PriceSource;
pub use price_stream::{StreamConnector, StreamSession};
