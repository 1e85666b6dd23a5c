//! Domain layer - Price feed model and retry policy.
//!
//! Pure types with no transport dependencies (hexagonal architecture
//! inner ring). Everything here is testable without a runtime.

pub mod backoff;
pub mod error;
pub mod price;

// Re-export core types for convenience
pub use backoff::LinearBackoff;
pub use error::FeedError;
pub use price::{
    ConnectionState, InboundMessage, PriceUpdate, SubscriptionRequest, normalize_symbol,
};
