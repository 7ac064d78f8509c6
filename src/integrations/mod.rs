//! External Integrations Module
//!
//! Provides the WebSocket relay for browser dashboards.

pub mod streaming;

// Re-export main types for convenience
pub use streaming::{MetricRelay, StreamMessage, StreamingConfig, StreamingError};
