//! Adapter layer modules for external system integration.
//!
//! Provides the HTTP transport used to reach RFC 3161 timestamp authorities.

pub mod timestamp_http_client;

pub use timestamp_http_client::{HttpTimestampTransport, TimestampTransport};
