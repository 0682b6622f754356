//! Infrastructure layer for cross-cutting concerns.
//!
//! Error families and result aliases, and the TOML configuration layer.

pub mod config;
pub mod error;
