//! Shared types for skipmark services
//!
//! Provides the common error type, configuration resolution, and the
//! event bus used for SSE broadcasting.

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
