//! NarraMix Common Utilities
//!
//! Shared infrastructure for all NarraMix crates:
//! - Error types and result aliases (the fatal channel)
//! - Diagnostics trail for degraded-continue failures
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;

pub use config::*;
pub use diagnostics::*;
pub use error::*;
