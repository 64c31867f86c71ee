//! Core domain types for the tagwatch access appliance.
//!
//! Holds the pieces every other crate agrees on: decoded card identifiers,
//! the immutable card registry, classification outcomes, buzzer feedback
//! patterns and the notification events derived from them.

pub mod constants;
pub mod error;
pub mod registry;
pub mod types;

pub use error::{Error, Result};
pub use registry::CardRegistry;
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
