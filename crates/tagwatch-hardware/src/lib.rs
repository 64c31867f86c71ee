//! Hardware device abstraction layer for the tagwatch access appliance.
//!
//! This crate provides trait-based abstractions for the appliance's
//! peripherals: an RFID transceiver, two indicator LEDs and a buzzer. The
//! traits allow easy substitution between mock implementations (for
//! development and testing) and real drivers.
//!
//! # Design Philosophy
//!
//! - **Async-first**: reader I/O and buzzer timing use native `async fn`
//!   (Rust 1.90 + Edition 2024 RPITIT) and `tokio::time`.
//! - **Owned handles**: every line and reader is an owned value constructed
//!   once at startup and moved into whatever drives it. No globals.
//! - **Error-aware**: reader operations return [`Result<T>`][error::Result];
//!   GPIO writes are infallible at this layer.
//!
//! # Reading a Tag
//!
//! ```no_run
//! use tagwatch_hardware::traits::TagReader;
//! use tagwatch_hardware::error::Result;
//!
//! async fn next_uid<R: TagReader>(reader: &mut R) -> Result<Option<Vec<u8>>> {
//!     if !reader.poll().await? {
//!         return Ok(None);
//!     }
//!     reader.read_uid().await.map(Some)
//! }
//! ```
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides a channel-driven [`MockReader`](mock::MockReader)
//! and in-memory [`MockLine`](mock::MockLine)s with a shared transition
//! recorder, so timing and ordering can be asserted under tokio's paused clock.

pub mod error;
pub mod indicator;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use indicator::IndicatorPanel;
pub use traits::{OutputLine, TagReader};
pub use types::LedColor;
