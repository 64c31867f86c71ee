//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be driven programmatically
//! without an RC522 transceiver or GPIO header attached.

pub mod line;
pub mod reader;

// Re-export commonly used types
pub use line::{LineEvent, LineRecorder, MockLine};
pub use reader::{MockReader, MockReaderHandle};
