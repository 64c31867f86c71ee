//! Hardware device trait definitions.
//!
//! These traits are the contract between the control loop and the physical
//! peripherals: an RFID transceiver that can be polled for a tag and asked for
//! its UID, and binary output lines driving LEDs and a buzzer.
//!
//! The reader trait uses native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT), eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::Result;

/// RFID transceiver abstraction.
///
/// Mirrors the two-step interaction of an MFRC522-class reader: a REQA/WUPA
/// style presence poll followed by anticollision/select to obtain the UID.
///
/// # Object Safety
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters:
///
/// ```no_run
/// use tagwatch_hardware::traits::TagReader;
/// use tagwatch_hardware::error::Result;
///
/// async fn scan<R: TagReader>(reader: &mut R) -> Result<Option<Vec<u8>>> {
///     reader.init().await?;
///     if reader.poll().await? {
///         return Ok(Some(reader.read_uid().await?));
///     }
///     Ok(None)
/// }
/// ```
pub trait TagReader: Send {
    /// Re-initialise the transceiver before a poll.
    ///
    /// The default implementation does nothing.
    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Check whether a tag is in the field.
    ///
    /// # Errors
    ///
    /// Any error means "try again next cycle".
    async fn poll(&mut self) -> Result<bool>;

    /// Read the UID of the tag currently in the field.
    ///
    /// # Errors
    ///
    /// Returns an error if no tag is present or the read did not complete.
    async fn read_uid(&mut self) -> Result<Vec<u8>>;
}

/// Binary digital output line (LED or buzzer).
///
/// Writes are infallible at this layer.
pub trait OutputLine: Send {
    /// Drive the line high (`true`) or low (`false`).
    fn set(&mut self, on: bool);

    /// Current level of the line.
    fn is_on(&self) -> bool;
}
