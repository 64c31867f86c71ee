//! Mock RFID reader implementation for testing and development.
//!
//! The reader is fed through a [`MockReaderHandle`]: each presented tag is
//! reported by exactly one successful `poll()` + `read_uid()` pair, after which
//! the field is empty again.

use tokio::sync::mpsc;
use tracing::debug;

use crate::{HardwareError, Result, traits::TagReader};

/// Internal event type for the mock reader.
#[derive(Debug, Clone)]
enum ReaderEvent {
    TagPresented(Vec<u8>),
    ReadFailure,
}

/// Mock RFID reader.
///
/// # Examples
///
/// ```
/// use tagwatch_hardware::mock::MockReader;
/// use tagwatch_hardware::traits::TagReader;
///
/// #[tokio::main]
/// async fn main() -> tagwatch_hardware::Result<()> {
///     let (mut reader, handle) = MockReader::new();
///
///     handle.present_uid(vec![0x2C, 0x28, 0xC6, 0x3D])?;
///
///     assert!(reader.poll().await?);
///     assert_eq!(reader.read_uid().await?, vec![0x2C, 0x28, 0xC6, 0x3D]);
///     assert!(!reader.poll().await?);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    /// Channel receiver for tag events
    event_rx: mpsc::UnboundedReceiver<ReaderEvent>,

    /// Event in the field, waiting for `read_uid()`
    pending: Option<ReaderEvent>,

    /// Number of `init()` calls, for tests
    init_count: usize,
}

impl MockReader {
    /// Create a new mock reader and the handle used to present tags.
    pub fn new() -> (Self, MockReaderHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let reader = Self {
            event_rx,
            pending: None,
            init_count: 0,
        };

        (reader, MockReaderHandle { event_tx })
    }

    /// How many times the reader was re-initialised.
    pub fn init_count(&self) -> usize {
        self.init_count
    }
}

impl TagReader for MockReader {
    async fn init(&mut self) -> Result<()> {
        self.init_count += 1;
        Ok(())
    }

    async fn poll(&mut self) -> Result<bool> {
        if self.pending.is_none() {
            match self.event_rx.try_recv() {
                Ok(event) => self.pending = Some(event),
                Err(mpsc::error::TryRecvError::Empty) => {}
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    return Err(HardwareError::disconnected("mock reader handle dropped"));
                }
            }
        }

        Ok(self.pending.is_some())
    }

    async fn read_uid(&mut self) -> Result<Vec<u8>> {
        match self.pending.take() {
            Some(ReaderEvent::TagPresented(uid)) => {
                debug!(uid_len = uid.len(), "Mock reader returned UID");
                Ok(uid)
            }
            Some(ReaderEvent::ReadFailure) => {
                Err(HardwareError::card_read("simulated select failure"))
            }
            None => Err(HardwareError::NoTag),
        }
    }
}

/// Handle for driving a [`MockReader`].
///
/// Cloning the handle gives another sender into the same reader.
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    event_tx: mpsc::UnboundedSender<ReaderEvent>,
}

impl MockReaderHandle {
    /// Present a tag with the given raw UID.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub fn present_uid(&self, uid: Vec<u8>) -> Result<()> {
        self.send(ReaderEvent::TagPresented(uid))
    }

    /// Present a tag whose UID read will fail once.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub fn present_unreadable(&self) -> Result<()> {
        self.send(ReaderEvent::ReadFailure)
    }

    fn send(&self, event: ReaderEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|_| HardwareError::disconnected("mock reader dropped"))
    }
}
