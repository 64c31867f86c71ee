//! Mock output line for testing and development.
//!
//! A [`MockLine`] keeps its level in memory and appends every transition to a
//! [`LineRecorder`]. Several lines can share one recorder, which gives tests a
//! single ordered history of the whole panel.

use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tracing::trace;

use crate::traits::OutputLine;

/// One recorded level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEvent {
    /// Name of the line that changed.
    pub line: String,

    /// New level.
    pub on: bool,

    /// When the change happened (tokio clock, so paused-time tests work).
    pub at: Instant,
}

/// Shared, ordered history of line transitions.
///
/// Cloning a recorder yields another handle to the same history.
#[derive(Debug, Clone, Default)]
pub struct LineRecorder {
    events: Arc<Mutex<Vec<LineEvent>>>,
}

impl LineRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: LineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    /// Snapshot of all recorded transitions.
    pub fn events(&self) -> Vec<LineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Transitions of one line only.
    pub fn events_for(&self, line: &str) -> Vec<LineEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.line == line)
            .collect()
    }

    /// Number of off-to-on edges recorded for `line`.
    pub fn rising_edges(&self, line: &str) -> usize {
        self.events_for(line).iter().filter(|e| e.on).count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

/// In-memory output line.
///
/// Only real level changes are recorded: driving a line that is already low
/// to low leaves no trace, just as it would produce no edge on a GPIO pin.
///
/// # Examples
///
/// ```
/// use tagwatch_hardware::mock::{LineRecorder, MockLine};
/// use tagwatch_hardware::traits::OutputLine;
///
/// let recorder = LineRecorder::new();
/// let mut led = MockLine::with_recorder("green", &recorder);
///
/// led.set(true);
/// led.set(false);
/// assert_eq!(recorder.rising_edges("green"), 1);
/// ```
#[derive(Debug)]
pub struct MockLine {
    name: String,
    on: bool,
    recorder: LineRecorder,
}

impl MockLine {
    /// Create a line with its own private recorder.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_recorder(name, &LineRecorder::new())
    }

    /// Create a line that reports into a shared recorder.
    pub fn with_recorder(name: impl Into<String>, recorder: &LineRecorder) -> Self {
        Self {
            name: name.into(),
            on: false,
            recorder: recorder.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorder this line reports into.
    pub fn recorder(&self) -> &LineRecorder {
        &self.recorder
    }
}

impl OutputLine for MockLine {
    fn set(&mut self, on: bool) {
        if self.on == on {
            return;
        }

        self.on = on;
        trace!(line = %self.name, on, "Line level changed");
        self.recorder.push(LineEvent {
            line: self.name.clone(),
            on,
            at: Instant::now(),
        });
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
