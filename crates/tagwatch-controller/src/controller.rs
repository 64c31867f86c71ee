//! The scan control loop.
//!
//! One iteration of the loop:
//!
//! ```text
//! init reader ─> poll ─┬─ no tag / error ───────────────────────────┐
//!                      └─ tag ─> read UID ─┬─ error ────────────────┤
//!                                          └─ CardId ─> handle_card │
//!                                                                   v
//!                                                      sleep poll interval
//! ```
//!
//! `handle_card` always renders physical feedback first (indicator, buzzer)
//! and only then attempts the notification. The notification result is
//! recorded in the [`ScanReport`] but never influences the feedback or the
//! return to [`ScanState::IdlePolling`].

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use tagwatch_core::constants::{DEFAULT_TOPIC_PREFIX, POLL_INTERVAL_MS};
use tagwatch_core::{CardId, CardRegistry, NotificationEvent, Outcome};
use tagwatch_hardware::{IndicatorPanel, LedColor, OutputLine, TagReader};
use tagwatch_network::{Notifier, PublishOutcome};

use crate::state::ScanState;

/// Tunables for the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Topic prefix; notifications go to `<prefix>/card/<outcome>`.
    pub topic_prefix: String,

    /// Delay after every poll.
    pub poll_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }
}

/// Everything that happened while handling one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub outcome: Outcome,
    pub event: NotificationEvent,
    pub publish: PublishOutcome,
    pub scanned_at: DateTime<Utc>,
}

/// Indicator lit for an outcome.
pub fn indicator_for(outcome: &Outcome) -> LedColor {
    if outcome.is_authorized() {
        LedColor::Green
    } else {
        LedColor::Red
    }
}

/// Reader-to-broker control loop.
///
/// Owns every hardware handle it drives; nothing is shared or global.
///
/// # Examples
///
/// ```
/// use tagwatch_controller::{ControlLoop, ControllerConfig};
/// use tagwatch_core::{CardRegistry, NotificationEvent};
/// use tagwatch_hardware::IndicatorPanel;
/// use tagwatch_hardware::mock::{MockLine, MockReader};
/// use tagwatch_network::{Notifier, PublishOutcome};
///
/// struct Discard;
///
/// impl Notifier for Discard {
///     async fn notify(&mut self, _event: &NotificationEvent) -> PublishOutcome {
///         PublishOutcome::Delivered
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let (reader, handle) = MockReader::new();
/// let panel = IndicatorPanel::new(MockLine::new("red"), MockLine::new("green"), MockLine::new("buzzer"));
/// let mut control = ControlLoop::new(
///     reader,
///     panel,
///     CardRegistry::reference(),
///     Discard,
///     ControllerConfig::default(),
/// );
///
/// handle.present_uid(vec![0x2C, 0x28, 0xC6, 0x3D]).unwrap();
/// let report = control.poll_once().await.unwrap();
/// assert!(report.outcome.is_authorized());
/// # }
/// ```
pub struct ControlLoop<R, L, N>
where
    R: TagReader,
    L: OutputLine,
    N: Notifier,
{
    reader: R,
    panel: IndicatorPanel<L>,
    registry: CardRegistry,
    notifier: N,
    config: ControllerConfig,
    state: ScanState,
    scans: u64,
}

impl<R, L, N> ControlLoop<R, L, N>
where
    R: TagReader,
    L: OutputLine,
    N: Notifier,
{
    pub fn new(
        reader: R,
        panel: IndicatorPanel<L>,
        registry: CardRegistry,
        notifier: N,
        config: ControllerConfig,
    ) -> Self {
        Self {
            reader,
            panel,
            registry,
            notifier,
            config,
            state: ScanState::IdlePolling,
            scans: 0,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Number of scans handled so far.
    pub fn scans(&self) -> u64 {
        self.scans
    }

    pub fn panel(&self) -> &IndicatorPanel<L> {
        &self.panel
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Poll forever. Only returns if the task is cancelled.
    pub async fn run(&mut self) {
        info!(
            cards = self.registry.len(),
            prefix = %self.config.topic_prefix,
            "Control loop started"
        );
        loop {
            self.poll_once().await;
        }
    }

    /// One loop iteration, including the trailing poll delay.
    ///
    /// Returns the report of the scan handled in this iteration, if any.
    pub async fn poll_once(&mut self) -> Option<ScanReport> {
        let report = match self.read_card().await {
            Some(id) => Some(self.handle_card(id).await),
            None => None,
        };
        tokio::time::sleep(self.config.poll_interval).await;
        report
    }

    /// Classify `id`, render feedback, then publish.
    pub async fn handle_card(&mut self, id: CardId) -> ScanReport {
        self.transition_to(ScanState::HandlingScan);
        let scanned_at = Utc::now();

        let outcome = self.registry.classify(id);
        info!("{}", outcome);

        let color = indicator_for(&outcome);
        let pattern = outcome.feedback();
        self.panel.set(color);
        self.panel.pulse(pattern.pulses, pattern.period).await;
        self.panel.clear(color);

        let event = outcome.notification(&self.config.topic_prefix);
        let publish = self.notifier.notify(&event).await;
        if let PublishOutcome::Failed(failure) = &publish {
            debug!(card = %id, %failure, "Notification not delivered");
        }

        self.scans += 1;
        self.transition_to(ScanState::IdlePolling);

        ScanReport {
            outcome,
            event,
            publish,
            scanned_at,
        }
    }

    /// Poll the reader and decode a UID. Every failure is a transient miss.
    async fn read_card(&mut self) -> Option<CardId> {
        if let Err(e) = self.reader.init().await {
            warn!("Reader init failed: {}", e);
            return None;
        }

        match self.reader.poll().await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                trace!("Poll failed: {}", e);
                return None;
            }
        }

        let uid = match self.reader.read_uid().await {
            Ok(uid) => uid,
            Err(e) => {
                debug!("Tag present but read failed: {}", e);
                return None;
            }
        };

        match CardId::from_le_bytes(&uid) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Discarding tag: {}", e);
                None
            }
        }
    }

    fn transition_to(&mut self, next: ScanState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        trace!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }
}
