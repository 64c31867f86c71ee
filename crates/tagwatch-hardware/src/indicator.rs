//! Indicator driver: two LEDs and a buzzer.
//!
//! The panel owns its three output lines for the lifetime of the process.
//! Every outcome is rendered from a clean slate: [`IndicatorPanel::set`] first
//! drives every line low, so no LED can stay lit across scans.
//!
//! ```text
//!  red    ──┐
//!  green  ──┼── IndicatorPanel::{reset, set, clear, pulse}
//!  buzzer ──┘
//! ```

use std::time::Duration;
use tracing::{debug, trace};

use crate::traits::OutputLine;
use crate::types::LedColor;

/// Driver for the red/green indicator pair and the buzzer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tagwatch_hardware::indicator::IndicatorPanel;
/// use tagwatch_hardware::mock::{LineRecorder, MockLine};
/// use tagwatch_hardware::LedColor;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let recorder = LineRecorder::new();
/// let mut panel = IndicatorPanel::new(
///     MockLine::with_recorder("red", &recorder),
///     MockLine::with_recorder("green", &recorder),
///     MockLine::with_recorder("buzzer", &recorder),
/// );
///
/// panel.set(LedColor::Green);
/// panel.pulse(1, Duration::from_millis(500)).await;
/// panel.clear(LedColor::Green);
///
/// assert_eq!(recorder.rising_edges("buzzer"), 1);
/// assert_eq!(panel.lit(), LedColor::Off);
/// # }
/// ```
#[derive(Debug)]
pub struct IndicatorPanel<L: OutputLine> {
    red: L,
    green: L,
    buzzer: L,
}

impl<L: OutputLine> IndicatorPanel<L> {
    /// Take ownership of the three lines and drive them all low.
    pub fn new(red: L, green: L, buzzer: L) -> Self {
        let mut panel = Self { red, green, buzzer };
        panel.reset();
        panel
    }

    /// Drive every managed line low.
    pub fn reset(&mut self) {
        trace!("Resetting indicators");
        self.red.set(false);
        self.green.set(false);
        self.buzzer.set(false);
    }

    /// Light exactly one indicator, everything else off.
    ///
    /// `LedColor::Off` is equivalent to [`reset`](Self::reset).
    pub fn set(&mut self, color: LedColor) {
        self.reset();
        debug!(%color, "Indicator on");
        match color {
            LedColor::Red => self.red.set(true),
            LedColor::Green => self.green.set(true),
            LedColor::Off => {}
        }
    }

    /// Switch one indicator off, leaving the others untouched.
    pub fn clear(&mut self, color: LedColor) {
        debug!(%color, "Indicator off");
        match color {
            LedColor::Red => self.red.set(false),
            LedColor::Green => self.green.set(false),
            LedColor::Off => {}
        }
    }

    /// Pulse the buzzer `count` times.
    ///
    /// Each cycle is `period` on then `period` off, so the call blocks the
    /// task for `count * 2 * period`. It cannot be cancelled mid-pulse by the
    /// caller; `count == 0` performs no transitions at all.
    pub async fn pulse(&mut self, count: u32, period: Duration) {
        trace!(count, period_ms = period.as_millis() as u64, "Pulsing buzzer");
        for _ in 0..count {
            self.buzzer.set(true);
            tokio::time::sleep(period).await;
            self.buzzer.set(false);
            tokio::time::sleep(period).await;
        }
    }

    /// The indicator currently lit, if any.
    ///
    /// Reports `Red` if both were somehow driven high by a caller holding the
    /// raw lines; the panel itself never lights both.
    pub fn lit(&self) -> LedColor {
        if self.red.is_on() {
            LedColor::Red
        } else if self.green.is_on() {
            LedColor::Green
        } else {
            LedColor::Off
        }
    }

    pub fn buzzer_on(&self) -> bool {
        self.buzzer.is_on()
    }

    /// `true` when every managed line is low.
    pub fn is_dark(&self) -> bool {
        !self.red.is_on() && !self.green.is_on() && !self.buzzer.is_on()
    }

    /// Give the lines back, e.g. to inspect them in tests.
    pub fn into_lines(self) -> (L, L, L) {
        (self.red, self.green, self.buzzer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{LineRecorder, MockLine};
    use rstest::rstest;
    use tokio::time::Instant;

    /// Paused-clock sleeps land on millisecond ticks.
    fn assert_elapsed(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(10),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    fn panel() -> (IndicatorPanel<MockLine>, LineRecorder) {
        let recorder = LineRecorder::new();
        let panel = IndicatorPanel::new(
            MockLine::with_recorder("red", &recorder),
            MockLine::with_recorder("green", &recorder),
            MockLine::with_recorder("buzzer", &recorder),
        );
        (panel, recorder)
    }

    #[test]
    fn test_new_panel_is_dark() {
        let (panel, recorder) = panel();
        assert!(panel.is_dark());
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_set_lights_exactly_one() {
        let (mut panel, _recorder) = panel();

        panel.set(LedColor::Red);
        assert_eq!(panel.lit(), LedColor::Red);

        panel.set(LedColor::Green);
        assert_eq!(panel.lit(), LedColor::Green);
        let (red, green, _) = panel.into_lines();
        assert!(!red.is_on());
        assert!(green.is_on());
    }

    #[test]
    fn test_set_off_resets() {
        let (mut panel, _recorder) = panel();
        panel.set(LedColor::Green);
        panel.set(LedColor::Off);
        assert!(panel.is_dark());
    }

    #[test]
    fn test_clear_only_touches_one_line() {
        let (mut panel, _recorder) = panel();
        panel.set(LedColor::Red);
        panel.clear(LedColor::Green);
        assert_eq!(panel.lit(), LedColor::Red);
        panel.clear(LedColor::Red);
        assert!(panel.is_dark());
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(3)]
    #[case(7)]
    #[tokio::test(start_paused = true)]
    async fn test_pulse_count(#[case] count: u32) {
        let (mut panel, recorder) = panel();
        panel.set(LedColor::Green);
        recorder.clear();

        panel.pulse(count, Duration::from_millis(100)).await;

        assert_eq!(recorder.rising_edges("buzzer"), count as usize);
        assert_eq!(recorder.events_for("buzzer").len(), 2 * count as usize);
        assert!(recorder.events_for("red").is_empty());
        assert!(recorder.events_for("green").is_empty());
        assert!(!panel.buzzer_on());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_zero_is_instant() {
        let (mut panel, recorder) = panel();
        let start = Instant::now();
        panel.pulse(0, Duration::from_secs(5)).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(recorder.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_timing() {
        let (mut panel, recorder) = panel();
        let start = Instant::now();

        panel.pulse(3, Duration::from_millis(100)).await;

        assert_elapsed(start.elapsed(), Duration::from_millis(600));
        let buzzer = recorder.events_for("buzzer");
        for pair in buzzer.windows(2) {
            assert_elapsed(pair[1].at - pair[0].at, Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_render_leaves_panel_dark() {
        let (mut panel, recorder) = panel();

        panel.set(LedColor::Red);
        panel.pulse(3, Duration::from_millis(100)).await;
        panel.clear(LedColor::Red);

        assert!(panel.is_dark());
        assert!(recorder.events_for("green").is_empty());
        // Red stays lit for the whole buzzer sequence
        let red = recorder.events_for("red");
        assert_eq!(red.len(), 2);
        assert_elapsed(red[1].at - red[0].at, Duration::from_millis(600));
    }
}
