//! Timing and naming constants for the appliance.
//!
//! The values mirror the reference deployment: an RC522 reader polled every
//! 100 ms, a buzzer that chirps once for a known card and three times for an
//! unknown one, and notifications routed under `rc522/card/...`.
//!
//! # Usage
//!
//! ```
//! use tagwatch_core::constants::*;
//! use std::time::Duration;
//!
//! let poll = Duration::from_millis(POLL_INTERVAL_MS);
//! assert_eq!(poll.as_millis(), 100);
//! assert_eq!(DEFAULT_TOPIC_PREFIX, "rc522");
//! ```

// ============================================================================
// Reader Polling
// ============================================================================

/// Delay between two reader polls while idle, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 100;

/// Shortest UID accepted from a reader, in bytes.
pub const MIN_UID_LENGTH: usize = 1;

/// Longest UID that decodes losslessly into a [`CardId`](crate::CardId).
///
/// ISO 14443 UIDs are 4, 7 or 10 bytes, all of which fit.
pub const MAX_UID_LENGTH: usize = 16;

// ============================================================================
// Buzzer Feedback
// ============================================================================

/// Number of buzzer pulses for an authorized card.
pub const AUTHORIZED_PULSES: u32 = 1;

/// Half-cycle duration of an authorized pulse, in milliseconds.
pub const AUTHORIZED_PULSE_MS: u64 = 500;

/// Number of buzzer pulses for an unauthorized card.
pub const UNAUTHORIZED_PULSES: u32 = 3;

/// Half-cycle duration of an unauthorized pulse, in milliseconds.
pub const UNAUTHORIZED_PULSE_MS: u64 = 100;

// ============================================================================
// Network
// ============================================================================

/// Interval between two "is connected" checks while joining the network.
pub const WIFI_POLL_INTERVAL_MS: u64 = 1000;

/// Default MQTT broker port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default topic prefix; notifications go to `<prefix>/card/<outcome>`.
pub const DEFAULT_TOPIC_PREFIX: &str = "rc522";

/// Topic segment between the prefix and the outcome suffix.
pub const TOPIC_CARD_SEGMENT: &str = "card";

/// Topic suffix for authorized scans.
pub const TOPIC_SUFFIX_AUTHORIZED: &str = "authorized";

/// Topic suffix for unauthorized scans.
pub const TOPIC_SUFFIX_UNAUTHORIZED: &str = "unauthorized";

/// Default timeout for each MQTT I/O step, in milliseconds.
pub const DEFAULT_MQTT_TIMEOUT_MS: u64 = 3000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_pattern_is_faster_and_longer() {
        assert!(UNAUTHORIZED_PULSES > AUTHORIZED_PULSES);
        assert!(UNAUTHORIZED_PULSE_MS < AUTHORIZED_PULSE_MS);
    }

    #[test]
    fn test_uid_bounds_cover_iso14443() {
        for len in [4, 7, 10] {
            assert!((MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&len));
        }
    }
}
