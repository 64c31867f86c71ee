//! Control loop states.
//!
//! # States
//!
//! - `IdlePolling`: waiting for a tag (initial state)
//! - `HandlingScan`: a UID was read; classification, feedback and
//!   notification are in progress
//!
//! # Valid Transitions
//!
//! - IdlePolling → HandlingScan (tag present and UID read)
//! - HandlingScan → IdlePolling (unconditional, after the notification attempt)

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// Polling the reader for a tag.
    #[default]
    IdlePolling,

    /// Rendering and reporting one scan.
    HandlingScan,
}

impl ScanState {
    /// Check whether the state machine may move from `self` to `next`.
    pub fn can_transition_to(&self, next: ScanState) -> bool {
        matches!(
            (self, next),
            (ScanState::IdlePolling, ScanState::HandlingScan)
                | (ScanState::HandlingScan, ScanState::IdlePolling)
        )
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            ScanState::IdlePolling => "IdlePolling",
            ScanState::HandlingScan => "HandlingScan",
        };
        f.write_str(state_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_initial_state() {
        assert_eq!(ScanState::default(), ScanState::IdlePolling);
    }

    #[rstest]
    #[case(ScanState::IdlePolling, ScanState::HandlingScan, true)]
    #[case(ScanState::HandlingScan, ScanState::IdlePolling, true)]
    #[case(ScanState::IdlePolling, ScanState::IdlePolling, false)]
    #[case(ScanState::HandlingScan, ScanState::HandlingScan, false)]
    fn test_transitions(#[case] from: ScanState, #[case] to: ScanState, #[case] valid: bool) {
        assert_eq!(from.can_transition_to(to), valid);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&ScanState::HandlingScan).unwrap();
        assert_eq!(json, "\"handling_scan\"");
    }

    #[test]
    fn test_display() {
        assert_eq!(ScanState::IdlePolling.to_string(), "IdlePolling");
    }
}
