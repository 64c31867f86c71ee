use crate::{
    Result,
    constants::{
        AUTHORIZED_PULSE_MS, AUTHORIZED_PULSES, MAX_UID_LENGTH, MIN_UID_LENGTH,
        TOPIC_CARD_SEGMENT, TOPIC_SUFFIX_AUTHORIZED, TOPIC_SUFFIX_UNAUTHORIZED,
        UNAUTHORIZED_PULSE_MS, UNAUTHORIZED_PULSES,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Numeric card identifier decoded from a tag UID.
///
/// The UID bytes are read as an unsigned little-endian integer: the RC522
/// serial `2C 28 C6 3D` is card `1036396588`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(u128);

impl CardId {
    /// Wrap a raw numeric identifier.
    #[must_use]
    pub const fn new(id: u128) -> Self {
        CardId(id)
    }

    /// Decode a UID as an unsigned little-endian integer.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if the UID is empty or longer than
    /// [`MAX_UID_LENGTH`] bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwatch_core::CardId;
    ///
    /// let id = CardId::from_le_bytes(&[0x2C, 0x28, 0xC6, 0x3D]).unwrap();
    /// assert_eq!(id.as_u128(), 1036396588);
    /// ```
    pub fn from_le_bytes(uid: &[u8]) -> Result<Self> {
        let len = uid.len();
        if !(MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&len) {
            return Err(Error::InvalidUid(format!(
                "UID must be {MIN_UID_LENGTH}-{MAX_UID_LENGTH} bytes, got {len}"
            )));
        }

        let mut buf = [0u8; 16];
        buf[..len].copy_from_slice(uid);
        Ok(CardId(u128::from_le_bytes(buf)))
    }

    /// Get the raw identifier.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        self.0
    }
}

impl From<u32> for CardId {
    fn from(id: u32) -> Self {
        CardId(u128::from(id))
    }
}

impl From<u64> for CardId {
    fn from(id: u64) -> Self {
        CardId(u128::from(id))
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: u128 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidCardEntry(format!("Invalid card identifier: {s}")))?;
        Ok(CardId(id))
    }
}

/// Buzzer pulse pattern rendered for a scan outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackPattern {
    /// Number of on/off cycles.
    pub pulses: u32,

    /// Duration of each half-cycle.
    pub period: Duration,
}

impl FeedbackPattern {
    /// Pattern for a recognised card: one long chirp.
    pub const AUTHORIZED: Self = Self {
        pulses: AUTHORIZED_PULSES,
        period: Duration::from_millis(AUTHORIZED_PULSE_MS),
    };

    /// Pattern for an unknown card: three short chirps.
    pub const UNAUTHORIZED: Self = Self {
        pulses: UNAUTHORIZED_PULSES,
        period: Duration::from_millis(UNAUTHORIZED_PULSE_MS),
    };

    /// Total time the pattern keeps the buzzer busy.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.period * 2 * self.pulses
    }
}

/// Result of classifying one scan against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The card is registered under `name`.
    Authorized { id: CardId, name: String },

    /// The card is not registered.
    Unauthorized { id: CardId },
}

impl Outcome {
    /// Identifier that produced this outcome.
    #[must_use]
    pub fn card_id(&self) -> CardId {
        match self {
            Outcome::Authorized { id, .. } | Outcome::Unauthorized { id } => *id,
        }
    }

    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Outcome::Authorized { .. })
    }

    /// Buzzer pattern for this outcome.
    #[must_use]
    pub fn feedback(&self) -> FeedbackPattern {
        match self {
            Outcome::Authorized { .. } => FeedbackPattern::AUTHORIZED,
            Outcome::Unauthorized { .. } => FeedbackPattern::UNAUTHORIZED,
        }
    }

    /// Last topic segment for this outcome.
    #[must_use]
    pub fn topic_suffix(&self) -> &'static str {
        match self {
            Outcome::Authorized { .. } => TOPIC_SUFFIX_AUTHORIZED,
            Outcome::Unauthorized { .. } => TOPIC_SUFFIX_UNAUTHORIZED,
        }
    }

    /// Human-readable notification body.
    ///
    /// Authorized cards are named by their registry name, unknown cards by
    /// their raw identifier.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Outcome::Authorized { name, .. } => format!("Authorized card {name} scanned"),
            Outcome::Unauthorized { id } => format!("Unauthorized card {id} scanned"),
        }
    }

    /// Build the notification event published for this outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwatch_core::{CardId, Outcome};
    ///
    /// let outcome = Outcome::Unauthorized { id: CardId::new(999999999) };
    /// let event = outcome.notification("rc522");
    /// assert_eq!(event.topic, "rc522/card/unauthorized");
    /// assert!(event.body.contains("999999999"));
    /// ```
    #[must_use]
    pub fn notification(&self, topic_prefix: &str) -> NotificationEvent {
        NotificationEvent {
            topic: format!(
                "{}/{TOPIC_CARD_SEGMENT}/{}",
                topic_prefix.trim_end_matches('/'),
                self.topic_suffix()
            ),
            body: self.message(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Authorized { id, name } => {
                write!(f, "Card ID: {id} (Name: {name}) PASS: Green Light Activated")
            }
            Outcome::Unauthorized { id } => {
                write!(f, "Card ID: {id} UNKNOWN CARD! Red Light Activated")
            }
        }
    }
}

/// A message to hand to the publisher exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub topic: String,
    pub body: String,
}

impl NotificationEvent {
    pub fn new(topic: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[0x2C, 0x28, 0xC6, 0x3D], 1036396588)]
    #[case(&[0x94, 0x92, 0x10, 0x22], 571511444)]
    #[case(&[0xFF, 0xC9, 0x9A, 0x3B], 999999999)]
    #[case(&[0x01], 1)]
    #[case(&[0x00, 0x01], 256)]
    fn test_card_id_from_le_bytes(#[case] uid: &[u8], #[case] expected: u128) {
        assert_eq!(CardId::from_le_bytes(uid).unwrap().as_u128(), expected);
    }

    #[test]
    fn test_card_id_ten_byte_uid() {
        let uid = [0xFF; 10];
        let id = CardId::from_le_bytes(&uid).unwrap();
        assert_eq!(id.as_u128(), (1u128 << 80) - 1);
    }

    #[rstest]
    #[case(0)]
    #[case(17)]
    fn test_card_id_invalid_length(#[case] len: usize) {
        let uid = vec![0xAB; len];
        assert!(matches!(
            CardId::from_le_bytes(&uid),
            Err(Error::InvalidUid(_))
        ));
    }

    #[rstest]
    #[case("1036396588", 1036396588)]
    #[case(" 42 ", 42)]
    fn test_card_id_from_str(#[case] input: &str, #[case] expected: u128) {
        let id: CardId = input.parse().unwrap();
        assert_eq!(id.as_u128(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("-1")]
    #[case("0x3D")]
    fn test_card_id_from_str_invalid(#[case] input: &str) {
        assert!(input.parse::<CardId>().is_err());
    }

    #[test]
    fn test_feedback_patterns() {
        assert_eq!(FeedbackPattern::AUTHORIZED.pulses, 1);
        assert_eq!(
            FeedbackPattern::AUTHORIZED.period,
            Duration::from_millis(500)
        );
        assert_eq!(FeedbackPattern::AUTHORIZED.duration(), Duration::from_secs(1));

        assert_eq!(FeedbackPattern::UNAUTHORIZED.pulses, 3);
        assert_eq!(
            FeedbackPattern::UNAUTHORIZED.duration(),
            Duration::from_millis(600)
        );
    }

    #[test]
    fn test_authorized_notification() {
        let outcome = Outcome::Authorized {
            id: CardId::new(1036396588),
            name: "Wies".to_string(),
        };

        let event = outcome.notification("rc522");
        assert_eq!(event.topic, "rc522/card/authorized");
        assert_eq!(event.body, "Authorized card Wies scanned");
        assert_eq!(outcome.feedback(), FeedbackPattern::AUTHORIZED);
    }

    #[test]
    fn test_unauthorized_notification() {
        let outcome = Outcome::Unauthorized {
            id: CardId::new(999999999),
        };

        let event = outcome.notification("site/door1/");
        assert_eq!(event.topic, "site/door1/card/unauthorized");
        assert_eq!(event.body, "Unauthorized card 999999999 scanned");
        assert_eq!(outcome.feedback(), FeedbackPattern::UNAUTHORIZED);
    }

    #[test]
    fn test_outcome_display() {
        let granted = Outcome::Authorized {
            id: CardId::new(571511444),
            name: "Tim".to_string(),
        };
        assert_eq!(
            granted.to_string(),
            "Card ID: 571511444 (Name: Tim) PASS: Green Light Activated"
        );

        let denied = Outcome::Unauthorized { id: CardId::new(7) };
        assert_eq!(
            denied.to_string(),
            "Card ID: 7 UNKNOWN CARD! Red Light Activated"
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = Outcome::Authorized {
            id: CardId::new(1),
            name: "A".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"outcome\":\"authorized\""));
        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
