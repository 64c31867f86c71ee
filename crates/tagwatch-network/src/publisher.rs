//! Notification publisher.
//!
//! Each notification gets its own broker session: connect, publish one
//! message, disconnect. Transport failures are logged and returned as a
//! value ([`PublishOutcome::Failed`]); the signature has no error channel, so
//! a broker problem can never propagate into the caller's control flow.
//!
//! ```text
//! ControlLoop ──NotificationEvent──> MqttPublisher
//!                                       │  connect ─ publish ─ disconnect
//!                                       └──> PublishOutcome
//! ```

#![allow(async_fn_in_trait)]

use std::fmt;
use tracing::{error, info};

use tagwatch_core::NotificationEvent;

use crate::client::{MqttClient, MqttClientConfig};
use crate::error::MqttError;
use crate::packet::ConnectReturnCode;

/// Log line emitted when the broker rejects the client's rights.
pub const NOT_AUTHORIZED_HINT: &str =
    "Connection refused: not authorized. Please check your MQTT credentials.";

/// Why a notification could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// Broker reason code, when the broker gave one.
    pub reason_code: Option<u8>,

    /// Human-readable description.
    pub description: String,
}

impl TransportFailure {
    pub fn new(reason_code: Option<u8>, description: impl Into<String>) -> Self {
        Self {
            reason_code,
            description: description.into(),
        }
    }

    /// `true` for CONNACK return code 5.
    pub fn is_not_authorized(&self) -> bool {
        self.reason_code == Some(ConnectReturnCode::NotAuthorized.as_u8())
    }
}

impl From<&MqttError> for TransportFailure {
    fn from(error: &MqttError) -> Self {
        Self::new(error.reason_code(), error.to_string())
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason_code {
            Some(code) => write!(f, "{} (reason code {})", self.description, code),
            None => f.write_str(&self.description),
        }
    }
}

/// Result of one publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered,
    Failed(TransportFailure),
}

impl PublishOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    pub fn failure(&self) -> Option<&TransportFailure> {
        match self {
            Self::Delivered => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// Something that can deliver notification events.
///
/// Implementations must not panic or block indefinitely; every failure is
/// reported through the returned [`PublishOutcome`].
pub trait Notifier {
    async fn notify(&mut self, event: &NotificationEvent) -> PublishOutcome;
}

/// MQTT-backed notifier with one session per event.
#[derive(Debug, Clone)]
pub struct MqttPublisher {
    config: MqttClientConfig,
}

impl MqttPublisher {
    pub fn new(config: MqttClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MqttClientConfig {
        &self.config
    }

    /// Publish `message` to `topic` over a fresh session.
    ///
    /// Never fails: transport errors are logged and returned as
    /// [`PublishOutcome::Failed`].
    pub async fn publish(&self, topic: &str, message: &str) -> PublishOutcome {
        match self.try_publish(topic, message).await {
            Ok(()) => {
                info!("MQTT message sent successfully");
                PublishOutcome::Delivered
            }
            Err(e) => PublishOutcome::Failed(report("Failed to send MQTT message", &e)),
        }
    }

    /// Connect and disconnect without publishing anything.
    ///
    /// Used by the connectivity smoke test.
    ///
    /// # Errors
    ///
    /// Returns the logged [`TransportFailure`] if the session could not be
    /// opened or closed cleanly.
    pub async fn check_connection(&self) -> Result<(), TransportFailure> {
        let mut client = MqttClient::new(self.config.clone());
        self.log_connecting();

        let result = match client.connect().await {
            Ok(()) => client.disconnect().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("MQTT connection successful");
                Ok(())
            }
            Err(e) => Err(report("Failed to connect to MQTT server", &e)),
        }
    }

    async fn try_publish(&self, topic: &str, message: &str) -> Result<(), MqttError> {
        let mut client = MqttClient::new(self.config.clone());
        self.log_connecting();
        client.connect().await?;

        info!("Publishing message to topic {}", topic);
        client.publish(topic, message.to_string()).await?;
        client.disconnect().await
    }

    fn log_connecting(&self) {
        info!(
            "Connecting to MQTT server {} with client ID {}",
            self.config.endpoint(),
            self.config.client_id
        );
    }
}

impl Notifier for MqttPublisher {
    async fn notify(&mut self, event: &NotificationEvent) -> PublishOutcome {
        self.publish(&event.topic, &event.body).await
    }
}

fn report(context: &str, error: &MqttError) -> TransportFailure {
    error!("{}: {}", context, error);
    if error.is_not_authorized() {
        error!("{}", NOT_AUTHORIZED_HINT);
    }
    TransportFailure::from(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_from_refusal() {
        let error = MqttError::ConnectionRefused(ConnectReturnCode::NotAuthorized);
        let failure = TransportFailure::from(&error);
        assert_eq!(failure.reason_code, Some(5));
        assert!(failure.is_not_authorized());
        assert_eq!(
            failure.to_string(),
            "Connection refused: not authorized (5) (reason code 5)"
        );
    }

    #[test]
    fn test_failure_without_code() {
        let failure = TransportFailure::from(&MqttError::ConnectionTimeout(100));
        assert_eq!(failure.reason_code, None);
        assert!(!failure.is_not_authorized());
        assert_eq!(failure.to_string(), "Connection timeout after 100ms");
    }

    #[test]
    fn test_outcome_accessors() {
        assert!(PublishOutcome::Delivered.is_delivered());
        assert!(PublishOutcome::Delivered.failure().is_none());

        let failed = PublishOutcome::Failed(TransportFailure::new(Some(4), "bad creds"));
        assert!(!failed.is_delivered());
        assert_eq!(failed.failure().and_then(|f| f.reason_code), Some(4));
    }
}
