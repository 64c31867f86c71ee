//! Network layer for tagwatch
//!
//! This crate brings the appliance online and carries its notifications to
//! the broker.
//!
//! # Components
//!
//! - **NetworkSession**: joins the wireless network once at startup
//! - **MqttCodec**: MQTT 3.1.1 framing for Tokio `Framed` streams
//! - **MqttClient**: connect / publish (QoS 0) / disconnect
//! - **MqttPublisher**: one session per notification, failures as values
//!
//! # Example
//!
//! ```no_run
//! use tagwatch_core::NotificationEvent;
//! use tagwatch_network::{MqttClientConfig, MqttPublisher, Notifier};
//!
//! # async fn example() {
//! let mut publisher = MqttPublisher::new(MqttClientConfig::new("broker.local", 1883, "door-1"));
//!
//! let event = NotificationEvent::new("rc522/card/authorized", "Authorized card Wies scanned");
//! let outcome = publisher.notify(&event).await;
//! if let Some(failure) = outcome.failure() {
//!     eprintln!("not delivered: {failure}");
//! }
//! # }
//! ```

mod client;
mod codec;
mod error;
mod packet;
mod publisher;
mod wifi;

pub use client::{MqttClient, MqttClientConfig};
pub use codec::MqttCodec;
pub use error::{MqttError, NetworkError};
pub use packet::{ConnAck, Connect, ConnectReturnCode, Packet, Publish};
pub use publisher::{MqttPublisher, NOT_AUTHORIZED_HINT, Notifier, PublishOutcome, TransportFailure};
pub use wifi::{HostLink, InterfaceConfig, MockLink, NetworkSession, WirelessLink};
