//! MQTT client for broker communication.
//!
//! A deliberately small client: connect (CONNECT/CONNACK), publish at QoS 0,
//! disconnect. It speaks through [`MqttCodec`] on a Tokio `Framed` stream.
//!
//! # Example Usage
//!
//! ```no_run
//! use tagwatch_network::{MqttClient, MqttClientConfig};
//!
//! # async fn example() -> Result<(), tagwatch_network::MqttError> {
//! let config = MqttClientConfig::new("broker.local", 1883, "door-1")
//!     .with_credentials("door", "secret");
//!
//! let mut client = MqttClient::new(config);
//! client.connect().await?;
//! client.publish("rc522/card/authorized", "Authorized card Wies scanned").await?;
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Design Principles
//!
//! - **No automatic retry**: caller decides retry strategy
//! - **No session reuse**: one connection per notification
//! - **No keepalive**: keep-alive is 0, sessions are short-lived
//! - **Simple error handling**: clear errors, no recovery
//!
//! # Timeout Handling
//!
//! Connect, CONNACK wait and every send are bounded by the configured timeout
//! (default: 3000ms). Timeout errors are returned to the caller.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, trace, warn};

use tagwatch_core::constants::{DEFAULT_MQTT_PORT, DEFAULT_MQTT_TIMEOUT_MS};

use crate::codec::MqttCodec;
use crate::error::MqttError;
use crate::packet::{Connect, ConnectReturnCode, Packet, Publish};

/// Configuration for the MQTT client
///
/// # Example
///
/// ```
/// use tagwatch_network::MqttClientConfig;
/// use std::time::Duration;
///
/// let config = MqttClientConfig::new("10.0.0.2", 1883, "door-1")
///     .with_timeout(Duration::from_millis(5000));
/// assert_eq!(config.port, 1883);
/// assert!(config.username.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttClientConfig {
    /// Broker host name or address
    pub host: String,

    /// Broker TCP port
    pub port: u16,

    /// Client identifier sent in CONNECT
    pub client_id: String,

    /// Optional user name
    pub username: Option<String>,

    /// Optional password
    pub password: Option<String>,

    /// Timeout for each I/O step (connect, CONNACK, send)
    pub timeout: Duration,
}

impl MqttClientConfig {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            username: None,
            password: None,
            timeout: Duration::from_millis(DEFAULT_MQTT_TIMEOUT_MS),
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port` for logs.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect_packet(&self) -> Connect {
        Connect::new(self.client_id.clone()).with_credentials(
            self.username.clone(),
            self.password.as_ref().map(|p| p.as_bytes().to_vec()),
        )
    }
}

impl Default for MqttClientConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", DEFAULT_MQTT_PORT, "tagwatch")
    }
}

/// MQTT client
///
/// # Connection Lifecycle
///
/// 1. Create client with `new()`
/// 2. Open a session with `connect()`
/// 3. Send messages with `publish()`
/// 4. Close the session with `disconnect()`
pub struct MqttClient {
    config: MqttClientConfig,

    /// Framed TCP stream (None if not connected)
    framed: Option<Framed<TcpStream, MqttCodec>>,
}

impl MqttClient {
    /// Create a new client. The client is not connected after creation.
    ///
    /// ```
    /// use tagwatch_network::{MqttClient, MqttClientConfig};
    ///
    /// let client = MqttClient::new(MqttClientConfig::default());
    /// assert!(!client.is_connected());
    /// ```
    pub fn new(config: MqttClientConfig) -> Self {
        debug!("Creating MQTT client for broker {}", config.endpoint());
        Self {
            config,
            framed: None,
        }
    }

    pub fn config(&self) -> &MqttClientConfig {
        &self.config
    }

    /// Open a session with the broker.
    ///
    /// Establishes the TCP connection, sends CONNECT and waits for CONNACK.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Connection or CONNACK wait times out
    /// - Broker refuses the TCP connection
    /// - Broker answers with a non-zero return code (`ConnectionRefused`)
    /// - Broker sends anything other than CONNACK first
    pub async fn connect(&mut self) -> Result<(), MqttError> {
        let endpoint = self.config.endpoint();
        let timeout = self.config.timeout;
        debug!("Connecting to broker at {}", endpoint);

        let connect = TcpStream::connect((self.config.host.as_str(), self.config.port));
        let stream = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                debug!("TCP connect failed: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                debug!("Connection timeout after {}ms", timeout.as_millis());
                return Err(MqttError::ConnectionTimeout(timeout.as_millis() as u64));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        let mut framed = Framed::new(stream, MqttCodec::new());

        let connect = Packet::Connect(self.config.connect_packet());
        match tokio::time::timeout(timeout, framed.send(connect)).await {
            Ok(Ok(())) => trace!("CONNECT sent"),
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(MqttError::WriteTimeout(timeout.as_millis() as u64)),
        }

        let ack = match tokio::time::timeout(timeout, framed.next()).await {
            Ok(Some(Ok(Packet::ConnAck(ack)))) => ack,
            Ok(Some(Ok(other))) => {
                return Err(MqttError::UnexpectedPacket(format!(
                    "expected CONNACK, got {}",
                    other.name()
                )));
            }
            Ok(Some(Err(e))) => return Err(e),
            Ok(None) => {
                return Err(MqttError::ConnectionLost(
                    "Broker closed connection before CONNACK".to_string(),
                ));
            }
            Err(_) => {
                debug!("CONNACK timeout after {}ms", timeout.as_millis());
                return Err(MqttError::ReadTimeout(timeout.as_millis() as u64));
            }
        };

        if ack.code != ConnectReturnCode::Accepted {
            debug!(code = ack.code.as_u8(), "Broker refused connection: {}", ack.code);
            return Err(MqttError::ConnectionRefused(ack.code));
        }

        debug!("Connected to broker at {}", endpoint);
        self.framed = Some(framed);
        Ok(())
    }

    /// Publish one message at QoS 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is not connected, the send times out
    /// or the connection is lost.
    pub async fn publish(
        &mut self,
        topic: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Result<(), MqttError> {
        let timeout = self.config.timeout;
        let framed = self.framed.as_mut().ok_or(MqttError::NotConnected)?;

        let publish = Publish::new(topic, payload);
        trace!(topic = %publish.topic, size = publish.payload.len(), "Publishing");

        match tokio::time::timeout(timeout, framed.send(Packet::Publish(publish))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                debug!("PUBLISH send failed: {}", e);
                Err(e)
            }
            Err(_) => {
                debug!("Publish timeout after {}ms", timeout.as_millis());
                Err(MqttError::WriteTimeout(timeout.as_millis() as u64))
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Close the session gracefully.
    ///
    /// Sends DISCONNECT, then shuts the socket down. Idempotent: calling it
    /// while not connected is a no-op. Each step has a 500ms bound so a dead
    /// network cannot hang the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if DISCONNECT cannot be sent; the connection is
    /// dropped either way.
    pub async fn disconnect(&mut self) -> Result<(), MqttError> {
        let Some(mut framed) = self.framed.take() else {
            return Ok(());
        };

        debug!("Disconnecting from {}", self.config.endpoint());
        let step_timeout = Duration::from_millis(500);

        let sent = match tokio::time::timeout(step_timeout, framed.send(Packet::Disconnect)).await {
            Ok(result) => result,
            Err(_) => Err(MqttError::WriteTimeout(step_timeout.as_millis() as u64)),
        };

        let mut stream = framed.into_inner();
        match tokio::time::timeout(step_timeout, stream.shutdown()).await {
            Ok(Ok(())) => trace!("Shutdown completed"),
            Ok(Err(e)) => warn!("Error during shutdown: {}", e),
            Err(_) => warn!("Shutdown timeout ({}ms)", step_timeout.as_millis()),
        }

        sent
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        if self.framed.is_some() {
            debug!("MqttClient dropped while connected - connection will be closed");
        }
    }
}
