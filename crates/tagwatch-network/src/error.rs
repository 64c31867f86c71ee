//! Error types for the network layer.

use thiserror::Error;

use crate::packet::ConnectReturnCode;

/// Errors that can occur while talking to the MQTT broker.
#[derive(Debug, Error)]
pub enum MqttError {
    /// Client is not connected to the broker
    #[error("Not connected to broker")]
    NotConnected,

    /// Connection attempt timed out
    #[error("Connection timeout after {0}ms")]
    ConnectionTimeout(u64),

    /// Read operation timed out
    #[error("Read timeout after {0}ms")]
    ReadTimeout(u64),

    /// Write operation timed out
    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// Connection was lost during operation
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Broker answered CONNECT with a non-zero return code
    #[error("Connection refused: {0}")]
    ConnectionRefused(ConnectReturnCode),

    /// Broker sent a packet that makes no sense at this point
    #[error("Unexpected packet: {0}")]
    UnexpectedPacket(String),

    /// Malformed packet on the wire
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Packet exceeds the configured size limit
    #[error("Packet of {size} bytes exceeds limit of {max} bytes")]
    PacketTooLarge { size: usize, max: usize },

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MqttError {
    /// Numeric reason code reported by the broker, if any.
    pub fn reason_code(&self) -> Option<u8> {
        match self {
            Self::ConnectionRefused(code) => Some(code.as_u8()),
            _ => None,
        }
    }

    /// `true` when the broker rejected the client's credentials or rights.
    pub fn is_not_authorized(&self) -> bool {
        matches!(self, Self::ConnectionRefused(ConnectReturnCode::NotAuthorized))
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// Errors raised while bringing up the wireless link.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Link did not report connected within the configured bound
    #[error("Timed out after {waited_secs}s joining network '{ssid}'")]
    JoinTimeout { ssid: String, waited_secs: u64 },

    /// Link rejected the join request outright
    #[error("Failed to join network: {0}")]
    JoinFailed(String),

    /// Link reports connected but has no address
    #[error("Link is connected but has no address")]
    NoAddress,
}
