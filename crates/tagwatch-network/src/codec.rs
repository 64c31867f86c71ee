//! Tokio codec for MQTT packet framing.
//!
//! `MqttCodec` splits a TCP byte stream into [`Packet`]s using the fixed
//! header's remaining-length field, and serialises packets back with the
//! correct header. It is symmetric, so the same codec drives the client and
//! the fake brokers used in tests.
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//! use tagwatch_network::{Connect, MqttCodec, Packet};
//!
//! # async fn example() -> Result<(), tagwatch_network::MqttError> {
//! let stream = TcpStream::connect("127.0.0.1:1883").await?;
//! let mut framed = Framed::new(stream, MqttCodec::new());
//!
//! framed.send(Packet::Connect(Connect::new("door-1"))).await?;
//! if let Some(Ok(Packet::ConnAck(ack))) = framed.next().await {
//!     println!("CONNACK: {}", ack.code);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Size Limit
//!
//! Packets whose remaining length exceeds the configured maximum (default
//! 64 KB) are rejected before their body is buffered.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::MqttError;
use crate::packet::{Packet, get_remaining_length, put_remaining_length};

/// Default maximum packet body size in bytes (64 KB).
const DEFAULT_MAX_PACKET_SIZE: usize = 64 * 1024;

/// Tokio codec for MQTT 3.1.1 packets.
#[derive(Debug, Clone)]
pub struct MqttCodec {
    /// Maximum allowed remaining length in bytes.
    max_packet_size: usize,
}

impl MqttCodec {
    /// Create a new codec with the default maximum packet size.
    pub fn new() -> Self {
        Self {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }

    /// Create a new codec with a custom maximum packet size.
    ///
    /// ```
    /// use tagwatch_network::MqttCodec;
    ///
    /// let codec = MqttCodec::with_max_packet_size(1024);
    /// assert_eq!(codec.max_packet_size(), 1024);
    /// ```
    pub fn with_max_packet_size(max_packet_size: usize) -> Self {
        Self { max_packet_size }
    }

    /// Get the current maximum packet size.
    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }
}

impl Default for MqttCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MqttCodec {
    type Item = Packet;
    type Error = MqttError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 2 {
            return Ok(None);
        }

        let Some((remaining, len_bytes)) = get_remaining_length(&src[1..])? else {
            return Ok(None);
        };

        if remaining > self.max_packet_size {
            return Err(MqttError::PacketTooLarge {
                size: remaining,
                max: self.max_packet_size,
            });
        }

        let total = 1 + len_bytes + remaining;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let header = src[0];
        src.advance(1 + len_bytes);
        let body = src.split_to(remaining).freeze();

        let packet = Packet::decode(header, body)?;
        trace!(packet = packet.name(), size = total, "Decoded packet");
        Ok(Some(packet))
    }
}

impl Encoder<Packet> for MqttCodec {
    type Error = MqttError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut body = BytesMut::new();
        item.encode_body(&mut body)?;

        if body.len() > self.max_packet_size {
            return Err(MqttError::PacketTooLarge {
                size: body.len(),
                max: self.max_packet_size,
            });
        }

        dst.reserve(body.len() + 5);
        dst.extend_from_slice(&[item.header_byte()]);
        put_remaining_length(dst, body.len())?;
        dst.extend_from_slice(&body);

        trace!(packet = item.name(), body = body.len(), "Encoded packet");
        Ok(())
    }
}
