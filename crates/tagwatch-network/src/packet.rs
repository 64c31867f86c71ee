//! MQTT 3.1.1 control packets used by the appliance.
//!
//! Only the subset needed for fire-and-forget notifications is modelled:
//!
//! | Packet     | Type | Direction        |
//! |------------|------|------------------|
//! | CONNECT    | 1    | client -> broker |
//! | CONNACK    | 2    | broker -> client |
//! | PUBLISH    | 3    | both (QoS 0)     |
//! | DISCONNECT | 14   | client -> broker |
//!
//! Every packet is a fixed header (type and flags byte, variable-length
//! "remaining length") followed by a body. Framing lives in
//! [`MqttCodec`](crate::MqttCodec); this module converts bodies to and from
//! [`Packet`] values.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::error::MqttError;

/// Protocol name sent in CONNECT.
pub const PROTOCOL_NAME: &str = "MQTT";

/// Protocol level for MQTT 3.1.1.
pub const PROTOCOL_LEVEL: u8 = 4;

/// Largest value the remaining-length field can carry.
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

pub(crate) const CONNECT: u8 = 1;
pub(crate) const CONNACK: u8 = 2;
pub(crate) const PUBLISH: u8 = 3;
pub(crate) const DISCONNECT: u8 = 14;

const FLAG_USERNAME: u8 = 0x80;
const FLAG_PASSWORD: u8 = 0x40;
const FLAG_WILL: u8 = 0x04;
const FLAG_CLEAN_SESSION: u8 = 0x02;

/// CONNACK return codes (MQTT 3.1.1 section 3.2.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectReturnCode {
    Accepted,
    UnacceptableProtocolVersion,
    IdentifierRejected,
    ServerUnavailable,
    BadUsernameOrPassword,
    NotAuthorized,
    /// Codes 6-255 are reserved by MQTT 3.1.1.
    Reserved(u8),
}

impl ConnectReturnCode {
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => Self::Accepted,
            1 => Self::UnacceptableProtocolVersion,
            2 => Self::IdentifierRejected,
            3 => Self::ServerUnavailable,
            4 => Self::BadUsernameOrPassword,
            5 => Self::NotAuthorized,
            other => Self::Reserved(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Accepted => 0,
            Self::UnacceptableProtocolVersion => 1,
            Self::IdentifierRejected => 2,
            Self::ServerUnavailable => 3,
            Self::BadUsernameOrPassword => 4,
            Self::NotAuthorized => 5,
            Self::Reserved(code) => *code,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::UnacceptableProtocolVersion => "unacceptable protocol version",
            Self::IdentifierRejected => "identifier rejected",
            Self::ServerUnavailable => "server unavailable",
            Self::BadUsernameOrPassword => "bad user name or password",
            Self::NotAuthorized => "not authorized",
            Self::Reserved(_) => "reserved return code",
        }
    }
}

impl fmt::Display for ConnectReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u8())
    }
}

/// CONNECT packet. Wills are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    pub client_id: String,
    pub keep_alive: u16,
    pub clean_session: bool,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
}

impl Connect {
    /// Clean-session CONNECT with keep-alive disabled.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            keep_alive: 0,
            clean_session: true,
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<Vec<u8>>) -> Self {
        self.username = username;
        self.password = password;
        self
    }
}

/// CONNACK packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnAck {
    pub session_present: bool,
    pub code: ConnectReturnCode,
}

/// PUBLISH packet at QoS 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub topic: String,
    pub payload: Bytes,
    pub retain: bool,
}

impl Publish {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: false,
        }
    }
}

/// A decoded MQTT control packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect(Connect),
    ConnAck(ConnAck),
    Publish(Publish),
    Disconnect,
}

impl Packet {
    /// Short packet name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect(_) => "CONNECT",
            Self::ConnAck(_) => "CONNACK",
            Self::Publish(_) => "PUBLISH",
            Self::Disconnect => "DISCONNECT",
        }
    }

    /// First byte of the fixed header.
    pub(crate) fn header_byte(&self) -> u8 {
        match self {
            Self::Connect(_) => CONNECT << 4,
            Self::ConnAck(_) => CONNACK << 4,
            Self::Publish(p) => (PUBLISH << 4) | u8::from(p.retain),
            Self::Disconnect => DISCONNECT << 4,
        }
    }

    /// Serialise the body (everything after the remaining-length field).
    pub(crate) fn encode_body(&self, dst: &mut BytesMut) -> Result<(), MqttError> {
        match self {
            Self::Connect(c) => {
                put_string(dst, PROTOCOL_NAME)?;
                dst.put_u8(PROTOCOL_LEVEL);

                let mut flags = 0u8;
                if c.clean_session {
                    flags |= FLAG_CLEAN_SESSION;
                }
                if c.username.is_some() {
                    flags |= FLAG_USERNAME;
                }
                if c.password.is_some() {
                    flags |= FLAG_PASSWORD;
                }
                dst.put_u8(flags);
                dst.put_u16(c.keep_alive);

                put_string(dst, &c.client_id)?;
                if let Some(username) = &c.username {
                    put_string(dst, username)?;
                }
                if let Some(password) = &c.password {
                    put_binary(dst, password)?;
                }
            }
            Self::ConnAck(ack) => {
                dst.put_u8(u8::from(ack.session_present));
                dst.put_u8(ack.code.as_u8());
            }
            Self::Publish(p) => {
                put_string(dst, &p.topic)?;
                dst.put_slice(&p.payload);
            }
            Self::Disconnect => {}
        }
        Ok(())
    }

    /// Parse a packet from its fixed-header byte and body.
    pub(crate) fn decode(header: u8, mut body: Bytes) -> Result<Self, MqttError> {
        let packet_type = header >> 4;
        let flags = header & 0x0F;

        let packet = match packet_type {
            CONNECT => Self::Connect(decode_connect(&mut body)?),
            CONNACK => {
                if body.len() != 2 {
                    return Err(MqttError::protocol(format!(
                        "CONNACK body must be 2 bytes, got {}",
                        body.len()
                    )));
                }
                let ack_flags = body.get_u8();
                let code = ConnectReturnCode::from_u8(body.get_u8());
                Self::ConnAck(ConnAck {
                    session_present: ack_flags & 0x01 != 0,
                    code,
                })
            }
            PUBLISH => {
                let qos = (flags >> 1) & 0x03;
                if qos != 0 {
                    return Err(MqttError::protocol(format!(
                        "PUBLISH with QoS {qos} is not supported"
                    )));
                }
                let topic = get_string(&mut body)?;
                Self::Publish(Publish {
                    topic,
                    payload: body.split_off(0),
                    retain: flags & 0x01 != 0,
                })
            }
            DISCONNECT => Self::Disconnect,
            other => {
                return Err(MqttError::protocol(format!(
                    "Unsupported packet type {other}"
                )));
            }
        };

        if !body.is_empty() {
            return Err(MqttError::protocol(format!(
                "{} has {} trailing bytes",
                packet.name(),
                body.len()
            )));
        }

        Ok(packet)
    }
}

fn decode_connect(body: &mut Bytes) -> Result<Connect, MqttError> {
    let protocol = get_string(body)?;
    let level = get_u8(body)?;
    if protocol != PROTOCOL_NAME || level != PROTOCOL_LEVEL {
        return Err(MqttError::protocol(format!(
            "Unsupported protocol {protocol} level {level}"
        )));
    }

    let flags = get_u8(body)?;
    if flags & FLAG_WILL != 0 {
        return Err(MqttError::protocol("CONNECT with will is not supported"));
    }
    let keep_alive = get_u16(body)?;
    let client_id = get_string(body)?;

    let username = if flags & FLAG_USERNAME != 0 {
        Some(get_string(body)?)
    } else {
        None
    };
    let password = if flags & FLAG_PASSWORD != 0 {
        Some(get_binary(body)?.to_vec())
    } else {
        None
    };

    Ok(Connect {
        client_id,
        keep_alive,
        clean_session: flags & FLAG_CLEAN_SESSION != 0,
        username,
        password,
    })
}

fn put_binary(dst: &mut BytesMut, data: &[u8]) -> Result<(), MqttError> {
    let len = u16::try_from(data.len()).map_err(|_| {
        MqttError::protocol(format!("Field of {} bytes exceeds 65535", data.len()))
    })?;
    dst.put_u16(len);
    dst.put_slice(data);
    Ok(())
}

fn put_string(dst: &mut BytesMut, s: &str) -> Result<(), MqttError> {
    put_binary(dst, s.as_bytes())
}

fn get_u8(body: &mut Bytes) -> Result<u8, MqttError> {
    if body.remaining() < 1 {
        return Err(MqttError::protocol("Truncated packet"));
    }
    Ok(body.get_u8())
}

fn get_u16(body: &mut Bytes) -> Result<u16, MqttError> {
    if body.remaining() < 2 {
        return Err(MqttError::protocol("Truncated packet"));
    }
    Ok(body.get_u16())
}

fn get_binary(body: &mut Bytes) -> Result<Bytes, MqttError> {
    let len = get_u16(body)? as usize;
    if body.remaining() < len {
        return Err(MqttError::protocol(format!(
            "Field declares {len} bytes, {} available",
            body.remaining()
        )));
    }
    Ok(body.split_to(len))
}

fn get_string(body: &mut Bytes) -> Result<String, MqttError> {
    let raw = get_binary(body)?;
    String::from_utf8(raw.to_vec()).map_err(|_| MqttError::protocol("Invalid UTF-8 in string"))
}

/// Append a remaining-length varint.
pub(crate) fn put_remaining_length(dst: &mut BytesMut, mut len: usize) -> Result<(), MqttError> {
    if len > MAX_REMAINING_LENGTH {
        return Err(MqttError::PacketTooLarge {
            size: len,
            max: MAX_REMAINING_LENGTH,
        });
    }

    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        dst.put_u8(byte);
        if len == 0 {
            return Ok(());
        }
    }
}

/// Read a remaining-length varint.
///
/// Returns `Ok(None)` if more bytes are needed, otherwise the value and the
/// number of bytes it occupied.
pub(crate) fn get_remaining_length(src: &[u8]) -> Result<Option<(usize, usize)>, MqttError> {
    let mut value = 0usize;
    for (i, byte) in src.iter().enumerate() {
        if i == 4 {
            return Err(MqttError::protocol("Remaining length exceeds 4 bytes"));
        }
        value |= ((byte & 0x7F) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }

    if src.len() >= 4 {
        return Err(MqttError::protocol("Remaining length exceeds 4 bytes"));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(127, &[0x7F])]
    #[case(128, &[0x80, 0x01])]
    #[case(16_383, &[0xFF, 0x7F])]
    #[case(16_384, &[0x80, 0x80, 0x01])]
    #[case(MAX_REMAINING_LENGTH, &[0xFF, 0xFF, 0xFF, 0x7F])]
    fn test_remaining_length(#[case] value: usize, #[case] wire: &[u8]) {
        let mut buf = BytesMut::new();
        put_remaining_length(&mut buf, value).unwrap();
        assert_eq!(&buf[..], wire);
        assert_eq!(get_remaining_length(wire).unwrap(), Some((value, wire.len())));
    }

    #[test]
    fn test_remaining_length_too_large() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            put_remaining_length(&mut buf, MAX_REMAINING_LENGTH + 1),
            Err(MqttError::PacketTooLarge { .. })
        ));
    }

    #[test]
    fn test_remaining_length_incomplete() {
        assert_eq!(get_remaining_length(&[]).unwrap(), None);
        assert_eq!(get_remaining_length(&[0x80]).unwrap(), None);
        assert_eq!(get_remaining_length(&[0x80, 0x80, 0x80]).unwrap(), None);
    }

    #[test]
    fn test_remaining_length_malformed() {
        assert!(get_remaining_length(&[0x80, 0x80, 0x80, 0x80]).is_err());
        assert!(get_remaining_length(&[0x80, 0x80, 0x80, 0x80, 0x01]).is_err());
    }

    #[test]
    fn test_connect_body_layout() {
        let connect = Packet::Connect(
            Connect::new("door").with_credentials(Some("u".into()), Some(b"p".to_vec())),
        );
        let mut body = BytesMut::new();
        connect.encode_body(&mut body).unwrap();

        assert_eq!(
            &body[..],
            &[
                0x00, 0x04, b'M', b'Q', b'T', b'T', // protocol name
                0x04, // level
                0xC2, // username + password + clean session
                0x00, 0x00, // keep alive
                0x00, 0x04, b'd', b'o', b'o', b'r', // client id
                0x00, 0x01, b'u', // username
                0x00, 0x01, b'p', // password
            ]
        );
        assert_eq!(connect.header_byte(), 0x10);
    }

    #[test]
    fn test_connect_without_credentials() {
        let connect = Packet::Connect(Connect::new("x"));
        let mut body = BytesMut::new();
        connect.encode_body(&mut body).unwrap();
        assert_eq!(body[7], FLAG_CLEAN_SESSION);

        let decoded = Packet::decode(connect.header_byte(), body.freeze()).unwrap();
        assert_eq!(decoded, connect);
    }

    #[rstest]
    #[case(0, ConnectReturnCode::Accepted)]
    #[case(4, ConnectReturnCode::BadUsernameOrPassword)]
    #[case(5, ConnectReturnCode::NotAuthorized)]
    #[case(42, ConnectReturnCode::Reserved(42))]
    fn test_connack_codes(#[case] code: u8, #[case] expected: ConnectReturnCode) {
        let packet = Packet::decode(0x20, Bytes::from(vec![0x00, code])).unwrap();
        assert_eq!(
            packet,
            Packet::ConnAck(ConnAck {
                session_present: false,
                code: expected
            })
        );
        assert_eq!(expected.as_u8(), code);
    }

    #[test]
    fn test_connack_wrong_length() {
        assert!(Packet::decode(0x20, Bytes::from_static(&[0x00])).is_err());
    }

    #[test]
    fn test_publish_body() {
        let publish = Packet::Publish(Publish::new("rc522/card/authorized", "hi"));
        let mut body = BytesMut::new();
        publish.encode_body(&mut body).unwrap();

        assert_eq!(&body[..2], &[0x00, 21]);
        assert_eq!(&body[2..23], b"rc522/card/authorized");
        assert_eq!(&body[23..], b"hi");
        assert_eq!(publish.header_byte(), 0x30);
    }

    #[test]
    fn test_publish_qos1_rejected() {
        let body = Bytes::from_static(&[0x00, 0x01, b't', 0x00, 0x01]);
        assert!(matches!(
            Packet::decode(0x32, body),
            Err(MqttError::Protocol(_))
        ));
    }

    #[test]
    fn test_unknown_packet_type() {
        assert!(Packet::decode(0xC0, Bytes::new()).is_err());
    }

    #[test]
    fn test_disconnect_with_body_rejected() {
        assert!(Packet::decode(0xE0, Bytes::from_static(&[0x00])).is_err());
    }

    #[test]
    fn test_truncated_string() {
        let body = Bytes::from_static(&[0x00, 0x09, b'a']);
        assert!(Packet::decode(0x30, body).is_err());
    }

    #[test]
    fn test_return_code_display() {
        assert_eq!(
            ConnectReturnCode::NotAuthorized.to_string(),
            "not authorized (5)"
        );
    }
}
