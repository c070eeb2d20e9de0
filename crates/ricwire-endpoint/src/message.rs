use bytes::Bytes;
use serde::Serialize;

/// Identifies an endpoint. Assigned by the manager, never reused.
pub type ChannelId = u32;

/// Pseudo channel addressing every registered endpoint.
pub const CHANNEL_ID_ALL: ChannelId = 10000;

/// Known protocol codes carried in the routing header (6 bits).
pub mod protocol {
    pub const ROSSERIAL: u8 = 0;
    pub const M1SC: u8 = 1;
    pub const RICREST: u8 = 2;
    /// No protocol metadata available.
    pub const NONE: u8 = 0x3F;

    /// Largest value the header can carry.
    pub const MASK: u8 = 0x3F;

    pub fn name(code: u8) -> &'static str {
        match code {
            ROSSERIAL => "ROSSerial",
            M1SC => "Marty1SC",
            RICREST => "RICREST",
            _ => "None",
        }
    }
}

/// Direction/kind of a message (2 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Command = 0,
    Response = 1,
    Publish = 2,
    Report = 3,
}

impl MessageType {
    /// Decode from the low two bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => MessageType::Command,
            1 => MessageType::Response,
            2 => MessageType::Publish,
            _ => MessageType::Report,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Short wire-log name.
    pub fn name(self) -> &'static str {
        match self {
            MessageType::Command => "CMD",
            MessageType::Response => "RSP",
            MessageType::Publish => "PUB",
            MessageType::Report => "REP",
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cmd" | "command" => Ok(MessageType::Command),
            "rsp" | "response" => Ok(MessageType::Response),
            "pub" | "publish" => Ok(MessageType::Publish),
            "rep" | "report" => Ok(MessageType::Report),
            other => Err(format!("unknown message type: {other}")),
        }
    }
}

/// A decoded message travelling between an envelope and the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel_id: ChannelId,
    /// Protocol code. Only the low six bits reach the wire.
    pub protocol: u8,
    pub msg_type: MessageType,
    /// Sequence number, wrapping.
    pub sequence: u8,
    pub payload: Bytes,
}

impl Message {
    pub fn new(
        channel_id: ChannelId,
        protocol: u8,
        msg_type: MessageType,
        sequence: u8,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            channel_id,
            protocol,
            msg_type,
            sequence,
            payload: payload.into(),
        }
    }

    /// A response on the same channel, protocol and sequence as `request`.
    pub fn response_to(request: &Message, payload: impl Into<Bytes>) -> Self {
        Self::new(
            request.channel_id,
            request.protocol,
            MessageType::Response,
            request.sequence,
            payload,
        )
    }

    pub fn header(&self) -> Header {
        Header {
            sequence: self.sequence,
            msg_type: self.msg_type,
            protocol: self.protocol,
        }
    }

    pub fn protocol_name(&self) -> &'static str {
        protocol::name(self.protocol)
    }
}

/// Size of the routing header.
pub const HEADER_SIZE: usize = 2;

/// Two-byte routing header: `[sequence, type << 6 | protocol]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub sequence: u8,
    pub msg_type: MessageType,
    pub protocol: u8,
}

/// Pack a header. Out-of-range protocol codes are masked, not rejected.
pub fn encode_header(header: &Header) -> [u8; HEADER_SIZE] {
    [
        header.sequence,
        (header.msg_type.bits() << 6) | (header.protocol & protocol::MASK),
    ]
}

/// Parse a header from the start of `data`. `None` if too short.
pub fn decode_header(data: &[u8]) -> Option<Header> {
    match data {
        [sequence, kind, ..] => Some(Header {
            sequence: *sequence,
            msg_type: MessageType::from_bits(kind >> 6),
            protocol: kind & protocol::MASK,
        }),
        _ => None,
    }
}

/// Bytes as they arrived from a transport, queued before decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawByteMessage(Bytes);

impl RawByteMessage {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<&[u8]> for RawByteMessage {
    fn from(data: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(data))
    }
}

impl From<Vec<u8>> for RawByteMessage {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_packing() {
        let header = Header {
            sequence: 250,
            msg_type: MessageType::Report,
            protocol: 0x3F,
        };
        assert_eq!(encode_header(&header), [0xFA, 0xFF]);
        assert_eq!(decode_header(&[0xFA, 0xFF]), Some(header));
    }

    #[test]
    fn header_masks_out_of_range_protocol() {
        let header = Header {
            sequence: 1,
            msg_type: MessageType::Command,
            protocol: 0x42,
        };
        assert_eq!(encode_header(&header), [0x01, 0x02]);
    }

    #[test]
    fn decode_header_needs_two_bytes() {
        assert_eq!(decode_header(&[]), None);
        assert_eq!(decode_header(&[0x01]), None);
        let h = decode_header(&[0x07, 0x42, 0xAA]).unwrap();
        assert_eq!(h.sequence, 7);
        assert_eq!(h.msg_type, MessageType::Response);
        assert_eq!(h.protocol, protocol::RICREST);
    }

    #[test]
    fn response_to_keeps_routing() {
        let req = Message::new(3, protocol::RICREST, MessageType::Command, 42, &b"q"[..]);
        let rsp = Message::response_to(&req, &b"a"[..]);
        assert_eq!(rsp.channel_id, 3);
        assert_eq!(rsp.protocol, protocol::RICREST);
        assert_eq!(rsp.sequence, 42);
        assert_eq!(rsp.msg_type, MessageType::Response);
        assert_eq!(rsp.protocol_name(), "RICREST");
    }

    #[test]
    fn message_type_names_and_parsing() {
        assert_eq!(MessageType::Publish.name(), "PUB");
        assert_eq!("rsp".parse::<MessageType>().unwrap(), MessageType::Response);
        assert_eq!("Report".parse::<MessageType>().unwrap(), MessageType::Report);
        assert!("bogus".parse::<MessageType>().is_err());
    }

    #[test]
    fn raw_byte_message_owns_copy() {
        let mut src = vec![1u8, 2, 3];
        let raw = RawByteMessage::from(src.as_slice());
        src[0] = 9;
        assert_eq!(raw.as_bytes(), &[1, 2, 3]);
        assert_eq!(raw.len(), 3);
        assert!(!raw.is_empty());
    }
}
