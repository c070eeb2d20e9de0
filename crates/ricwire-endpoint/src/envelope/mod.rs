//! Message envelopes: the strategies that turn wire bytes into [`Message`]s
//! and back.
//!
//! - [`RicSerial`]: routing header plus HDLC framing, for raw byte streams.
//! - [`RicFrame`]: routing header only, for transports that already deliver
//!   whole messages (WebSocket, BLE characteristic writes).
//! - [`RicJson`]: no header at all; the payload is passed through verbatim.

mod ric_frame;
mod ric_json;
mod ric_serial;

use bytes::Bytes;
use ricwire_frame::FramerStats;

pub use ric_frame::RicFrame;
pub use ric_json::RicJson;
pub use ric_serial::RicSerial;

use crate::config::EnvelopeSettings;
use crate::error::EnvelopeError;
use crate::message::{decode_header, ChannelId, Message, HEADER_SIZE};

/// Which envelope a channel speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    RicSerial,
    RicFrame,
    RicJson,
}

impl EnvelopeKind {
    pub const ALL: [EnvelopeKind; 3] = [
        EnvelopeKind::RicSerial,
        EnvelopeKind::RicFrame,
        EnvelopeKind::RicJson,
    ];

    /// Protocol name as used in channel registration and config documents.
    pub fn name(self) -> &'static str {
        match self {
            EnvelopeKind::RicSerial => "RICSerial",
            EnvelopeKind::RicFrame => "RICFrame",
            EnvelopeKind::RicJson => "RICJSON",
        }
    }
}

impl std::fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for EnvelopeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnvelopeKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown envelope protocol: {s}"))
    }
}

/// Per-envelope counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopeStats {
    pub messages_decoded: u32,
    pub messages_encoded: u32,
    /// Inputs too short to carry a routing header.
    pub malformed_headers: u32,
    /// Inputs over the receive limit, dropped before decoding.
    pub oversize_dropped: u32,
    /// Framer counters, for envelopes that frame.
    pub framer: Option<FramerStats>,
}

impl EnvelopeStats {
    pub(crate) fn count_decoded(&mut self) {
        self.messages_decoded = self.messages_decoded.saturating_add(1);
    }

    pub(crate) fn count_encoded(&mut self) {
        self.messages_encoded = self.messages_encoded.saturating_add(1);
    }

    pub(crate) fn count_malformed(&mut self) {
        self.malformed_headers = self.malformed_headers.saturating_add(1);
    }

    pub(crate) fn count_oversize(&mut self) {
        self.oversize_dropped = self.oversize_dropped.saturating_add(1);
    }
}

/// An envelope bound to one channel.
#[derive(Debug)]
pub enum Envelope {
    RicSerial(RicSerial),
    RicFrame(RicFrame),
    RicJson(RicJson),
}

impl Envelope {
    /// Build the envelope for `kind` on `channel_id`.
    pub fn create(kind: EnvelopeKind, channel_id: ChannelId, settings: &EnvelopeSettings) -> Self {
        match kind {
            EnvelopeKind::RicSerial => Envelope::RicSerial(RicSerial::new(channel_id, settings)),
            EnvelopeKind::RicFrame => Envelope::RicFrame(RicFrame::new(channel_id, settings)),
            EnvelopeKind::RicJson => Envelope::RicJson(RicJson::new(channel_id, settings)),
        }
    }

    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::RicSerial(_) => EnvelopeKind::RicSerial,
            Envelope::RicFrame(_) => EnvelopeKind::RicFrame,
            Envelope::RicJson(_) => EnvelopeKind::RicJson,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        match self {
            Envelope::RicSerial(e) => e.channel_id(),
            Envelope::RicFrame(e) => e.channel_id(),
            Envelope::RicJson(e) => e.channel_id(),
        }
    }

    /// Decode received bytes, calling `deliver` once per complete message.
    pub fn decode(&mut self, data: &[u8], deliver: &mut dyn FnMut(Message)) {
        match self {
            Envelope::RicSerial(e) => e.decode(data, deliver),
            Envelope::RicFrame(e) => e.decode(data, deliver),
            Envelope::RicJson(e) => e.decode(data, deliver),
        }
    }

    /// Encode `msg` for transmission. The returned message carries the same
    /// routing fields with the wire bytes as its payload.
    pub fn encode(&mut self, msg: &Message) -> Result<Message, EnvelopeError> {
        match self {
            Envelope::RicSerial(e) => e.encode(msg),
            Envelope::RicFrame(e) => e.encode(msg),
            Envelope::RicJson(e) => e.encode(msg),
        }
    }

    pub fn stats(&self) -> EnvelopeStats {
        match self {
            Envelope::RicSerial(e) => e.stats(),
            Envelope::RicFrame(e) => e.stats(),
            Envelope::RicJson(e) => e.stats(),
        }
    }

    pub fn clear_stats(&mut self) {
        match self {
            Envelope::RicSerial(e) => e.clear_stats(),
            Envelope::RicFrame(e) => e.clear_stats(),
            Envelope::RicJson(e) => e.clear_stats(),
        }
    }

    /// Drop any partially received message.
    pub fn clear(&mut self) {
        if let Envelope::RicSerial(e) = self {
            e.clear();
        }
    }
}

/// Split a headed buffer into a message. `None` if shorter than the header.
pub(crate) fn message_from_headed(channel_id: ChannelId, data: Bytes) -> Option<Message> {
    let header = decode_header(&data)?;
    Some(Message {
        channel_id,
        protocol: header.protocol,
        msg_type: header.msg_type,
        sequence: header.sequence,
        payload: data.slice(HEADER_SIZE..),
    })
}

/// Same routing fields, new payload.
pub(crate) fn with_wire_payload(msg: &Message, wire: Bytes) -> Message {
    Message {
        payload: wire,
        ..msg.clone()
    }
}
