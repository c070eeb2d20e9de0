use bytes::Bytes;
use ricwire_frame::{Framer, StuffingMode};
use tracing::debug;

use super::{message_from_headed, with_wire_payload, EnvelopeStats};
use crate::config::EnvelopeSettings;
use crate::error::EnvelopeError;
use crate::message::{encode_header, ChannelId, Message};

/// Routing header inside an HDLC frame.
///
/// In bit-stuffed mode the wire bytes are the packed bit stream, least
/// significant bit first.
#[derive(Debug)]
pub struct RicSerial {
    channel_id: ChannelId,
    framer: Framer,
    stats: EnvelopeStats,
}

impl RicSerial {
    pub fn new(channel_id: ChannelId, settings: &EnvelopeSettings) -> Self {
        let config = settings.hdlc_config();
        debug!(
            channel_id,
            max_rx = config.max_rx_len,
            max_tx = config.max_tx_len,
            mode = ?config.mode,
            "ricserial envelope created"
        );
        Self {
            channel_id,
            framer: Framer::new(config),
            stats: EnvelopeStats::default(),
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    pub fn decode(&mut self, data: &[u8], deliver: &mut dyn FnMut(Message)) {
        let channel_id = self.channel_id;
        let stats = &mut self.stats;
        let mut on_frame = |frame: Bytes| match message_from_headed(channel_id, frame) {
            Some(msg) => {
                stats.count_decoded();
                deliver(msg);
            }
            None => {
                debug!(channel_id, "ricserial frame shorter than header");
                stats.count_malformed();
            }
        };

        match self.framer.config().mode {
            StuffingMode::Byte => self.framer.feed_slice(data, &mut on_frame),
            StuffingMode::Bit => {
                let bits = data
                    .iter()
                    .flat_map(|&byte| (0..8).map(move |i| byte & (1 << i) != 0));
                self.framer.feed_bits(bits, &mut on_frame);
            }
        }
    }

    pub fn encode(&mut self, msg: &Message) -> Result<Message, EnvelopeError> {
        let header = encode_header(&msg.header());
        let wire = match self.framer.config().mode {
            StuffingMode::Byte => self.framer.encode_parts(&[&header[..], &msg.payload[..]])?,
            StuffingMode::Bit => {
                let mut headed = Vec::with_capacity(header.len() + msg.payload.len());
                headed.extend_from_slice(&header);
                headed.extend_from_slice(&msg.payload);
                Bytes::copy_from_slice(self.framer.encode_bits(&headed)?.as_bytes())
            }
        };
        self.stats.count_encoded();
        Ok(with_wire_payload(msg, wire))
    }

    pub fn stats(&self) -> EnvelopeStats {
        EnvelopeStats {
            framer: Some(self.framer.stats()),
            ..self.stats
        }
    }

    pub fn clear_stats(&mut self) {
        self.stats = EnvelopeStats::default();
        self.framer.clear_stats();
    }

    pub fn clear(&mut self) {
        self.framer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{protocol, MessageType};

    fn decode(env: &mut RicSerial, wire: &[u8]) -> Vec<Message> {
        let mut out = Vec::new();
        env.decode(wire, &mut |m| out.push(m));
        out
    }

    #[test]
    fn encode_layout() {
        let mut env = RicSerial::new(1, &EnvelopeSettings::default());
        let msg = Message::new(1, protocol::RICREST, MessageType::Command, 5, &b"hi"[..]);
        let wire = env.encode(&msg).unwrap();

        // [seq, type<<6|proto, payload.., crc_hi, crc_lo, boundary]
        assert_eq!(&wire.payload[..4], &[0x05, 0x02, b'h', b'i']);
        assert_eq!(*wire.payload.last().unwrap(), 0x7E);
        assert_eq!(wire.channel_id, 1);
        assert_eq!(wire.sequence, 5);
    }

    #[test]
    fn decode_stream_of_messages_split_arbitrarily() {
        let mut tx = RicSerial::new(2, &EnvelopeSettings::default());
        let mut wire = Vec::new();
        for seq in 0..5u8 {
            let msg = Message::new(2, protocol::RICREST, MessageType::Publish, seq, vec![0x7E; seq as usize]);
            wire.extend_from_slice(&tx.encode(&msg).unwrap().payload);
        }

        let mut rx = RicSerial::new(2, &EnvelopeSettings::default());
        let mut got = Vec::new();
        for chunk in wire.chunks(3) {
            got.extend(decode(&mut rx, chunk));
        }
        assert_eq!(got.len(), 5);
        for (seq, msg) in got.iter().enumerate() {
            assert_eq!(msg.sequence as usize, seq);
            assert_eq!(msg.msg_type, MessageType::Publish);
            assert_eq!(msg.payload.len(), seq);
        }
    }

    #[test]
    fn short_frames_yield_no_message() {
        let framer = Framer::default();
        let mut env = RicSerial::new(0, &EnvelopeSettings::default());
        let mut wire = framer.encode(b"").unwrap().to_vec();
        wire.extend_from_slice(&framer.encode(b"\x01").unwrap());

        assert!(decode(&mut env, &wire).is_empty());
        let stats = env.stats();
        assert_eq!(stats.malformed_headers, 2);
        assert_eq!(stats.messages_decoded, 0);
        assert_eq!(stats.framer.unwrap().frames_received, 2);
    }

    #[test]
    fn corrupt_frame_counted_in_framer_stats() {
        let mut env = RicSerial::new(0, &EnvelopeSettings::default());
        let msg = Message::new(0, protocol::RICREST, MessageType::Command, 1, &b"abc"[..]);
        let mut wire = env.encode(&msg).unwrap().payload.to_vec();
        wire[2] ^= 0x04;

        assert!(decode(&mut env, &wire).is_empty());
        assert_eq!(env.stats().framer.unwrap().crc_errors, 1);

        env.clear_stats();
        assert_eq!(env.stats().framer.unwrap().crc_errors, 0);
    }

    #[test]
    fn oversized_encode_is_error() {
        let settings = EnvelopeSettings {
            max_tx_msg_len: 16,
            ..EnvelopeSettings::default()
        };
        let mut env = RicSerial::new(0, &settings);
        let msg = Message::new(0, protocol::RICREST, MessageType::Command, 1, vec![0u8; 32]);
        assert!(matches!(env.encode(&msg), Err(EnvelopeError::Frame(_))));
        assert_eq!(env.stats().messages_encoded, 0);
    }

    #[test]
    fn bitwise_mode_roundtrip() {
        let settings = EnvelopeSettings {
            bit_wise: true,
            ..EnvelopeSettings::default()
        };
        let mut env = RicSerial::new(3, &settings);
        let msg = Message::new(3, protocol::M1SC, MessageType::Report, 200, vec![0xFF, 0x7E, 0x00, 0xFF]);
        let wire = env.encode(&msg).unwrap();

        let got = decode(&mut env, &wire.payload);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0], msg);
    }
}
