use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use super::{message_from_headed, with_wire_payload, EnvelopeStats};
use crate::config::EnvelopeSettings;
use crate::error::EnvelopeError;
use crate::message::{encode_header, ChannelId, Message, HEADER_SIZE};

/// Routing header on a transport that already delimits messages.
#[derive(Debug)]
pub struct RicFrame {
    channel_id: ChannelId,
    max_rx_len: usize,
    max_tx_len: usize,
    stats: EnvelopeStats,
}

impl RicFrame {
    pub fn new(channel_id: ChannelId, settings: &EnvelopeSettings) -> Self {
        debug!(
            channel_id,
            max_rx = settings.max_rx_msg_len,
            max_tx = settings.max_tx_msg_len,
            "ricframe envelope created"
        );
        Self {
            channel_id,
            max_rx_len: settings.max_rx_msg_len,
            max_tx_len: settings.max_tx_msg_len,
            stats: EnvelopeStats::default(),
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Each call is one whole message. Inputs shorter than the header are
    /// ignored.
    pub fn decode(&mut self, data: &[u8], deliver: &mut dyn FnMut(Message)) {
        if data.len() > self.max_rx_len {
            warn!(
                channel_id = self.channel_id,
                len = data.len(),
                max = self.max_rx_len,
                "ricframe message over receive limit, dropped"
            );
            self.stats.count_oversize();
            return;
        }
        match message_from_headed(self.channel_id, Bytes::copy_from_slice(data)) {
            Some(msg) => {
                self.stats.count_decoded();
                deliver(msg);
            }
            None => self.stats.count_malformed(),
        }
    }

    pub fn encode(&mut self, msg: &Message) -> Result<Message, EnvelopeError> {
        let size = HEADER_SIZE + msg.payload.len();
        if size > self.max_tx_len {
            return Err(EnvelopeError::PayloadTooLarge {
                size,
                max: self.max_tx_len,
            });
        }
        let mut wire = BytesMut::with_capacity(size);
        wire.put_slice(&encode_header(&msg.header()));
        wire.put_slice(&msg.payload);
        self.stats.count_encoded();
        Ok(with_wire_payload(msg, wire.freeze()))
    }

    pub fn stats(&self) -> EnvelopeStats {
        self.stats
    }

    pub fn clear_stats(&mut self) {
        self.stats = EnvelopeStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{protocol, MessageType};

    fn decode(env: &mut RicFrame, wire: &[u8]) -> Vec<Message> {
        let mut out = Vec::new();
        env.decode(wire, &mut |m| out.push(m));
        out
    }

    #[test]
    fn encode_prepends_header_only() {
        let mut env = RicFrame::new(7, &EnvelopeSettings::default());
        let msg = Message::new(7, 0x7F, MessageType::Publish, 250, &b"\x7e\x7d"[..]);
        let wire = env.encode(&msg).unwrap();
        // Protocol masked to 0x3F, no escaping.
        assert_eq!(&wire.payload[..], &[250, 0xBF, 0x7E, 0x7D]);
    }

    #[test]
    fn decode_parses_header() {
        let mut env = RicFrame::new(7, &EnvelopeSettings::default());
        let got = decode(&mut env, &[0x10, 0x42, b'o', b'k']);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].channel_id, 7);
        assert_eq!(got[0].sequence, 0x10);
        assert_eq!(got[0].msg_type, MessageType::Response);
        assert_eq!(got[0].protocol, protocol::RICREST);
        assert_eq!(&got[0].payload[..], b"ok");
    }

    #[test]
    fn inputs_shorter_than_header_ignored() {
        let mut env = RicFrame::new(0, &EnvelopeSettings::default());
        assert!(decode(&mut env, &[]).is_empty());
        assert!(decode(&mut env, &[0x01]).is_empty());
        assert_eq!(env.stats().malformed_headers, 2);
        // Header alone is a valid empty message.
        assert_eq!(decode(&mut env, &[0x01, 0x02]).len(), 1);
    }

    #[test]
    fn limits_enforced() {
        let settings = EnvelopeSettings {
            max_rx_msg_len: 4,
            max_tx_msg_len: 4,
            ..EnvelopeSettings::default()
        };
        let mut env = RicFrame::new(0, &settings);
        assert!(decode(&mut env, &[0, 0, 1, 2, 3]).is_empty());
        assert_eq!(env.stats().oversize_dropped, 1);

        let msg = Message::new(0, 0, MessageType::Command, 0, &b"abc"[..]);
        assert!(matches!(
            env.encode(&msg),
            Err(EnvelopeError::PayloadTooLarge { size: 5, max: 4 })
        ));
    }
}
