use bytes::Bytes;
use tracing::warn;

use super::{with_wire_payload, EnvelopeStats};
use crate::config::EnvelopeSettings;
use crate::error::EnvelopeError;
use crate::message::{protocol, ChannelId, Message, MessageType};

/// Payload carried verbatim. Routing metadata belongs to the transport's own
/// framing, so decoded messages are reports with no protocol.
#[derive(Debug)]
pub struct RicJson {
    channel_id: ChannelId,
    max_rx_len: usize,
    max_tx_len: usize,
    stats: EnvelopeStats,
}

impl RicJson {
    pub fn new(channel_id: ChannelId, settings: &EnvelopeSettings) -> Self {
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

    pub fn decode(&mut self, data: &[u8], deliver: &mut dyn FnMut(Message)) {
        if data.is_empty() {
            return;
        }
        if data.len() > self.max_rx_len {
            warn!(
                channel_id = self.channel_id,
                len = data.len(),
                max = self.max_rx_len,
                "ricjson message over receive limit, dropped"
            );
            self.stats.count_oversize();
            return;
        }
        self.stats.count_decoded();
        deliver(Message::new(
            self.channel_id,
            protocol::NONE,
            MessageType::Report,
            0,
            Bytes::copy_from_slice(data),
        ));
    }

    pub fn encode(&mut self, msg: &Message) -> Result<Message, EnvelopeError> {
        if msg.payload.len() > self.max_tx_len {
            return Err(EnvelopeError::PayloadTooLarge {
                size: msg.payload.len(),
                max: self.max_tx_len,
            });
        }
        self.stats.count_encoded();
        Ok(with_wire_payload(msg, msg.payload.clone()))
    }

    pub fn stats(&self) -> EnvelopeStats {
        self.stats
    }

    pub fn clear_stats(&mut self) {
        self.stats = EnvelopeStats::default();
    }
}
