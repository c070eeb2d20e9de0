//! Stateful HDLC framer: decode state machine plus encode entry points that
//! honour the transmit limit.

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::bitwise::{BitDestuffer, BitEvent, BitFrame, BitStuffer};
use crate::codec::{encode_body, max_encoded_len, FrameEncoder, HdlcConfig, CRC_SIZE};
use crate::crc::{crc16_update, CRC16_CCITT_INIT};
use crate::error::{DropReason, FrameError, Result};

/// First allocation for the receive buffer.
const RX_INITIAL_ALLOC: usize = 64;

/// Growth step once the initial allocation is full.
const RX_ALLOC_INCREMENT: usize = 256;

/// Receive-side counters. Saturating, cleared only on request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Frames that passed the CRC check and were delivered.
    pub frames_received: u32,
    pub crc_errors: u32,
    pub frames_too_long: u32,
    pub buffer_alloc_failures: u32,
}

impl FramerStats {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One HDLC stream: receive state and the configuration used for both
/// directions.
///
/// A `Framer` is single-owner state. Feed it from one context at a time.
#[derive(Debug)]
pub struct Framer {
    config: HdlcConfig,
    rx_buf: Vec<u8>,
    // Running CRC over all stored bytes except the two most recent.
    crc: u16,
    pending_escape: bool,
    discarding: bool,
    last_drop: Option<DropReason>,
    stats: FramerStats,
    bits: BitDestuffer,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(HdlcConfig::default())
    }
}

impl Framer {
    pub fn new(config: HdlcConfig) -> Self {
        Self {
            config,
            rx_buf: Vec::new(),
            crc: CRC16_CCITT_INIT,
            pending_escape: false,
            discarding: false,
            last_drop: None,
            stats: FramerStats::default(),
            bits: BitDestuffer::default(),
        }
    }

    pub fn config(&self) -> &HdlcConfig {
        &self.config
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    pub fn clear_stats(&mut self) {
        self.stats.clear();
    }

    /// Why the most recent frame was dropped, if any was.
    pub fn last_drop(&self) -> Option<DropReason> {
        self.last_drop
    }

    /// Change the receive limit. Takes effect from the next stored byte.
    pub fn set_max_rx_len(&mut self, max_rx_len: usize) {
        self.config.max_rx_len = max_rx_len;
    }

    pub fn set_max_tx_len(&mut self, max_tx_len: usize) {
        self.config.max_tx_len = max_tx_len;
    }

    /// Discard any partial frame and escape state. Configuration and stats
    /// are kept.
    pub fn clear(&mut self) {
        self.reset_rx();
        self.rx_buf.shrink_to(RX_INITIAL_ALLOC);
        self.bits.clear();
        self.last_drop = None;
    }

    /// Bytes buffered for the frame in progress.
    pub fn rx_pending(&self) -> usize {
        self.rx_buf.len()
    }

    // ---- Transmit ----

    /// Encode `payload` as one octet-stuffed frame.
    pub fn encode(&self, payload: &[u8]) -> Result<Bytes> {
        self.encode_parts(&[payload])
    }

    /// Encode the concatenation of `parts` as one frame.
    pub fn encode_parts(&self, parts: &[&[u8]]) -> Result<Bytes> {
        let total: usize = parts.iter().map(|p| p.len()).sum();
        let mut dst = BytesMut::with_capacity(max_encoded_len(total, &self.config));
        let mut enc = FrameEncoder::start(&self.config, &mut dst);
        for part in parts {
            enc.push(part);
        }
        enc.finish();
        self.check_tx_len(dst.len())?;
        Ok(dst.freeze())
    }

    /// Encode `payload` as a bit-stuffed frame between two flags.
    pub fn encode_bits(&self, payload: &[u8]) -> Result<BitFrame> {
        let mut body = BytesMut::with_capacity(max_encoded_len(payload.len(), &self.config));
        encode_body(payload, &self.config, &mut body);

        let flag = self.config.boundary_octet;
        // Worst case adds one stuffed bit per five.
        let mut frame = BitFrame::with_capacity(16 + body.len() * 8 * 6 / 5 + 1);
        let mut stuffer = BitStuffer::default();
        stuffer.put_flag(flag, &mut frame);
        for &byte in body.iter() {
            stuffer.put_byte(byte, &mut frame);
        }
        stuffer.put_flag(flag, &mut frame);

        self.check_tx_len(frame.as_bytes().len())?;
        Ok(frame)
    }

    fn check_tx_len(&self, size: usize) -> Result<()> {
        if size > self.config.max_tx_len {
            return Err(FrameError::EncodedTooLarge {
                size,
                max: self.config.max_tx_len,
            });
        }
        Ok(())
    }

    // ---- Receive ----

    /// Feed one received octet. Returns the payload when this octet completes
    /// a frame with a valid CRC.
    pub fn feed(&mut self, byte: u8) -> Option<Bytes> {
        if byte == self.config.boundary_octet {
            return self.end_of_frame();
        }
        if self.discarding {
            return None;
        }

        let byte = if self.pending_escape {
            self.pending_escape = false;
            byte ^ self.config.invert_mask
        } else if byte == self.config.escape_octet {
            self.pending_escape = true;
            return None;
        } else {
            byte
        };

        self.store(byte);
        None
    }

    /// Feed a chunk, calling `on_frame` for every completed frame.
    pub fn feed_slice(&mut self, data: &[u8], mut on_frame: impl FnMut(Bytes)) {
        for &byte in data {
            if let Some(frame) = self.feed(byte) {
                on_frame(frame);
            }
        }
    }

    /// Feed one received bit (bit-stuffed links).
    pub fn feed_bit(&mut self, bit: bool) -> Option<Bytes> {
        match self.bits.push(bit, self.config.boundary_octet)? {
            BitEvent::Flag => self.end_of_frame(),
            BitEvent::Byte(byte) => self.feed(byte),
        }
    }

    /// Feed a sequence of bits, calling `on_frame` for every completed frame.
    pub fn feed_bits(&mut self, bits: impl IntoIterator<Item = bool>, mut on_frame: impl FnMut(Bytes)) {
        for bit in bits {
            if let Some(frame) = self.feed_bit(bit) {
                on_frame(frame);
            }
        }
    }

    fn rx_limit(&self) -> usize {
        self.config.max_rx_len.saturating_add(CRC_SIZE)
    }

    fn store(&mut self, byte: u8) {
        let len = self.rx_buf.len();
        let limit = self.rx_limit();
        if len >= limit {
            warn!(
                limit = self.config.max_rx_len,
                "hdlc frame too long, discarding until next boundary"
            );
            self.drop_frame(DropReason::FrameTooLong);
            return;
        }

        if len == self.rx_buf.capacity() {
            let step = if len == 0 {
                RX_INITIAL_ALLOC
            } else {
                RX_ALLOC_INCREMENT
            };
            if self.rx_buf.try_reserve_exact(step.min(limit - len)).is_err() {
                warn!(len, "hdlc receive buffer growth failed");
                self.drop_frame(DropReason::BufferAllocFailure);
                return;
            }
        }

        self.rx_buf.push(byte);
        if len >= CRC_SIZE {
            self.crc = crc16_update(self.crc, self.rx_buf[len - CRC_SIZE]);
        }
    }

    fn end_of_frame(&mut self) -> Option<Bytes> {
        let len = self.rx_buf.len();
        let frame = if self.discarding || len < CRC_SIZE {
            None
        } else {
            let trailer = [self.rx_buf[len - 2], self.rx_buf[len - 1]];
            let received = self.config.crc_order.from_bytes(trailer);
            if received == self.crc {
                self.stats.frames_received = self.stats.frames_received.saturating_add(1);
                Some(Bytes::copy_from_slice(&self.rx_buf[..len - CRC_SIZE]))
            } else {
                debug!(
                    received = format_args!("{received:#06x}"),
                    computed = format_args!("{:#06x}", self.crc),
                    len,
                    "hdlc crc mismatch"
                );
                self.stats.crc_errors = self.stats.crc_errors.saturating_add(1);
                self.last_drop = Some(DropReason::CrcMismatch);
                None
            }
        };
        self.reset_rx();
        frame
    }

    fn drop_frame(&mut self, reason: DropReason) {
        let counter = match reason {
            DropReason::FrameTooLong => &mut self.stats.frames_too_long,
            DropReason::BufferAllocFailure => &mut self.stats.buffer_alloc_failures,
            DropReason::CrcMismatch => &mut self.stats.crc_errors,
        };
        *counter = counter.saturating_add(1);
        self.last_drop = Some(reason);
        self.reset_rx();
        self.discarding = true;
    }

    fn reset_rx(&mut self) {
        self.rx_buf.clear();
        self.crc = CRC16_CCITT_INIT;
        self.pending_escape = false;
        self.discarding = false;
    }
}
