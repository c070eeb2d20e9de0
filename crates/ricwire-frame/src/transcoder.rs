//! High-bit alphabet transcoder.
//!
//! Maps arbitrary bytes onto a wire alphabet in which every byte has bit 7
//! set, for links that reserve the low half of the byte range (terminal
//! consoles, 7-bit-clean channels with in-band control characters).
//!
//! | input       | output                                   |
//! |-------------|------------------------------------------|
//! | 0x00..=0x0F | `ESCAPE_1`, `(input ^ 0x20) \| 0x80`     |
//! | 0x10..=0x7F | `input \| 0x80`                          |
//! | 0x80..=0x8F | `ESCAPE_2`, `input ^ 0x20`               |
//! | 0x90..=0xFF | `ESCAPE_3`, `input`                      |
//!
//! Encoding is stateless. Decoding holds one pending escape between bytes,
//! so a fresh stream must start from [`Transcoder::clear`].

use bytes::{BufMut, Bytes, BytesMut};

/// Escape introducing a control-range byte (0x00..=0x0F).
pub const ESCAPE_1: u8 = 0x85;
/// Escape introducing a low high-bit byte (0x80..=0x8F).
pub const ESCAPE_2: u8 = 0x8E;
/// Escape introducing a byte passed through unchanged (0x90..=0xFF).
pub const ESCAPE_3: u8 = 0x8F;

const MODIFIER: u8 = 0x20;
const HIGH_BIT: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Control,
    LowHigh,
    Verbatim,
}

/// Stateful decoder for the high-bit alphabet. Encoding helpers are
/// associated functions.
#[derive(Debug, Clone)]
pub struct Transcoder {
    pending: Pending,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcoder {
    pub fn new() -> Self {
        Self {
            pending: Pending::None,
        }
    }

    /// Forget any half-received escape sequence.
    pub fn clear(&mut self) {
        self.pending = Pending::None;
    }

    /// True if the last byte fed was an escape awaiting its operand.
    pub fn is_pending(&self) -> bool {
        self.pending != Pending::None
    }

    /// Encode `data`, appending to `dst`.
    pub fn encode(data: &[u8], dst: &mut BytesMut) {
        dst.reserve(Self::encoded_len(data));
        for &byte in data {
            match byte {
                0x00..=0x0F => {
                    dst.put_u8(ESCAPE_1);
                    dst.put_u8((byte ^ MODIFIER) | HIGH_BIT);
                }
                0x10..=0x7F => dst.put_u8(byte | HIGH_BIT),
                0x80..=0x8F => {
                    dst.put_u8(ESCAPE_2);
                    dst.put_u8(byte ^ MODIFIER);
                }
                0x90..=0xFF => {
                    dst.put_u8(ESCAPE_3);
                    dst.put_u8(byte);
                }
            }
        }
    }

    pub fn encode_to_bytes(data: &[u8]) -> Bytes {
        let mut dst = BytesMut::new();
        Self::encode(data, &mut dst);
        dst.freeze()
    }

    /// Exact encoded length of `data`.
    pub fn encoded_len(data: &[u8]) -> usize {
        data.iter()
            .map(|&b| if (0x10..=0x7F).contains(&b) { 1 } else { 2 })
            .sum()
    }

    /// Feed one wire byte. Returns `None` when the byte was an escape and the
    /// decoded value arrives with the next byte.
    pub fn decode_byte(&mut self, byte: u8) -> Option<u8> {
        let pending = std::mem::replace(&mut self.pending, Pending::None);
        match pending {
            Pending::Control => Some((byte ^ MODIFIER) & !HIGH_BIT),
            Pending::LowHigh => Some(byte ^ MODIFIER),
            Pending::Verbatim => Some(byte),
            Pending::None => {
                self.pending = match byte {
                    ESCAPE_1 => Pending::Control,
                    ESCAPE_2 => Pending::LowHigh,
                    ESCAPE_3 => Pending::Verbatim,
                    _ => return Some(byte & !HIGH_BIT),
                };
                None
            }
        }
    }

    /// Decode a chunk, appending output to `dst`. Escape state carries over
    /// to the next call.
    pub fn decode(&mut self, data: &[u8], dst: &mut BytesMut) {
        dst.reserve(data.len());
        for &byte in data {
            if let Some(out) = self.decode_byte(byte) {
                dst.put_u8(out);
            }
        }
    }
}
