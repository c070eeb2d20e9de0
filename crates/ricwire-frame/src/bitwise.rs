//! Bit-level HDLC: zero-bit insertion on transmit, flag hunting and
//! zero-bit deletion on receive.
//!
//! Bits travel least-significant first. After five consecutive ones the
//! transmitter inserts a zero, so the flag pattern `01111110` can only appear
//! at a frame boundary.

/// A bit-stuffed frame, packed least-significant bit first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitFrame {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitFrame {
    pub(crate) fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            bit_len: 0,
        }
    }

    /// Number of meaningful bits.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Packed bits. The final byte is zero-padded in its high bits.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bits in transmission order.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_len).map(move |i| self.bytes[i / 8] & (1 << (i % 8)) != 0)
    }

    fn push(&mut self, bit: bool) {
        let offset = self.bit_len % 8;
        if offset == 0 {
            self.bytes.push(0);
        }
        if bit {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 1 << offset;
            }
        }
        self.bit_len += 1;
    }
}

/// Transmit side: counts consecutive ones and inserts zeros.
#[derive(Debug, Default)]
pub(crate) struct BitStuffer {
    ones: u8,
}

impl BitStuffer {
    /// Emit a flag verbatim and reset the run counter.
    pub(crate) fn put_flag(&mut self, flag: u8, out: &mut BitFrame) {
        for i in 0..8 {
            out.push(flag & (1 << i) != 0);
        }
        self.ones = 0;
    }

    pub(crate) fn put_byte(&mut self, byte: u8, out: &mut BitFrame) {
        for i in 0..8 {
            let bit = byte & (1 << i) != 0;
            out.push(bit);
            if bit {
                self.ones += 1;
                if self.ones == 5 {
                    out.push(false);
                    self.ones = 0;
                }
            } else {
                self.ones = 0;
            }
        }
    }
}

/// What the receive shift register produced for one input bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BitEvent {
    Flag,
    Byte(u8),
}

/// Receive side: 8-bit window for flag detection plus a byte accumulator.
#[derive(Debug, Default)]
pub(crate) struct BitDestuffer {
    window: u8,
    byte: u8,
    count: u8,
}

impl BitDestuffer {
    pub(crate) fn push(&mut self, bit: bool, flag: u8) -> Option<BitEvent> {
        let high = if bit { 0x80 } else { 0 };
        self.window = (self.window >> 1) | high;

        if self.window == flag {
            self.byte = 0;
            self.count = 0;
            return Some(BitEvent::Flag);
        }

        // Newest bit zero, preceded by five ones: a stuffed zero.
        if self.window & 0xFC == 0x7C {
            return None;
        }

        self.byte = (self.byte >> 1) | high;
        self.count += 1;
        if self.count == 8 {
            let byte = self.byte;
            self.byte = 0;
            self.count = 0;
            return Some(BitEvent::Byte(byte));
        }
        None
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stuff(bytes: &[u8]) -> BitFrame {
        let mut out = BitFrame::default();
        let mut stuffer = BitStuffer::default();
        stuffer.put_flag(0x7E, &mut out);
        for &b in bytes {
            stuffer.put_byte(b, &mut out);
        }
        stuffer.put_flag(0x7E, &mut out);
        out
    }

    fn unstuff(frame: &BitFrame) -> Vec<BitEvent> {
        let mut rx = BitDestuffer::default();
        frame.bits().filter_map(|bit| rx.push(bit, 0x7E)).collect()
    }

    #[test]
    fn test_flag_bits_are_lsb_first() {
        let mut out = BitFrame::default();
        BitStuffer::default().put_flag(0x7E, &mut out);
        let bits: Vec<bool> = out.bits().collect();
        assert_eq!(
            bits,
            vec![false, true, true, true, true, true, true, false]
        );
        assert_eq!(out.as_bytes(), &[0x7E]);
    }

    #[test]
    fn test_zero_inserted_after_five_ones() {
        let mut out = BitFrame::default();
        BitStuffer::default().put_byte(0xFF, &mut out);
        // 8 data bits + 1 stuffed zero after the fifth one.
        assert_eq!(out.bit_len(), 9);
        let bits: Vec<bool> = out.bits().collect();
        assert!(!bits[5]);
    }

    #[test]
    fn test_no_flag_pattern_inside_frame() {
        let frame = stuff(&[0xFF, 0x7E, 0xFF, 0xFC, 0x3F]);
        let bits: Vec<bool> = frame.bits().collect();
        let body = &bits[8..bits.len() - 8];
        let mut run = 0;
        for &bit in body {
            run = if bit { run + 1 } else { 0 };
            assert!(run <= 5, "six consecutive ones inside frame body");
        }
    }

    #[test]
    fn test_destuffer_recovers_bytes() {
        let data = [0xFF, 0x7E, 0x00, 0x1F, 0xF8];
        let events = unstuff(&stuff(&data));

        let mut expected = vec![BitEvent::Flag];
        expected.extend(data.iter().map(|&b| BitEvent::Byte(b)));
        expected.push(BitEvent::Flag);
        assert_eq!(events, expected);
    }

    #[test]
    fn test_back_to_back_flags() {
        let mut out = BitFrame::default();
        let mut stuffer = BitStuffer::default();
        for _ in 0..3 {
            stuffer.put_flag(0x7E, &mut out);
        }
        assert_eq!(unstuff(&out), vec![BitEvent::Flag; 3]);
    }
}
