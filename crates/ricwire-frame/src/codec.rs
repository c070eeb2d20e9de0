use bytes::{BufMut, BytesMut};

use crate::crc::{crc16, crc16_update, CrcOrder, CRC16_CCITT_INIT};

/// Default frame boundary (flag) octet.
pub const DEFAULT_BOUNDARY_OCTET: u8 = 0x7E;

/// Default control-escape octet.
pub const DEFAULT_ESCAPE_OCTET: u8 = 0x7D;

/// Bits flipped in an escaped octet.
pub const DEFAULT_INVERT_MASK: u8 = 0x20;

/// Default maximum received payload, in bytes.
pub const DEFAULT_MAX_RX_LEN: usize = 5000;

/// Default maximum encoded frame, in bytes.
pub const DEFAULT_MAX_TX_LEN: usize = 5000;

/// Size of the trailing frame check sequence.
pub const CRC_SIZE: usize = 2;

/// How frame boundaries are protected on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StuffingMode {
    /// Octet stuffing: reserved octets are escaped.
    #[default]
    Byte,
    /// Bit stuffing: a zero follows every run of five ones.
    Bit,
}

/// Framer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdlcConfig {
    /// Octet that terminates (and optionally opens) a frame.
    pub boundary_octet: u8,
    /// Octet that introduces an escaped byte.
    pub escape_octet: u8,
    /// XOR mask applied to escaped bytes.
    pub invert_mask: u8,
    /// Wire order of the CRC bytes.
    pub crc_order: CrcOrder,
    /// Maximum decoded payload length. Longer frames are dropped.
    pub max_rx_len: usize,
    /// Maximum encoded frame length. Longer frames are refused.
    pub max_tx_len: usize,
    /// Byte or bit stuffing.
    pub mode: StuffingMode,
    /// Emit a boundary octet before each encoded frame as well as after it.
    pub leading_boundary: bool,
}

impl Default for HdlcConfig {
    fn default() -> Self {
        Self {
            boundary_octet: DEFAULT_BOUNDARY_OCTET,
            escape_octet: DEFAULT_ESCAPE_OCTET,
            invert_mask: DEFAULT_INVERT_MASK,
            crc_order: CrcOrder::BigEndian,
            max_rx_len: DEFAULT_MAX_RX_LEN,
            max_tx_len: DEFAULT_MAX_TX_LEN,
            mode: StuffingMode::Byte,
            leading_boundary: false,
        }
    }
}

impl HdlcConfig {
    /// True if `byte` must be escaped on the wire.
    #[inline]
    pub fn is_reserved(&self, byte: u8) -> bool {
        byte == self.boundary_octet || byte == self.escape_octet
    }
}

/// Incremental frame encoder.
///
/// Lets a caller stream a frame out in pieces (for example a routing header
/// followed by a payload) without concatenating them first. The CRC covers
/// every pushed byte.
///
/// ```
/// use bytes::BytesMut;
/// use ricwire_frame::{encode_frame, FrameEncoder, HdlcConfig};
///
/// let config = HdlcConfig::default();
/// let mut split = BytesMut::new();
/// let mut enc = FrameEncoder::start(&config, &mut split);
/// enc.push(&[0x00, 0x02]);
/// enc.push(b"payload");
/// enc.finish();
///
/// let mut whole = BytesMut::new();
/// encode_frame(b"\x00\x02payload", &config, &mut whole);
/// assert_eq!(split, whole);
/// ```
pub struct FrameEncoder<'a> {
    config: &'a HdlcConfig,
    dst: &'a mut BytesMut,
    crc: u16,
}

impl<'a> FrameEncoder<'a> {
    /// Begin a frame, writing the leading boundary if configured.
    pub fn start(config: &'a HdlcConfig, dst: &'a mut BytesMut) -> Self {
        if config.leading_boundary {
            dst.put_u8(config.boundary_octet);
        }
        Self::body(config, dst)
    }

    fn body(config: &'a HdlcConfig, dst: &'a mut BytesMut) -> Self {
        Self {
            config,
            dst,
            crc: CRC16_CCITT_INIT,
        }
    }

    /// Append payload bytes, escaping reserved octets.
    pub fn push(&mut self, data: &[u8]) {
        self.dst.reserve(data.len() + data.len() / 8);
        for &byte in data {
            self.crc = crc16_update(self.crc, byte);
            put_escaped(self.config, self.dst, byte);
        }
    }

    fn put_crc(&mut self) -> u16 {
        for byte in self.config.crc_order.to_bytes(self.crc) {
            put_escaped(self.config, self.dst, byte);
        }
        self.crc
    }

    /// Write the CRC and the closing boundary. Returns the CRC.
    pub fn finish(mut self) -> u16 {
        let crc = self.put_crc();
        self.dst.put_u8(self.config.boundary_octet);
        crc
    }
}

#[inline]
fn put_escaped(config: &HdlcConfig, dst: &mut BytesMut, byte: u8) {
    if config.is_reserved(byte) {
        dst.put_u8(config.escape_octet);
        dst.put_u8(byte ^ config.invert_mask);
    } else {
        dst.put_u8(byte);
    }
}

/// Encode one octet-stuffed frame.
///
/// Wire format:
/// ```text
/// [boundary]? escaped(payload) escaped(crc16(payload)) boundary
/// ```
/// The CRC is computed over the unescaped payload and written in
/// `config.crc_order`.
pub fn encode_frame(payload: &[u8], config: &HdlcConfig, dst: &mut BytesMut) {
    dst.reserve(encoded_len(payload, config));
    let mut enc = FrameEncoder::start(config, dst);
    enc.push(payload);
    enc.finish();
}

/// Escaped payload and CRC with no boundary octets. Input to bit stuffing.
pub(crate) fn encode_body(payload: &[u8], config: &HdlcConfig, dst: &mut BytesMut) {
    let mut enc = FrameEncoder::body(config, dst);
    enc.push(payload);
    enc.put_crc();
}

/// Exact length of the octet-stuffed encoding of `payload`.
pub fn encoded_len(payload: &[u8], config: &HdlcConfig) -> usize {
    let crc = config.crc_order.to_bytes(crc16(payload));
    let escapes = payload
        .iter()
        .chain(crc.iter())
        .filter(|&&b| config.is_reserved(b))
        .count();
    payload.len() + CRC_SIZE + escapes + 1 + usize::from(config.leading_boundary)
}

/// Worst-case encoded length for a payload of `payload_len` bytes.
pub fn max_encoded_len(payload_len: usize, config: &HdlcConfig) -> usize {
    2 * (payload_len + CRC_SIZE) + 1 + usize::from(config.leading_boundary)
}
