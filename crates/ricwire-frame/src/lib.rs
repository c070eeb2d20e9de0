//! HDLC-style framing for unreliable, boundary-less byte streams.
//!
//! Every frame on the wire is:
//! - the payload, with the boundary and escape octets escaped
//! - a CRC-16/CCITT of the unescaped payload, escaped the same way
//! - one literal boundary octet
//!
//! The [`Framer`] decodes a byte (or bit) stream back into validated
//! payloads, dropping and counting anything that fails the check. The
//! [`Transcoder`] optionally restricts the wire alphabet to bytes with the
//! high bit set, and stacks underneath the framer.

pub mod bitwise;
pub mod codec;
pub mod crc;
pub mod error;
pub mod hdlc;
pub mod reader;
pub mod transcoder;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use bitwise::BitFrame;
pub use codec::{
    encode_frame, encoded_len, max_encoded_len, FrameEncoder, HdlcConfig, StuffingMode,
    DEFAULT_BOUNDARY_OCTET, DEFAULT_ESCAPE_OCTET, DEFAULT_INVERT_MASK, DEFAULT_MAX_RX_LEN,
    DEFAULT_MAX_TX_LEN,
};
pub use crc::{crc16, CrcOrder};
pub use error::{DropReason, FrameError, Result};
pub use hdlc::{Framer, FramerStats};
pub use reader::HdlcReader;
pub use transcoder::Transcoder;
pub use writer::HdlcWriter;

#[cfg(feature = "async")]
pub use async_codec::HdlcCodec;
