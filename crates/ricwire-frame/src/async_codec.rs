//! `tokio_util::codec` adapter over [`Framer`].

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{encode_frame, HdlcConfig, StuffingMode};
use crate::error::FrameError;
use crate::hdlc::{Framer, FramerStats};

/// Decodes validated payloads and encodes payloads into octet-stuffed frames.
///
/// Use with `FramedRead`, `FramedWrite` or `Framed`.
///
/// Octet stuffing only. Bit-stuffed frames are not octet aligned, so a
/// config asking for [`StuffingMode::Bit`] is switched to
/// [`StuffingMode::Byte`] by [`HdlcCodec::new`]. Use [`Framer::feed_bits`]
/// for bit-stuffed links.
#[derive(Debug, Default)]
pub struct HdlcCodec {
    framer: Framer,
}

impl HdlcCodec {
    pub fn new(mut config: HdlcConfig) -> Self {
        if config.mode == StuffingMode::Bit {
            warn!("bit stuffing not supported by HdlcCodec; using byte stuffing");
            config.mode = StuffingMode::Byte;
        }
        Self {
            framer: Framer::new(config),
        }
    }

    pub fn config(&self) -> &HdlcConfig {
        self.framer.config()
    }

    pub fn stats(&self) -> FramerStats {
        self.framer.stats()
    }
}

impl Decoder for HdlcCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Consume only up to the first completed frame so later frames stay
        // in `src` for the next call.
        let mut consumed = 0;
        let mut frame = None;
        for &byte in src.iter() {
            consumed += 1;
            if let Some(f) = self.framer.feed(byte) {
                frame = Some(f);
                break;
            }
        }
        src.advance(consumed);
        Ok(frame)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if self.framer.rx_pending() > 0 => Err(FrameError::ConnectionClosed),
            None => Ok(None),
        }
    }
}

impl<T: AsRef<[u8]>> Encoder<T> for HdlcCodec {
    type Error = FrameError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let start = dst.len();
        encode_frame(item.as_ref(), self.framer.config(), dst);
        let size = dst.len() - start;
        let max = self.framer.config().max_tx_len;
        if size > max {
            dst.truncate(start);
            return Err(FrameError::EncodedTooLarge { size, max });
        }
        Ok(())
    }
}
