use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, HdlcConfig};
use crate::error::{FrameError, Result};
use crate::transcoder::Transcoder;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes octet-stuffed HDLC frames to any `Write` stream.
pub struct HdlcWriter<T> {
    inner: T,
    config: HdlcConfig,
    high_bit: bool,
    buf: BytesMut,
    wire: BytesMut,
}

impl<T: Write> HdlcWriter<T> {
    /// Create a writer with the default framing configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, HdlcConfig::default())
    }

    pub fn with_config(inner: T, config: HdlcConfig) -> Self {
        Self {
            inner,
            config,
            high_bit: false,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            wire: BytesMut::new(),
        }
    }

    /// Transcode every frame into the high-bit alphabet before writing.
    pub fn high_bit_alphabet(mut self, enabled: bool) -> Self {
        self.high_bit = enabled;
        self
    }

    /// Encode and send one payload (blocking).
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(payload, &self.config, &mut self.buf);
        if self.buf.len() > self.config.max_tx_len {
            return Err(FrameError::EncodedTooLarge {
                size: self.buf.len(),
                max: self.config.max_tx_len,
            });
        }

        if self.high_bit {
            self.wire.clear();
            Transcoder::encode(&self.buf, &mut self.wire);
            std::mem::swap(&mut self.buf, &mut self.wire);
        }

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    pub fn config(&self) -> &HdlcConfig {
        &self.config
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
