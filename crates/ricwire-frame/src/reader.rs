use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::codec::HdlcConfig;
use crate::error::{FrameError, Result};
use crate::hdlc::{Framer, FramerStats};
use crate::transcoder::Transcoder;

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads validated HDLC payloads from any `Read` stream.
///
/// Bad frames are dropped by the framer and counted in [`HdlcReader::stats`];
/// callers only ever see payloads that passed the CRC check.
pub struct HdlcReader<T> {
    inner: T,
    framer: Framer,
    transcoder: Option<Transcoder>,
    decoded: BytesMut,
    ready: VecDeque<Bytes>,
}

impl<T: Read> HdlcReader<T> {
    /// Create a reader with the default framing configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, HdlcConfig::default())
    }

    pub fn with_config(inner: T, config: HdlcConfig) -> Self {
        Self {
            inner,
            framer: Framer::new(config),
            transcoder: None,
            decoded: BytesMut::new(),
            ready: VecDeque::new(),
        }
    }

    /// Undo the high-bit alphabet before deframing.
    pub fn high_bit_alphabet(mut self, enabled: bool) -> Self {
        self.transcoder = enabled.then(Transcoder::new);
        self
    }

    /// Read the next valid frame payload (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at EOF, including EOF in
    /// the middle of a frame.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(frame);
            }

            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            let ready = &mut self.ready;
            match self.transcoder.as_mut() {
                Some(transcoder) => {
                    self.decoded.clear();
                    transcoder.decode(&chunk[..read], &mut self.decoded);
                    self.framer.feed_slice(&self.decoded, |f| ready.push_back(f));
                }
                None => self.framer.feed_slice(&chunk[..read], |f| ready.push_back(f)),
            }
        }
    }

    /// Receive counters of the underlying framer.
    pub fn stats(&self) -> FramerStats {
        self.framer.stats()
    }

    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::writer::HdlcWriter;

    fn wire_for(payloads: &[&[u8]]) -> Vec<u8> {
        let mut writer = HdlcWriter::new(Vec::new());
        for p in payloads {
            writer.send(p).unwrap();
        }
        writer.into_inner()
    }

    #[test]
    fn read_multiple_frames() {
        let wire = wire_for(&[b"one", b"two", b"three"]);
        let mut reader = HdlcReader::new(Cursor::new(wire));

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"two");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"three");
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire_for(&[b"slow\x7e\x7d"]),
            pos: 0,
        };
        let mut reader = HdlcReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.as_ref(), b"slow\x7e\x7d");
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut wire = wire_for(&[b"complete"]);
        wire.pop();
        let mut reader = HdlcReader::new(Cursor::new(wire));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert_eq!(reader.framer().rx_pending(), b"complete".len() + 2);
    }

    #[test]
    fn corrupt_frame_skipped() {
        let mut wire = wire_for(&[b"bad"]);
        wire[0] ^= 0x01;
        wire.extend(wire_for(&[b"good"]));

        let mut reader = HdlcReader::new(Cursor::new(wire));
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"good");
        assert_eq!(reader.stats().crc_errors, 1);
    }

    #[test]
    fn high_bit_alphabet_stream() {
        let mut writer = HdlcWriter::new(Vec::new()).high_bit_alphabet(true);
        writer.send(&[0x00, 0x7E, 0x90, 0xFF]).unwrap();
        let wire = writer.into_inner();
        assert!(wire.iter().all(|&b| b & 0x80 != 0));

        let mut reader = HdlcReader::new(ByteByByteReader { bytes: wire, pos: 0 }).high_bit_alphabet(true);
        assert_eq!(reader.read_frame().unwrap().as_ref(), &[0x00, 0x7E, 0x90, 0xFF]);
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            bytes: wire_for(&[b"retry"]),
            pos: 0,
        };
        let mut reader = HdlcReader::new(reader);
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"retry");
    }

    #[test]
    fn other_io_errors_propagate() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::BrokenPipe, "gone"))
            }
        }
        let err = HdlcReader::new(Broken).read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[cfg(unix)]
    #[test]
    fn roundtrip_over_socket_pair_threads() {
        let (tx, rx) = std::os::unix::net::UnixStream::pair().unwrap();
        let handle = std::thread::spawn(move || {
            let mut writer = HdlcWriter::new(tx);
            for i in 0..20u8 {
                writer.send(&[i, 0x7E, i]).unwrap();
            }
        });

        let mut reader = HdlcReader::new(rx);
        for i in 0..20u8 {
            assert_eq!(reader.read_frame().unwrap().as_ref(), &[i, 0x7E, i]);
        }
        handle.join().expect("writer thread should finish");
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::new(ErrorKind::Interrupted, "interrupted"));
            }
            let remaining = &self.bytes[self.pos..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            Ok(n)
        }
    }
}
