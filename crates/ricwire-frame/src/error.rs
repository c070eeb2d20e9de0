/// Errors that can occur during frame encoding or stream I/O.
///
/// Decode-side problems (bad CRC, oversized frames, allocation failure) are
/// not errors: the framer drops the frame, bumps a counter and keeps going.
/// See [`DropReason`].
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The encoded frame exceeds the configured transmit maximum.
    #[error("encoded frame too large ({size} bytes, max {max})")]
    EncodedTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

/// Why the decoder discarded an in-progress frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Trailing CRC did not match the received payload.
    CrcMismatch,
    /// The frame grew past the configured receive maximum.
    FrameTooLong,
    /// The receive buffer could not be grown.
    BufferAllocFailure,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::CrcMismatch => "crc_mismatch",
            DropReason::FrameTooLong => "frame_too_long",
            DropReason::BufferAllocFailure => "buffer_alloc_failure",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
