//! HDLC framing, high-bit transcoding and message endpoints for
//! robot-controller links.
//!
//! # Crate Structure
//!
//! - [`frame`]: HDLC framer, CRC-16/CCITT, bit stuffing and the high-bit
//!   transcoder, with blocking and (behind `async`) tokio adapters
//! - [`endpoint`]: RICSerial/RICFrame/RICJSON envelopes, bounded-queue
//!   endpoints and the endpoint manager

/// Re-export frame types.
pub mod frame {
    pub use ricwire_frame::*;
}

/// Re-export endpoint types.
pub mod endpoint {
    pub use ricwire_endpoint::*;
}
