use crate::message::ChannelId;

/// Errors from encoding a message for transmission.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Framing failed (encoded frame over the transmit limit).
    #[error("frame error: {0}")]
    Frame(#[from] ricwire_frame::FrameError),

    /// The encoded message exceeds the envelope's transmit limit.
    #[error("message too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Why a bounded queue refused an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue full (capacity {capacity})")]
    Full { capacity: usize },

    /// The queue lock was not acquired within the bounded wait.
    #[error("queue lock not acquired in time")]
    LockTimeout,
}

/// Errors from settings parsing and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Errors from endpoint setup and channel management.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// An envelope is already bound to this endpoint.
    #[error("envelope already attached to channel {channel_id}")]
    DoubleAttach { channel_id: ChannelId },

    /// The endpoint has no envelope to encode with.
    #[error("no envelope attached to channel {channel_id}")]
    NoEnvelope { channel_id: ChannelId },

    /// No envelope recipe is registered under this protocol name.
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),

    /// Every id below the broadcast id has been handed out. Ids are never
    /// reused.
    #[error("no channel ids left below {limit}")]
    ChannelIdsExhausted { limit: ChannelId },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, EndpointError>;
