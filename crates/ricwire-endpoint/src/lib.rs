//! Message envelopes and bounded-queue endpoints for robot-controller links.
//!
//! A transport (serial port, BLE characteristic, WebSocket) hands received
//! bytes to an [`Endpoint`], whose [`Envelope`] turns them into routed
//! [`Message`]s. Outbound messages queue on the same endpoint and are encoded
//! when the transport is ready. The [`EndpointManager`] owns the endpoints,
//! assigns channel ids and runs the cooperative service loop.

pub mod config;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod manager;
pub mod message;
pub mod queue;

pub use config::{EndpointSettings, EnvelopeSettings, DEFAULT_BLOCK_MAX, DEFAULT_QUEUE_MAX_LEN};
pub use endpoint::{
    Endpoint, EndpointConfig, EndpointInfo, EndpointStats, InboundMode, MessageHandler,
    ReadyCheck, WireAlphabet,
};
pub use envelope::{Envelope, EnvelopeKind, EnvelopeStats, RicFrame, RicJson, RicSerial};
pub use error::{ConfigError, EndpointError, EnvelopeError, QueueError, Result};
pub use manager::{ChannelSpec, EndpointManager, MAX_INBOUND_MSGS_IN_LOOP};
pub use message::{
    decode_header, encode_header, protocol, ChannelId, Header, Message, MessageType,
    RawByteMessage, CHANNEL_ID_ALL, HEADER_SIZE,
};
pub use queue::{BoundedQueue, QueueStats, DEFAULT_LOCK_TIMEOUT};
