//! JSON settings for envelopes and endpoints.
//!
//! Key names match the controller's configuration documents so existing
//! config files load unchanged. Every key is optional.

use std::time::Duration;

use ricwire_frame::{CrcOrder, HdlcConfig, StuffingMode};
use serde::Deserialize;

use crate::endpoint::{EndpointConfig, InboundMode, WireAlphabet};
use crate::error::ConfigError;

/// Queue length used when a configured length is zero.
pub const DEFAULT_QUEUE_MAX_LEN: usize = 20;

/// Block size hint used when a configured block max is zero.
pub const DEFAULT_BLOCK_MAX: usize = 5000;

/// Settings for one envelope (protocol recipe).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct EnvelopeSettings {
    pub max_rx_msg_len: usize,
    pub max_tx_msg_len: usize,
    pub frame_bound: u8,
    pub ctrl_escape: u8,
    pub crc_big_endian: bool,
    pub bit_wise: bool,
    pub leading_boundary: bool,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            max_rx_msg_len: ricwire_frame::DEFAULT_MAX_RX_LEN,
            max_tx_msg_len: ricwire_frame::DEFAULT_MAX_TX_LEN,
            frame_bound: ricwire_frame::DEFAULT_BOUNDARY_OCTET,
            ctrl_escape: ricwire_frame::DEFAULT_ESCAPE_OCTET,
            crc_big_endian: true,
            bit_wise: false,
            leading_boundary: false,
        }
    }
}

impl EnvelopeSettings {
    /// Parse and validate settings from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_bound == self.ctrl_escape {
            return Err(ConfigError::Invalid(format!(
                "FrameBound and CtrlEscape must differ (both {:#04x})",
                self.frame_bound
            )));
        }
        if self.max_rx_msg_len == 0 || self.max_tx_msg_len == 0 {
            return Err(ConfigError::Invalid(
                "MaxRxMsgLen and MaxTxMsgLen must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Framer configuration for these settings.
    pub fn hdlc_config(&self) -> HdlcConfig {
        HdlcConfig {
            boundary_octet: self.frame_bound,
            escape_octet: self.ctrl_escape,
            crc_order: if self.crc_big_endian {
                CrcOrder::BigEndian
            } else {
                CrcOrder::LittleEndian
            },
            max_rx_len: self.max_rx_msg_len,
            max_tx_len: self.max_tx_msg_len,
            mode: if self.bit_wise {
                StuffingMode::Bit
            } else {
                StuffingMode::Byte
            },
            leading_boundary: self.leading_boundary,
            ..HdlcConfig::default()
        }
    }
}

/// Queue and block-size settings for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct EndpointSettings {
    pub inbound_queue_max_len: usize,
    pub outbound_queue_max_len: usize,
    pub inbound_block_max: usize,
    pub outbound_block_max: usize,
    pub use_inbound_queue: bool,
    pub high_bit_alphabet: bool,
    pub lock_timeout_ms: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            inbound_queue_max_len: 0,
            outbound_queue_max_len: 0,
            inbound_block_max: 0,
            outbound_block_max: 0,
            use_inbound_queue: true,
            high_bit_alphabet: false,
            lock_timeout_ms: 1,
        }
    }
}

fn or_default(value: usize, default: usize) -> usize {
    if value == 0 {
        default
    } else {
        value
    }
}

impl EndpointSettings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve zero values to defaults.
    pub fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig {
            inbound_queue_len: or_default(self.inbound_queue_max_len, DEFAULT_QUEUE_MAX_LEN),
            outbound_queue_len: or_default(self.outbound_queue_max_len, DEFAULT_QUEUE_MAX_LEN),
            inbound_block_max: or_default(self.inbound_block_max, DEFAULT_BLOCK_MAX),
            outbound_block_max: or_default(self.outbound_block_max, DEFAULT_BLOCK_MAX),
            inbound_mode: if self.use_inbound_queue {
                InboundMode::Queued
            } else {
                InboundMode::Direct
            },
            alphabet: if self.high_bit_alphabet {
                WireAlphabet::HighBit
            } else {
                WireAlphabet::Raw
            },
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_defaults_from_empty_object() {
        let settings = EnvelopeSettings::from_json("{}").unwrap();
        assert_eq!(settings, EnvelopeSettings::default());
        assert_eq!(settings.hdlc_config(), HdlcConfig::default());
    }

    #[test]
    fn envelope_controller_keys() {
        let settings = EnvelopeSettings::from_json(
            r#"{"MaxRxMsgLen":1000,"FrameBound":231,"CtrlEscape":215,"CrcBigEndian":false,"BitWise":true}"#,
        )
        .unwrap();
        let config = settings.hdlc_config();
        assert_eq!(config.max_rx_len, 1000);
        assert_eq!(config.max_tx_len, 5000);
        assert_eq!(config.boundary_octet, 0xE7);
        assert_eq!(config.escape_octet, 0xD7);
        assert_eq!(config.crc_order, CrcOrder::LittleEndian);
        assert_eq!(config.mode, StuffingMode::Bit);
    }

    #[test]
    fn envelope_rejects_equal_reserved_octets() {
        let err = EnvelopeSettings::from_json(r#"{"FrameBound":125}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn envelope_rejects_bad_json() {
        let err = EnvelopeSettings::from_json(r#"{"FrameBound":"x"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn endpoint_zero_lengths_use_defaults() {
        let config = EndpointSettings::from_json(r#"{"OutboundQueueMaxLen":3}"#)
            .unwrap()
            .endpoint_config();
        assert_eq!(config.inbound_queue_len, DEFAULT_QUEUE_MAX_LEN);
        assert_eq!(config.outbound_queue_len, 3);
        assert_eq!(config.inbound_block_max, DEFAULT_BLOCK_MAX);
        assert_eq!(config.inbound_mode, InboundMode::Queued);
        assert_eq!(config.alphabet, WireAlphabet::Raw);
        assert_eq!(config.lock_timeout, Duration::from_millis(1));
    }

    #[test]
    fn endpoint_direct_high_bit() {
        let config = EndpointSettings::from_json(r#"{"UseInboundQueue":false,"HighBitAlphabet":true}"#)
            .unwrap()
            .endpoint_config();
        assert_eq!(config.inbound_mode, InboundMode::Direct);
        assert_eq!(config.alphabet, WireAlphabet::HighBit);
    }
}
