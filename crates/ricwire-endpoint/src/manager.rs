//! Channel registry and service loop.
//!
//! Channel ids are arena indices: stable for the life of the channel and
//! never reused after [`EndpointManager::unregister_channel`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EnvelopeSettings;
use crate::endpoint::{Endpoint, EndpointConfig, EndpointInfo, ReadyCheck};
use crate::envelope::{Envelope, EnvelopeKind};
use crate::error::{EndpointError, Result};
use crate::message::{ChannelId, Message, CHANNEL_ID_ALL};

/// Inbound blocks decoded per endpoint per [`EndpointManager::service`] call.
pub const MAX_INBOUND_MSGS_IN_LOOP: usize = 10;

/// What to build when registering a channel.
pub struct ChannelSpec {
    pub protocol: String,
    pub interface: String,
    pub channel: String,
    pub config: EndpointConfig,
    ready: Option<ReadyCheck>,
}

impl ChannelSpec {
    pub fn new(
        protocol: impl Into<String>,
        interface: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            interface: interface.into(),
            channel: channel.into(),
            config: EndpointConfig::default(),
            ready: None,
        }
    }

    pub fn with_config(mut self, config: EndpointConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_ready_check(
        mut self,
        ready: impl Fn(ChannelId) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.ready = Some(Box::new(ready));
        self
    }
}

impl std::fmt::Debug for ChannelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSpec")
            .field("protocol", &self.protocol)
            .field("interface", &self.interface)
            .field("channel", &self.channel)
            .field("config", &self.config)
            .field("ready", &self.ready.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct EndpointManager {
    protocols: HashMap<EnvelopeKind, EnvelopeSettings>,
    slots: Vec<Option<Arc<Endpoint>>>,
}

impl EndpointManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the envelope recipe for `kind`.
    pub fn add_protocol(&mut self, kind: EnvelopeKind, settings: EnvelopeSettings) {
        info!(protocol = %kind, "protocol registered");
        self.protocols.insert(kind, settings);
    }

    /// Create an endpoint for `spec`, attach its envelope and return the new
    /// channel id.
    pub fn register_channel(
        &mut self,
        spec: ChannelSpec,
        handler: impl FnMut(Message) + Send + 'static,
    ) -> Result<ChannelId> {
        let kind: EnvelopeKind = spec
            .protocol
            .parse()
            .map_err(|_| EndpointError::UnknownProtocol(spec.protocol.clone()))?;
        let settings = self
            .protocols
            .get(&kind)
            .ok_or_else(|| EndpointError::UnknownProtocol(spec.protocol.clone()))?;

        let channel_id = ChannelId::try_from(self.slots.len())
            .ok()
            .filter(|&id| id < CHANNEL_ID_ALL)
            .ok_or(EndpointError::ChannelIdsExhausted {
                limit: CHANNEL_ID_ALL,
            })?;

        let mut endpoint = Endpoint::new(channel_id, spec.config)
            .with_names(kind.name(), &spec.interface, &spec.channel)
            .with_handler(handler);
        if let Some(ready) = spec.ready {
            endpoint = endpoint.with_ready_check(ready);
        }
        endpoint.attach_envelope(Envelope::create(kind, channel_id, settings))?;

        info!(
            channel_id,
            protocol = %kind,
            interface = %spec.interface,
            channel = %spec.channel,
            "channel registered"
        );
        self.slots.push(Some(Arc::new(endpoint)));
        Ok(channel_id)
    }

    /// Free the channel's slot. Returns the endpoint if it existed.
    pub fn unregister_channel(&mut self, channel_id: ChannelId) -> Option<Arc<Endpoint>> {
        let removed = self
            .slots
            .get_mut(channel_id as usize)
            .and_then(Option::take);
        if removed.is_some() {
            info!(channel_id, "channel unregistered");
        }
        removed
    }

    pub fn endpoint(&self, channel_id: ChannelId) -> Option<&Arc<Endpoint>> {
        self.slots.get(channel_id as usize)?.as_ref()
    }

    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.endpoints().map(|ep| ep.channel_id()).collect()
    }

    fn endpoints(&self) -> impl Iterator<Item = &Arc<Endpoint>> {
        self.slots.iter().flatten()
    }

    /// First channel on `interface` speaking `protocol`, compared
    /// case-insensitively.
    pub fn lookup_channel_id(&self, interface: &str, protocol: &str) -> Option<ChannelId> {
        self.endpoints()
            .find(|ep| {
                ep.interface_name().eq_ignore_ascii_case(interface)
                    && ep.protocol_name().eq_ignore_ascii_case(protocol)
            })
            .map(|ep| ep.channel_id())
    }

    pub fn can_accept_inbound(&self, channel_id: ChannelId) -> bool {
        self.endpoint(channel_id)
            .is_some_and(|ep| ep.can_accept_inbound())
    }

    pub fn can_accept_outbound(&self, channel_id: ChannelId) -> bool {
        self.endpoint(channel_id)
            .is_some_and(|ep| ep.can_accept_outbound())
    }

    /// Inbound block size for the channel, or `default` if it is unknown.
    pub fn inbound_block_max(&self, channel_id: ChannelId, default: usize) -> usize {
        self.endpoint(channel_id)
            .map_or(default, |ep| ep.inbound_block_max())
    }

    /// Bytes received on `channel_id`.
    pub fn handle_inbound(&self, channel_id: ChannelId, data: &[u8]) {
        match self.endpoint(channel_id) {
            Some(ep) => ep.submit_inbound(data),
            None => warn!(channel_id, len = data.len(), "inbound for unknown channel"),
        }
    }

    /// Queue `msg` on its channel, or on every channel for
    /// [`CHANNEL_ID_ALL`].
    pub fn handle_outbound(&self, msg: Message) {
        if msg.channel_id == CHANNEL_ID_ALL {
            for ep in self.endpoints() {
                ep.submit_outbound(Message {
                    channel_id: ep.channel_id(),
                    ..msg.clone()
                });
            }
            return;
        }
        match self.endpoint(msg.channel_id) {
            Some(ep) => ep.submit_outbound(msg),
            None => warn!(
                channel_id = msg.channel_id,
                sequence = msg.sequence,
                "outbound for unknown channel"
            ),
        }
    }

    /// One cooperative tick over every endpoint.
    ///
    /// Sends at most one outbound message per ready endpoint through
    /// `transmit`, then decodes up to [`MAX_INBOUND_MSGS_IN_LOOP`] queued
    /// inbound blocks.
    pub fn service(&self, mut transmit: impl FnMut(ChannelId, Message)) {
        for ep in self.endpoints() {
            if ep.can_accept_outbound() {
                if let Some(wire) = ep.pump_outbound_queue() {
                    debug!(
                        channel_id = ep.channel_id(),
                        len = wire.payload.len(),
                        "transmitting"
                    );
                    transmit(ep.channel_id(), wire);
                }
            }
            for _ in 0..MAX_INBOUND_MSGS_IN_LOOP {
                if !ep.pump_inbound_queue() {
                    break;
                }
            }
        }
    }

    /// Every endpoint's [`EndpointInfo`] as a JSON array.
    pub fn info_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.endpoints()
                .filter_map(|ep| serde_json::to_value(ep.info()).ok())
                .collect(),
        )
    }

    pub fn info(&self) -> Vec<EndpointInfo> {
        self.endpoints().map(|ep| ep.info()).collect()
    }
}
