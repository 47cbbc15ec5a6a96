//! Configuration-driven endpoint construction.
//!
//! A module's configuration names the plugin to use, where to connect, and
//! for subscribers which topics to follow. [`EndpointConfig`] turns such a
//! record into a connected endpoint.

use ipm_core::config::ConnectionInfo;
use ipm_core::error::Result;
use ipm_core::receiver::Receiver;
use ipm_core::registry::Registry;
use ipm_core::sender::Sender;
use ipm_core::subscriber::Subscriber;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::plugins::registry;

/// One endpoint's configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Registry name of the plugin, e.g. `"ZmqSubscriber"`.
    pub plugin: String,

    /// Passed verbatim to `connect_for_sends` / `connect_for_receives`.
    #[serde(default)]
    pub connection_info: ConnectionInfo,

    /// Topics to subscribe before connecting. Only used by subscribers.
    #[serde(default)]
    pub topics: Vec<String>,
}

impl EndpointConfig {
    /// Config for `plugin` with default connection info and no topics.
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            connection_info: ConnectionInfo::default(),
            topics: Vec::new(),
        }
    }

    /// Replace the connection info.
    #[must_use]
    pub fn with_connection_info(mut self, connection_info: ConnectionInfo) -> Self {
        self.connection_info = connection_info;
        self
    }

    /// Add a topic to subscribe to.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.push(topic.into());
        self
    }

    /// Parse from a JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build and connect a sender through the process-wide registry.
    pub fn make_sender(&self) -> Result<Box<dyn Sender>> {
        self.make_sender_in(registry())
    }

    /// Build and connect a receiver through the process-wide registry.
    pub fn make_receiver(&self) -> Result<Box<dyn Receiver>> {
        self.make_receiver_in(registry())
    }

    /// Build a subscriber through the process-wide registry, subscribe to the
    /// configured topics, then connect.
    pub fn make_subscriber(&self) -> Result<Box<dyn Subscriber>> {
        self.make_subscriber_in(registry())
    }

    /// Like [`EndpointConfig::make_sender`] with an explicit registry.
    pub fn make_sender_in(&self, registry: &Registry) -> Result<Box<dyn Sender>> {
        let mut sender = registry.make_sender(&self.plugin)?;
        debug!("[IPM] configuring sender \"{}\"", self.plugin);
        sender.connect_for_sends(self.connection_info.clone())?;
        Ok(sender)
    }

    /// Like [`EndpointConfig::make_receiver`] with an explicit registry.
    pub fn make_receiver_in(&self, registry: &Registry) -> Result<Box<dyn Receiver>> {
        let mut receiver = registry.make_receiver(&self.plugin)?;
        debug!("[IPM] configuring receiver \"{}\"", self.plugin);
        receiver.connect_for_receives(self.connection_info.clone())?;
        Ok(receiver)
    }

    /// Like [`EndpointConfig::make_subscriber`] with an explicit registry.
    pub fn make_subscriber_in(&self, registry: &Registry) -> Result<Box<dyn Subscriber>> {
        let mut subscriber = registry.make_subscriber(&self.plugin)?;
        debug!(
            "[IPM] configuring subscriber \"{}\" with {} topics",
            self.plugin,
            self.topics.len()
        );
        for topic in &self.topics {
            subscriber.subscribe(topic)?;
        }
        subscriber.connect_for_receives(self.connection_info.clone())?;
        Ok(subscriber)
    }
}
