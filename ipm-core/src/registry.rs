//! Name-keyed endpoint factories.
//!
//! Configuration names a transport by string (for example `"ZmqPublisher"`);
//! the registry maps that name to a factory producing a fresh, unconnected
//! endpoint. Senders, receivers and subscribers are kept in three independent
//! tables because a transport may only offer some of the roles.
//!
//! Lookups are exact and case-sensitive. The registry never holds endpoint
//! state: every lookup builds a new instance.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{IpmError, Result};
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::subscriber::Subscriber;

/// Which of the three tables a name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Sender,
    Receiver,
    Subscriber,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
            Self::Subscriber => "subscriber",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

type Factory<E> = Arc<dyn Fn() -> Box<E> + Send + Sync>;

struct Table<E: ?Sized> {
    kind: EndpointKind,
    factories: RwLock<HashMap<String, Factory<E>>>,
}

impl<E: ?Sized> Table<E> {
    fn new(kind: EndpointKind) -> Self {
        Self {
            kind,
            factories: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, name: &str, factory: Factory<E>) -> Result<()> {
        let mut factories = self.factories.write();
        if factories.contains_key(name) {
            return Err(IpmError::PluginAlreadyRegistered {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        factories.insert(name.to_string(), factory);
        debug!("[IPM] registered {} plugin \"{}\"", self.kind, name);
        Ok(())
    }

    fn make(&self, name: &str) -> Result<Box<E>> {
        // Clone the factory out so it runs without holding the lock.
        let factory = self
            .factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| IpmError::PluginNotFound {
                kind: self.kind,
                name: name.to_string(),
            })?;
        Ok(factory())
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Three independent name → factory tables.
///
/// # Examples
///
/// ```
/// use ipm_core::inproc::{self, InprocContext};
/// use ipm_core::registry::Registry;
/// use ipm_core::sender::Sender;
///
/// let ctx = InprocContext::new();
/// let registry = Registry::new();
/// registry
///     .register_sender("InprocSender", move || inproc::sender(&ctx))
///     .unwrap();
///
/// let sender = registry.make_sender("InprocSender").unwrap();
/// assert!(!sender.can_send());
/// assert!(registry.make_sender("inprocsender").is_err());
/// ```
pub struct Registry {
    senders: Table<dyn Sender>,
    receivers: Table<dyn Receiver>,
    subscribers: Table<dyn Subscriber>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            senders: Table::new(EndpointKind::Sender),
            receivers: Table::new(EndpointKind::Receiver),
            subscribers: Table::new(EndpointKind::Subscriber),
        }
    }

    pub fn register_sender<S, F>(&self, name: &str, factory: F) -> Result<()>
    where
        S: Sender + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.senders
            .insert(name, Arc::new(move || Box::new(factory()) as Box<dyn Sender>))
    }

    pub fn register_receiver<R, F>(&self, name: &str, factory: F) -> Result<()>
    where
        R: Receiver + 'static,
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.receivers
            .insert(name, Arc::new(move || Box::new(factory()) as Box<dyn Receiver>))
    }

    pub fn register_subscriber<S, F>(&self, name: &str, factory: F) -> Result<()>
    where
        S: Subscriber + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.subscribers
            .insert(name, Arc::new(move || Box::new(factory()) as Box<dyn Subscriber>))
    }

    /// Fresh, unconnected sender registered under `name`.
    ///
    /// # Errors
    ///
    /// [`IpmError::PluginNotFound`] if nothing is registered under `name`.
    pub fn make_sender(&self, name: &str) -> Result<Box<dyn Sender>> {
        self.senders.make(name)
    }

    /// Fresh, unconnected receiver registered under `name`.
    pub fn make_receiver(&self, name: &str) -> Result<Box<dyn Receiver>> {
        self.receivers.make(name)
    }

    /// Fresh, unconnected subscriber registered under `name`.
    pub fn make_subscriber(&self, name: &str) -> Result<Box<dyn Subscriber>> {
        self.subscribers.make(name)
    }

    /// Registered sender names, sorted
    pub fn sender_names(&self) -> Vec<String> {
        self.senders.names()
    }

    /// Registered receiver names, sorted
    pub fn receiver_names(&self) -> Vec<String> {
        self.receivers.names()
    }

    /// Registered subscriber names, sorted
    pub fn subscriber_names(&self) -> Vec<String> {
        self.subscribers.names()
    }
}
