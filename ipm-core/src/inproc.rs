//! In-process transport.
//!
//! Endpoints in the same process exchange whole multipart messages over
//! channels, so multi-frame delivery is atomic by construction. Sending sides
//! bind an `inproc://name`; receiving sides connect to it, before or after
//! the bind.
//!
//! - PUSH (`InprocSender`): round-robin over connected receivers. A message
//!   waits (the send attempt fails) while no receiver is connected or the
//!   chosen receiver is at its high water mark.
//! - PUB (`InprocPublisher`): fan-out to every connected subscriber whose
//!   subscription set matches the first frame. Never waits; subscribers at
//!   their high water mark miss the message.
//!
//! Names are scoped to an [`InprocContext`]. [`InprocContext::global`] is the
//! process-wide one; tests create isolated contexts with
//! [`InprocContext::new`].
//!
//! # Usage
//!
//! ```rust
//! use ipm_core::prelude::*;
//! use ipm_core::inproc::{self, InprocContext};
//!
//! # fn main() -> ipm_core::error::Result<()> {
//! let ctx = InprocContext::new();
//! let mut publisher = inproc::publisher(&ctx);
//! let mut subscriber = inproc::subscriber(&ctx);
//!
//! publisher.connect_for_sends(ConnectionInfo::new("inproc://events"))?;
//! subscriber.connect_for_receives(ConnectionInfo::new("inproc://events"))?;
//! subscriber.subscribe("run.")?;
//!
//! publisher.send(Fragment::from("started"), Timeout::NO_BLOCK, "run.42")?;
//! let msg = subscriber.receive(Timeout::from_millis(100), None)?;
//! assert_eq!(msg.metadata, "run.42");
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use flume::TryRecvError;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::config::ConnectionInfo;
use crate::endpoint::{Endpoint, EndpointError};
use crate::error::{IpmError, Result};
use crate::options::EndpointOptions;
use crate::receiver::TransportReceiver;
use crate::sender::TransportSender;
use crate::subscriber::TransportSubscriber;
use crate::subscription::SubscriptionSet;
use crate::transport::{Frame, RecvTransport, SendTransport, SubscribeTransport};

/// Message type for inproc transport (multipart message)
pub type InprocMessage = Vec<Bytes>;

type SharedFilter = Arc<RwLock<SubscriptionSet>>;

/// PUSH-style sender over the inproc transport.
pub type InprocSender = TransportSender<InprocSendTransport>;
/// PUB-style sender over the inproc transport.
pub type InprocPublisher = TransportSender<InprocSendTransport>;
/// PULL-style receiver over the inproc transport.
pub type InprocReceiver = TransportReceiver<InprocRecvTransport>;
/// SUB-style subscriber over the inproc transport.
pub type InprocSubscriber = TransportSubscriber<InprocRecvTransport>;

static GLOBAL_CONTEXT: Lazy<InprocContext> = Lazy::new(InprocContext::new);

/// Namespace of inproc endpoint names.
///
/// Cheap to clone; clones share the same namespace.
#[derive(Clone, Default)]
pub struct InprocContext {
    hubs: Arc<DashMap<String, Arc<Hub>>>,
}

impl InprocContext {
    /// Create an isolated namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide namespace, created on first use.
    pub fn global() -> &'static InprocContext {
        &GLOBAL_CONTEXT
    }

    /// Names currently bound in this namespace, sorted.
    pub fn bound_endpoints(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .hubs
            .iter()
            .filter(|entry| entry.value().bound.load(Ordering::Acquire))
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Run `f` on the hub for `name`, creating it if needed.
    ///
    /// The map entry stays locked while `f` runs, so a concurrent
    /// [`InprocContext::release`] cannot drop a hub that is being joined.
    fn with_hub<R>(&self, name: &str, f: impl FnOnce(&Arc<Hub>) -> R) -> R {
        let entry = self
            .hubs
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Hub::default()));
        f(entry.value())
    }

    /// Forget `name` once nothing binds it and no live receiver waits on it.
    fn release(&self, name: &str) {
        if self.hubs.remove_if(name, |_, hub| hub.is_idle()).is_some() {
            trace!("[INPROC] released inproc://{}", name);
        }
    }
}

/// Rendezvous point for one inproc name.
#[derive(Default)]
struct Hub {
    bound: AtomicBool,
    pull_peers: Mutex<Vec<Peer>>,
    sub_peers: Mutex<Vec<Peer>>,
    next_peer: AtomicUsize,
}

impl Hub {
    fn prune(&self) {
        self.pull_peers.lock().retain(|peer| !peer.tx.is_disconnected());
        self.sub_peers.lock().retain(|peer| !peer.tx.is_disconnected());
    }

    /// Unbound with no live peers. Prunes dropped receivers first.
    fn is_idle(&self) -> bool {
        self.prune();
        !self.bound.load(Ordering::Acquire)
            && self.pull_peers.lock().is_empty()
            && self.sub_peers.lock().is_empty()
    }
}

struct Peer {
    tx: flume::Sender<InprocMessage>,
    hwm: usize,
    filter: Option<SharedFilter>,
}

impl Peer {
    /// A high water mark of zero means no limit on that side.
    fn has_room(&self, send_hwm: usize) -> bool {
        let limit = match (self.hwm, send_hwm) {
            (0, 0) => return true,
            (0, hwm) | (hwm, 0) => hwm,
            (recv, send) => recv.min(send),
        };
        self.tx.len() < limit
    }
}

fn inproc_name(info: &ConnectionInfo) -> Result<String> {
    let endpoint = info.endpoint()?;
    match endpoint {
        Endpoint::Inproc(name) => Ok(name),
        other => Err(EndpointError::UnsupportedScheme {
            scheme: other.scheme(),
            endpoint: info.connection_string.clone(),
        }
        .into()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendMode {
    Push,
    Pub,
}

/// Sending side: binds the endpoint name.
pub struct InprocSendTransport {
    ctx: InprocContext,
    mode: SendMode,
    bound: Option<(String, Arc<Hub>)>,
    send_hwm: usize,
    staged: InprocMessage,
    target: Option<flume::Sender<InprocMessage>>,
}

impl InprocSendTransport {
    /// Round-robin PUSH sender.
    pub fn push(ctx: &InprocContext) -> Self {
        Self::new(ctx, SendMode::Push)
    }

    /// Fan-out PUB sender.
    pub fn publish(ctx: &InprocContext) -> Self {
        Self::new(ctx, SendMode::Pub)
    }

    fn new(ctx: &InprocContext, mode: SendMode) -> Self {
        Self {
            ctx: ctx.clone(),
            mode,
            bound: None,
            send_hwm: EndpointOptions::default().send_hwm,
            staged: Vec::new(),
            target: None,
        }
    }

    fn hub(&self) -> Result<&Arc<Hub>> {
        self.bound
            .as_ref()
            .map(|(_, hub)| hub)
            .ok_or_else(|| IpmError::transport("inproc sender is not bound"))
    }

    /// Pick the next PUSH peer with room, pruning peers whose receiver is gone.
    fn pick_peer(&self) -> Result<Option<flume::Sender<InprocMessage>>> {
        let hub = self.hub()?;
        let mut peers = hub.pull_peers.lock();
        peers.retain(|peer| !peer.tx.is_disconnected());
        if peers.is_empty() {
            return Ok(None);
        }

        let start = hub.next_peer.fetch_add(1, Ordering::Relaxed);
        let chosen = (0..peers.len())
            .map(|offset| &peers[(start + offset) % peers.len()])
            .find(|peer| peer.has_room(self.send_hwm))
            .map(|peer| peer.tx.clone());
        Ok(chosen)
    }

    fn publish_staged(&self, message: InprocMessage) -> Result<()> {
        let hub = self.hub()?;
        let topic = message.first().cloned().unwrap_or_default();
        let mut peers = hub.sub_peers.lock();
        peers.retain(|peer| !peer.tx.is_disconnected());

        for peer in peers.iter() {
            let wanted = peer
                .filter
                .as_ref()
                .map_or(false, |filter| filter.read().matches(&topic));
            if !wanted {
                continue;
            }
            if !peer.has_room(self.send_hwm) {
                trace!("[INPROC] subscriber at high water mark, dropping message");
                continue;
            }
            // A peer that disconnected since the retain is pruned next time.
            let _ = peer.tx.send(message.clone());
        }
        Ok(())
    }
}

impl SendTransport for InprocSendTransport {
    fn connect(&mut self, info: &ConnectionInfo, options: &EndpointOptions) -> Result<()> {
        let name = inproc_name(info)?;
        let hub = self.ctx.with_hub(&name, |hub| {
            if hub.bound.swap(true, Ordering::AcqRel) {
                Err(EndpointError::AlreadyBound(name.clone()))
            } else {
                Ok(hub.clone())
            }
        })?;

        debug!("[INPROC] {:?} bound to inproc://{}", self.mode, name);
        self.send_hwm = options.send_hwm;
        self.staged.clear();
        // One binding per sender; a new name releases the old one.
        if let Some((old_name, old_hub)) = self.bound.replace((name, hub)) {
            old_hub.bound.store(false, Ordering::Release);
            debug!("[INPROC] unbound inproc://{}", old_name);
            self.ctx.release(&old_name);
        }
        Ok(())
    }

    fn try_send_frame(&mut self, frame: &[u8], more: bool) -> Result<bool> {
        if self.staged.is_empty() && self.mode == SendMode::Push {
            match self.pick_peer()? {
                Some(tx) => self.target = Some(tx),
                None => return Ok(false),
            }
        } else {
            self.hub()?;
        }

        self.staged.push(Bytes::copy_from_slice(frame));
        if more {
            return Ok(true);
        }

        let message = std::mem::take(&mut self.staged);
        match self.mode {
            SendMode::Push => {
                if let Some(tx) = self.target.take() {
                    if tx.send(message).is_err() {
                        warn!("[INPROC] receiver disconnected mid-send, message dropped");
                    }
                }
            }
            SendMode::Pub => self.publish_staged(message)?,
        }
        Ok(true)
    }
}

impl Drop for InprocSendTransport {
    fn drop(&mut self) {
        if let Some((name, hub)) = self.bound.take() {
            hub.bound.store(false, Ordering::Release);
            debug!("[INPROC] unbound inproc://{}", name);
            self.ctx.release(&name);
        }
    }
}

/// Receiving side: connects to an endpoint name.
pub struct InprocRecvTransport {
    ctx: InprocContext,
    filter: Option<SharedFilter>,
    connected: Option<String>,
    rx: Option<flume::Receiver<InprocMessage>>,
    pending: VecDeque<Bytes>,
}

impl InprocRecvTransport {
    /// PULL receiver: takes its share of a PUSH sender's messages.
    pub fn pull(ctx: &InprocContext) -> Self {
        Self::new(ctx, None)
    }

    /// SUB receiver: gets matching messages from a PUB sender.
    pub fn sub(ctx: &InprocContext) -> Self {
        Self::new(ctx, Some(Arc::new(RwLock::new(SubscriptionSet::new()))))
    }

    fn new(ctx: &InprocContext, filter: Option<SharedFilter>) -> Self {
        Self {
            ctx: ctx.clone(),
            filter,
            connected: None,
            rx: None,
            pending: VecDeque::new(),
        }
    }

    fn filter(&self) -> Result<&SharedFilter> {
        self.filter
            .as_ref()
            .ok_or_else(|| IpmError::transport("inproc PULL receiver has no topic filter"))
    }

    /// Drop the current channel and let the hub forget this receiver.
    fn disconnect(&mut self) {
        self.rx = None;
        self.pending.clear();
        if let Some(name) = self.connected.take() {
            self.ctx.release(&name);
        }
    }
}

impl RecvTransport for InprocRecvTransport {
    fn connect(&mut self, info: &ConnectionInfo, options: &EndpointOptions) -> Result<()> {
        let name = inproc_name(info)?;
        let (tx, rx) = flume::unbounded();
        let peer = Peer {
            tx,
            hwm: options.recv_hwm,
            filter: self.filter.clone(),
        };

        self.ctx.with_hub(&name, |hub| {
            hub.prune();
            if peer.filter.is_some() {
                hub.sub_peers.lock().push(peer);
            } else {
                hub.pull_peers.lock().push(peer);
            }
        });

        // Reconnecting replaces the previous channel; its peer goes away.
        self.disconnect();
        debug!("[INPROC] connected to inproc://{}", name);
        self.connected = Some(name);
        self.rx = Some(rx);
        Ok(())
    }

    fn try_recv_frame(&mut self) -> Result<Option<Frame>> {
        if self.pending.is_empty() {
            let Some(rx) = self.rx.as_ref() else {
                return Ok(None);
            };
            match rx.try_recv() {
                Ok(message) => self.pending = message.into(),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return Ok(None),
            }
        }

        Ok(self.pending.pop_front().map(|data| Frame {
            data,
            more: !self.pending.is_empty(),
        }))
    }
}

impl Drop for InprocRecvTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl SubscribeTransport for InprocRecvTransport {
    fn subscribe(&mut self, topic: &[u8]) -> Result<()> {
        let topic = String::from_utf8_lossy(topic);
        self.filter()?.write().subscribe(&topic);
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &[u8]) -> Result<()> {
        let topic = String::from_utf8_lossy(topic);
        self.filter()?.write().unsubscribe(&topic);
        Ok(())
    }
}

/// Unconnected PUSH-style sender in `ctx`.
pub fn sender(ctx: &InprocContext) -> InprocSender {
    TransportSender::new(InprocSendTransport::push(ctx))
}

/// Unconnected PUB-style sender in `ctx`.
pub fn publisher(ctx: &InprocContext) -> InprocPublisher {
    TransportSender::new(InprocSendTransport::publish(ctx))
}

/// Unconnected PULL-style receiver in `ctx`.
pub fn receiver(ctx: &InprocContext) -> InprocReceiver {
    TransportReceiver::new(InprocRecvTransport::pull(ctx))
}

/// Unconnected SUB-style subscriber in `ctx`.
pub fn subscriber(ctx: &InprocContext) -> InprocSubscriber {
    TransportReceiver::new(InprocRecvTransport::sub(ctx))
}
