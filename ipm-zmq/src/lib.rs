//! # IPM ZeroMQ
//!
//! ZeroMQ transport plugin for IPM, built on libzmq through the `zmq` crate.
//!
//! ## Overview
//!
//! Four endpoint flavours, all driven by the bounded retry engine of
//! `ipm-core`:
//! - **ZmqSender** (PUSH): binds, round-robins messages to connected receivers
//! - **ZmqReceiver** (PULL): connects, takes its share of a sender's messages
//! - **ZmqPublisher** (PUB): binds, broadcasts to matching subscribers
//! - **ZmqSubscriber** (SUB): connects, filters on the metadata frame prefix
//!
//! Sending sides bind and receiving sides connect, so a receiver may be
//! started before its sender.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ipm_core::prelude::*;
//!
//! # fn main() -> ipm_core::error::Result<()> {
//! let mut receiver = ipm_zmq::receiver();
//! receiver.connect_for_receives(ConnectionInfo::new("tcp://127.0.0.1:5555"))?;
//!
//! let mut sender = ipm_zmq::sender();
//! sender.connect_for_sends(ConnectionInfo::new("tcp://*:5555"))?;
//!
//! sender.send(Fragment::from("hello"), Timeout::from_millis(1000), "greeting")?;
//! let msg = receiver.receive(Timeout::from_millis(1000), None)?;
//! assert_eq!(msg.metadata, "greeting");
//! # Ok(())
//! # }
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod context;
mod recv;
mod send;
mod utils;

use ipm_core::error::Result;
use ipm_core::receiver::TransportReceiver;
use ipm_core::registry::Registry;
use ipm_core::sender::TransportSender;

pub use context::global_context;
pub use recv::ZmqRecvTransport;
pub use send::ZmqSendTransport;

/// PUSH-style sender.
pub type ZmqSender = TransportSender<ZmqSendTransport>;
/// PUB-style sender.
pub type ZmqPublisher = TransportSender<ZmqSendTransport>;
/// PULL-style receiver.
pub type ZmqReceiver = TransportReceiver<ZmqRecvTransport>;
/// SUB-style subscriber.
pub type ZmqSubscriber = TransportReceiver<ZmqRecvTransport>;

/// Plugin name of the PUSH sender.
pub const SENDER_PLUGIN: &str = "ZmqSender";
/// Plugin name of the PULL receiver.
pub const RECEIVER_PLUGIN: &str = "ZmqReceiver";
/// Plugin name of the PUB sender.
pub const PUBLISHER_PLUGIN: &str = "ZmqPublisher";
/// Plugin name of the SUB subscriber.
pub const SUBSCRIBER_PLUGIN: &str = "ZmqSubscriber";

/// Unconnected PUSH sender on the global context.
pub fn sender() -> ZmqSender {
    TransportSender::new(ZmqSendTransport::push(global_context()))
}

/// Unconnected PUB sender on the global context.
pub fn publisher() -> ZmqPublisher {
    TransportSender::new(ZmqSendTransport::publish(global_context()))
}

/// Unconnected PULL receiver on the global context.
pub fn receiver() -> ZmqReceiver {
    TransportReceiver::new(ZmqRecvTransport::pull(global_context()))
}

/// Unconnected SUB subscriber on the global context.
pub fn subscriber() -> ZmqSubscriber {
    TransportReceiver::new(ZmqRecvTransport::sub(global_context()))
}

/// Register the ZeroMQ plugins under their conventional names.
///
/// `ZmqSubscriber` goes into the receiver table as well, so configuration
/// that only needs a receiver can still name it.
pub fn register(registry: &Registry) -> Result<()> {
    registry.register_sender(SENDER_PLUGIN, sender)?;
    registry.register_sender(PUBLISHER_PLUGIN, publisher)?;
    registry.register_receiver(RECEIVER_PLUGIN, receiver)?;
    registry.register_receiver(SUBSCRIBER_PLUGIN, subscriber)?;
    registry.register_subscriber(SUBSCRIBER_PLUGIN, subscriber)?;
    Ok(())
}
