//! # IPM
//!
//! Inter-process messaging for data acquisition modules: senders, receivers
//! and topic subscribers that deliver opaque payloads tagged with a metadata
//! string, under a caller-chosen timeout.
//!
//! ## Architecture
//!
//! - **`ipm-core`**: contracts, bounded retry engine, framing, registry, in-process transport
//! - **Transport crates**: concrete primitives plugged in by name
//! - **`ipm`**: Public API surface (this crate)
//!
//! ## Transports
//!
//! The in-process transport is always available. Others are gated behind
//! feature flags:
//!
//! - **`zmq`** - ZeroMQ through libzmq
//!
//! ```toml
//! [dependencies]
//! ipm = { version = "0.1", features = ["zmq"] }
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use ipm::prelude::*;
//!
//! # fn main() -> ipm::Result<()> {
//! let mut receiver = ipm::make_receiver("InprocReceiver")?;
//! receiver.connect_for_receives(ConnectionInfo::new("inproc://quick-start"))?;
//!
//! let mut sender = ipm::make_sender("InprocSender")?;
//! sender.connect_for_sends(ConnectionInfo::new("inproc://quick-start"))?;
//!
//! sender.send(Fragment::from("hello"), Timeout::from_millis(100), "greeting")?;
//! let msg = receiver.receive(Timeout::from_millis(100), None)?;
//! assert_eq!(&msg.data[..], b"hello");
//! assert_eq!(msg.metadata, "greeting");
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration-driven endpoints
//!
//! ```rust
//! use ipm::config::EndpointConfig;
//! use ipm::prelude::*;
//!
//! # fn main() -> ipm::Result<()> {
//! let config = EndpointConfig::from_json(r#"{
//!     "plugin": "InprocSubscriber",
//!     "connection_info": { "connection_string": "inproc://config-docs" },
//!     "topics": ["run."]
//! }"#)?;
//! let subscriber = config.make_subscriber()?;
//! assert!(subscriber.can_receive());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dev_tracing;
mod plugins;

// Re-export core types
pub use bytes::Bytes;
pub use ipm_core::error::{IpmError, Result};
pub use ipm_core::{
    codec, endpoint, inproc, message, options, receiver, registry, retry, sender, subscriber,
    subscription, timeout, transport,
};
pub use plugins::{make_receiver, make_sender, make_subscriber, registry};

/// ZeroMQ transport plugin.
#[cfg(feature = "zmq")]
pub use ipm_zmq as zmq;

/// Convenient imports.
pub mod prelude {
    pub use crate::config::EndpointConfig;
    pub use ipm_core::prelude::*;
}
