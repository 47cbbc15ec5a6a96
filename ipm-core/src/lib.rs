//! IPM Core
//!
//! Transport-independent building blocks of the inter-process messaging layer:
//! - Sender / Receiver / Subscriber contracts (`sender`, `receiver`, `subscriber`)
//! - Bounded retry engine over non-blocking transport primitives (`retry`, `transport`)
//! - Two-frame message framing (`codec`)
//! - Name-keyed endpoint factories (`registry`)
//! - In-process transport (`inproc`)
//! - Connection info, options, timeouts and error types

#![deny(unsafe_code)]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod inproc;
pub mod message;
pub mod options;
pub mod receiver;
pub mod registry;
pub mod retry;
pub mod sender;
pub mod subscriber;
pub mod subscription;
pub mod timeout;
pub mod transport;

// Keep it minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::config::ConnectionInfo;
    pub use crate::endpoint::Endpoint;
    pub use crate::error::IpmError;
    pub use crate::message::{Fragment, Response};
    pub use crate::options::EndpointOptions;
    pub use crate::receiver::{Receiver, TransportReceiver};
    pub use crate::registry::{EndpointKind, Registry};
    pub use crate::sender::{Sender, TransportSender};
    pub use crate::subscriber::{Subscriber, TransportSubscriber};
    pub use crate::subscription::SubscriptionSet;
    pub use crate::timeout::Timeout;
    pub use crate::transport::{Frame, RecvTransport, SendTransport, SubscribeTransport};
}
