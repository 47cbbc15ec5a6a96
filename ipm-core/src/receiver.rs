//! Receiver contract and its transport-backed implementation.

use tracing::debug;

use crate::config::ConnectionInfo;
use crate::error::{IpmError, Result};
use crate::message::Response;
use crate::options::EndpointOptions;
use crate::retry::{self, RetryPolicy};
use crate::subscription::SubscriptionSet;
use crate::timeout::Timeout;
use crate::transport::RecvTransport;

/// Receiving endpoint.
///
/// Implementors provide readiness, connection and
/// [`Receiver::receive_message`]; [`Receiver::receive`] adds the readiness
/// precondition and the payload size check.
pub trait Receiver: Send {
    /// Non-blocking readiness query. No side effects.
    fn can_receive(&self) -> bool;

    /// Bind or connect the underlying transport. Readiness becomes true on
    /// the first success and never reverts on its own.
    fn connect_for_receives(&mut self, connection_info: ConnectionInfo) -> Result<()>;

    /// Wait up to `timeout` for one complete message. Called only while ready.
    fn receive_message(&mut self, timeout: Timeout) -> Result<Response>;

    /// Receive one message.
    ///
    /// `expected_bytes` of `None` accepts any payload size. The size check runs
    /// only after a message was received; it neither extends the timeout nor
    /// retries.
    ///
    /// # Errors
    ///
    /// - [`IpmError::KnownStateForbidsReceive`] if not ready
    /// - [`IpmError::ReceiveTimeoutExpired`] if nothing arrived in time
    /// - [`IpmError::UnexpectedNumberOfBytes`] if the payload size differs from `expected_bytes`
    fn receive(&mut self, timeout: Timeout, expected_bytes: Option<usize>) -> Result<Response> {
        if !self.can_receive() {
            return Err(IpmError::KnownStateForbidsReceive);
        }

        let response = self.receive_message(timeout)?;

        match expected_bytes {
            Some(expected) if response.data.len() != expected => {
                Err(IpmError::UnexpectedNumberOfBytes {
                    received: response.data.len(),
                    expected,
                })
            }
            _ => Ok(response),
        }
    }
}

/// A [`Receiver`] over any [`RecvTransport`], driven by the bounded retry engine.
///
/// When the transport filters by topic this is also a
/// [`Subscriber`](crate::subscriber::Subscriber); the subscription set lives
/// here so subscriptions made before connecting are kept.
pub struct TransportReceiver<T> {
    pub(crate) transport: T,
    pub(crate) subscriptions: SubscriptionSet,
    options: EndpointOptions,
    policy: RetryPolicy,
    ready: bool,
}

impl<T: RecvTransport> TransportReceiver<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, EndpointOptions::default())
    }

    pub fn with_options(transport: T, options: EndpointOptions) -> Self {
        let policy = RetryPolicy::from_options(&options);
        Self {
            transport,
            subscriptions: SubscriptionSet::new(),
            options,
            policy,
            ready: false,
        }
    }

    /// Options in effect (including connection info overrides once connected).
    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: RecvTransport> Receiver for TransportReceiver<T> {
    fn can_receive(&self) -> bool {
        self.ready
    }

    fn connect_for_receives(&mut self, connection_info: ConnectionInfo) -> Result<()> {
        let options = self.options.merged_with(&connection_info)?;
        debug!(
            "[IPM] connecting receiver to {}",
            connection_info.connection_string
        );
        self.transport.connect(&connection_info, &options)?;

        self.policy = RetryPolicy::from_options(&options);
        self.options = options;
        self.ready = true;
        Ok(())
    }

    fn receive_message(&mut self, timeout: Timeout) -> Result<Response> {
        retry::recv_with_retry(&mut self.transport, timeout, &self.policy)
    }
}
