//! Sender contract and its transport-backed implementation.

use tracing::{debug, trace};

use crate::config::ConnectionInfo;
use crate::error::{IpmError, Result};
use crate::message::Fragment;
use crate::options::EndpointOptions;
use crate::retry::{self, RetryPolicy};
use crate::timeout::Timeout;
use crate::transport::SendTransport;

/// Sending endpoint.
///
/// Implementors provide readiness, connection and [`Sender::send_parts`];
/// the argument and readiness checks in [`Sender::send`] and
/// [`Sender::send_multipart`] are shared by every implementation.
///
/// An endpoint is meant for one caller at a time. Move it to the thread that
/// drives it rather than sharing it.
pub trait Sender: Send {
    /// Non-blocking readiness query. No side effects.
    fn can_send(&self) -> bool;

    /// Bind or connect the underlying transport. Readiness becomes true on
    /// the first success and never reverts on its own.
    fn connect_for_sends(&mut self, connection_info: ConnectionInfo) -> Result<()>;

    /// Deliver already-validated, non-empty payload parts as one message.
    ///
    /// Called only while ready, with at least one part.
    fn send_parts(&mut self, parts: &[&[u8]], timeout: Timeout, metadata: &str) -> Result<()>;

    /// Send one payload tagged with `metadata`.
    ///
    /// # Errors
    ///
    /// - [`IpmError::KnownStateForbidsSend`] if not ready, whatever the payload
    /// - [`IpmError::NullPointerPassedToSend`] for a bufferless fragment with a nonzero length
    /// - [`IpmError::SendTimeoutExpired`] if the transport did not take the message in time
    ///
    /// A zero-length payload is a silent no-op: the transport is not touched.
    fn send(&mut self, payload: Fragment<'_>, timeout: Timeout, metadata: &str) -> Result<()> {
        if !self.can_send() {
            return Err(IpmError::KnownStateForbidsSend);
        }

        let bytes = payload
            .as_bytes()
            .ok_or(IpmError::NullPointerPassedToSend)?;
        if bytes.is_empty() {
            trace!("[IPM] zero-length send on \"{}\" ignored", metadata);
            return Ok(());
        }

        self.send_parts(&[bytes], timeout, metadata)
    }

    /// Send several payload fragments as one message sharing one metadata frame
    /// and one timeout budget.
    ///
    /// An empty fragment list is a silent no-op, checked before readiness.
    /// Zero-length fragments carry no bytes and are skipped. Every fragment is
    /// validated before any frame is handed to the transport.
    fn send_multipart(
        &mut self,
        fragments: &[Fragment<'_>],
        timeout: Timeout,
        metadata: &str,
    ) -> Result<()> {
        if fragments.is_empty() {
            return Ok(());
        }

        if !self.can_send() {
            return Err(IpmError::KnownStateForbidsSend);
        }

        let mut parts = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let bytes = fragment
                .as_bytes()
                .ok_or(IpmError::NullPointerPassedToSend)?;
            if !bytes.is_empty() {
                parts.push(bytes);
            }
        }

        if parts.is_empty() {
            trace!("[IPM] multipart send of empty fragments on \"{}\" ignored", metadata);
            return Ok(());
        }

        self.send_parts(&parts, timeout, metadata)
    }
}

/// A [`Sender`] over any [`SendTransport`], driven by the bounded retry engine.
pub struct TransportSender<T> {
    transport: T,
    options: EndpointOptions,
    policy: RetryPolicy,
    ready: bool,
}

impl<T: SendTransport> TransportSender<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, EndpointOptions::default())
    }

    pub fn with_options(transport: T, options: EndpointOptions) -> Self {
        let policy = RetryPolicy::from_options(&options);
        Self {
            transport,
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

impl<T: SendTransport> Sender for TransportSender<T> {
    fn can_send(&self) -> bool {
        self.ready
    }

    fn connect_for_sends(&mut self, connection_info: ConnectionInfo) -> Result<()> {
        let options = self.options.merged_with(&connection_info)?;
        debug!(
            "[IPM] connecting sender to {}",
            connection_info.connection_string
        );
        self.transport.connect(&connection_info, &options)?;

        self.policy = RetryPolicy::from_options(&options);
        self.options = options;
        self.ready = true;
        Ok(())
    }

    fn send_parts(&mut self, parts: &[&[u8]], timeout: Timeout, metadata: &str) -> Result<()> {
        retry::send_with_retry(&mut self.transport, metadata, parts, timeout, &self.policy)
    }
}
