//! Transport primitive traits.
//!
//! A concrete transport implements only single-frame, non-blocking
//! operations. Readiness, argument validation, framing and the bounded retry
//! loop are layered on top once, in [`crate::sender`] and [`crate::receiver`].
//!
//! Transports must deliver multi-frame messages atomically:
//! - once the first frame of a message has been accepted by
//!   [`SendTransport::try_send_frame`], the remaining frames of that message
//!   are accepted too;
//! - once the first frame of a message has been returned by
//!   [`RecvTransport::try_recv_frame`], the remaining frames are available
//!   immediately.

use bytes::Bytes;

use crate::config::ConnectionInfo;
use crate::error::Result;
use crate::options::EndpointOptions;

/// One transport-level frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Bytes,
    /// More frames of the same message follow
    pub more: bool,
}

impl Frame {
    pub fn new(data: impl Into<Bytes>, more: bool) -> Self {
        Self {
            data: data.into(),
            more,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Sending half of a transport.
pub trait SendTransport: Send {
    /// Bind or connect for sending.
    fn connect(&mut self, info: &ConnectionInfo, options: &EndpointOptions) -> Result<()>;

    /// Try to queue one frame without blocking.
    ///
    /// Returns `Ok(false)` when the transport cannot take the frame right now;
    /// nothing was queued in that case.
    fn try_send_frame(&mut self, frame: &[u8], more: bool) -> Result<bool>;
}

/// Receiving half of a transport.
pub trait RecvTransport: Send {
    /// Bind or connect for receiving.
    fn connect(&mut self, info: &ConnectionInfo, options: &EndpointOptions) -> Result<()>;

    /// Try to take one frame without blocking. `Ok(None)` when nothing is queued.
    fn try_recv_frame(&mut self) -> Result<Option<Frame>>;
}

/// Receiving transport with native topic filtering on the first frame.
///
/// Called only for topics entering or leaving the subscription set, so a
/// transport never sees duplicate subscribes or unknown unsubscribes.
pub trait SubscribeTransport: RecvTransport {
    fn subscribe(&mut self, topic: &[u8]) -> Result<()>;

    fn unsubscribe(&mut self, topic: &[u8]) -> Result<()>;
}
