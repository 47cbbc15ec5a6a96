//! IPM Error Types
//!
//! Every failure an endpoint, the retry engine, the codec or the registry can
//! report to its caller.

use thiserror::Error;

use crate::endpoint::EndpointError;
use crate::registry::EndpointKind;
use crate::timeout::Timeout;

/// Main error type for IPM operations
#[derive(Error, Debug)]
pub enum IpmError {
    /// Send attempted while the sender is not ready
    #[error("Sender is not in a state where it can send (connect_for_sends has not succeeded)")]
    KnownStateForbidsSend,

    /// Receive attempted while the receiver is not ready
    #[error("Receiver is not in a state where it can receive (connect_for_receives has not succeeded)")]
    KnownStateForbidsReceive,

    /// A fragment without a buffer but with a nonzero declared length
    #[error("A null buffer with a nonzero length was passed to send")]
    NullPointerPassedToSend,

    /// The bounded send loop exhausted its budget
    #[error("Unable to send within timeout period (timeout period was {0})")]
    SendTimeoutExpired(Timeout),

    /// The bounded receive loop exhausted its budget
    #[error("Unable to receive within timeout period (timeout period was {0})")]
    ReceiveTimeoutExpired(Timeout),

    /// A message arrived but its payload size differs from what the caller expected
    #[error("Expected {expected} bytes in message but received {received}")]
    UnexpectedNumberOfBytes { received: usize, expected: usize },

    /// No plugin registered under this name
    #[error("No {kind} plugin registered under the name \"{name}\"")]
    PluginNotFound { kind: EndpointKind, name: String },

    /// A plugin with this name already exists
    #[error("A {kind} plugin is already registered under the name \"{name}\"")]
    PluginAlreadyRegistered { kind: EndpointKind, name: String },

    /// Connection string could not be parsed or is not supported
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),

    /// Connection info could not be decoded
    #[error("Invalid connection info: {0}")]
    Config(#[from] serde_json::Error),

    /// The transport delivered part of a multi-frame message
    #[error("Torn message: {0}")]
    TornMessage(String),

    /// Received message too large
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Received message has too many frames
    #[error("Message has too many frames: {count} (max: {max})")]
    TooManyFrames { count: usize, max: usize },

    /// Failure reported by the underlying transport library
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for IPM operations
pub type Result<T> = std::result::Result<T, IpmError>;

impl IpmError {
    /// Create a transport error with a message
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a torn message error
    pub fn torn(msg: impl Into<String>) -> Self {
        Self::TornMessage(msg.into())
    }

    /// Check if this is one of the timeout kinds
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::SendTimeoutExpired(_) | Self::ReceiveTimeoutExpired(_)
        )
    }

    /// Check if the caller may simply try the operation again.
    ///
    /// Timeouts are the expected outcome under backpressure or when no data is
    /// flowing; everything else needs a configuration or code change.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        self.is_timeout()
    }

    /// Check if the operation was rejected by a readiness precondition
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::KnownStateForbidsSend | Self::KnownStateForbidsReceive
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timeouts_are_recoverable() {
        let err = IpmError::SendTimeoutExpired(Timeout::from(Duration::from_millis(5)));
        assert!(err.is_timeout());
        assert!(err.is_recoverable());

        let err = IpmError::ReceiveTimeoutExpired(Timeout::BLOCK);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_other_errors_are_fatal() {
        assert!(!IpmError::KnownStateForbidsSend.is_recoverable());
        assert!(IpmError::KnownStateForbidsSend.is_precondition());
        assert!(!IpmError::NullPointerPassedToSend.is_recoverable());
        assert!(!IpmError::transport("boom").is_recoverable());
        let err = IpmError::UnexpectedNumberOfBytes {
            received: 3,
            expected: 4,
        };
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_display_carries_sizes_and_timeout() {
        let err = IpmError::UnexpectedNumberOfBytes {
            received: 9,
            expected: 10,
        };
        assert_eq!(err.to_string(), "Expected 10 bytes in message but received 9");

        let err = IpmError::ReceiveTimeoutExpired(Timeout::from(Duration::from_millis(100)));
        assert!(err.to_string().contains("100ms"));
    }

    #[test]
    fn test_transport_failures_keep_their_cause() {
        let err = IpmError::transport("zmq bind failed: Address in use");
        assert!(matches!(&err, IpmError::Transport(msg) if msg.starts_with("zmq bind")));
        assert_eq!(err.to_string(), "Transport error: zmq bind failed: Address in use");
        assert!(!err.is_precondition());
    }
}
