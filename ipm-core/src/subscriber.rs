//! Subscriber contract: a receiver with topic filtering.

use tracing::{debug, trace};

use crate::error::Result;
use crate::receiver::{Receiver, TransportReceiver};
use crate::subscription::SubscriptionSet;
use crate::transport::SubscribeTransport;

/// Receiving endpoint that only delivers messages whose metadata frame
/// matches a subscribed topic.
///
/// With no subscriptions nothing is delivered. Subscribing twice is the same
/// as subscribing once; unsubscribing an unknown topic is a no-op.
pub trait Subscriber: Receiver {
    fn subscribe(&mut self, topic: &str) -> Result<()>;

    fn unsubscribe(&mut self, topic: &str) -> Result<()>;

    /// Current subscription set.
    fn subscriptions(&self) -> &SubscriptionSet;
}

/// A [`TransportReceiver`] over a filtering transport.
pub type TransportSubscriber<T> = TransportReceiver<T>;

impl<T: SubscribeTransport> Subscriber for TransportReceiver<T> {
    fn subscribe(&mut self, topic: &str) -> Result<()> {
        if !self.subscriptions.subscribe(topic) {
            trace!("[IPM] already subscribed to \"{}\"", topic);
            return Ok(());
        }

        if let Err(err) = self.transport.subscribe(topic.as_bytes()) {
            self.subscriptions.unsubscribe(topic);
            return Err(err);
        }
        debug!("[IPM] subscribed to \"{}\"", topic);
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<()> {
        if !self.subscriptions.unsubscribe(topic) {
            trace!("[IPM] not subscribed to \"{}\", nothing to remove", topic);
            return Ok(());
        }

        if let Err(err) = self.transport.unsubscribe(topic.as_bytes()) {
            self.subscriptions.subscribe(topic);
            return Err(err);
        }
        debug!("[IPM] unsubscribed from \"{}\"", topic);
        Ok(())
    }

    fn subscriptions(&self) -> &SubscriptionSet {
        &self.subscriptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionInfo;
    use crate::error::IpmError;
    use crate::options::EndpointOptions;
    use crate::transport::{Frame, RecvTransport};

    /// Records what reached the transport.
    #[derive(Default)]
    struct RecordingFilter {
        calls: Vec<(bool, Vec<u8>)>,
        fail: bool,
    }

    impl RecvTransport for RecordingFilter {
        fn connect(&mut self, _: &ConnectionInfo, _: &EndpointOptions) -> Result<()> {
            Ok(())
        }

        fn try_recv_frame(&mut self) -> Result<Option<Frame>> {
            Ok(None)
        }
    }

    impl SubscribeTransport for RecordingFilter {
        fn subscribe(&mut self, topic: &[u8]) -> Result<()> {
            if self.fail {
                return Err(IpmError::transport("filter rejected"));
            }
            self.calls.push((true, topic.to_vec()));
            Ok(())
        }

        fn unsubscribe(&mut self, topic: &[u8]) -> Result<()> {
            self.calls.push((false, topic.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_duplicate_subscribe_reaches_transport_once() {
        let mut sub = TransportReceiver::new(RecordingFilter::default());
        sub.subscribe("topicA").unwrap();
        sub.subscribe("topicA").unwrap();

        assert_eq!(sub.subscriptions().len(), 1);
        assert_eq!(sub.transport().calls, vec![(true, b"topicA".to_vec())]);
    }

    #[test]
    fn test_unknown_unsubscribe_is_noop() {
        let mut sub = TransportReceiver::new(RecordingFilter::default());
        sub.subscribe("topicA").unwrap();
        let before = sub.subscriptions().clone();

        sub.unsubscribe("never").unwrap();
        assert_eq!(sub.subscriptions(), &before);
        assert_eq!(sub.transport().calls.len(), 1);

        sub.unsubscribe("topicA").unwrap();
        assert!(sub.subscriptions().is_empty());
        assert_eq!(sub.transport().calls[1], (false, b"topicA".to_vec()));
    }

    #[test]
    fn test_subscribe_before_connect_is_kept() {
        let mut sub = TransportReceiver::new(RecordingFilter::default());
        sub.subscribe("early").unwrap();
        sub.connect_for_receives(ConnectionInfo::default()).unwrap();

        assert!(sub.can_receive());
        assert!(sub.subscriptions().contains("early"));
    }

    #[test]
    fn test_failed_subscribe_rolls_back() {
        let mut sub = TransportReceiver::new(RecordingFilter {
            fail: true,
            ..Default::default()
        });
        assert!(sub.subscribe("x").is_err());
        assert!(sub.subscriptions().is_empty());
    }
}
