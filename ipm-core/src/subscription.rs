//! Subscription set for topic filtering on SUB-style receivers.
//!
//! Matching follows ZeroMQ conventions: a subscription is a prefix of the
//! metadata frame, the empty topic matches every message, and an empty set
//! matches nothing.

use std::collections::BTreeSet;

/// Set of subscribed topics. Duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    topics: BTreeSet<String>,
}

impl SubscriptionSet {
    /// Create a new empty subscription set
    #[must_use]
    pub const fn new() -> Self {
        Self {
            topics: BTreeSet::new(),
        }
    }

    /// Add a topic. Returns `true` if it was not already present.
    pub fn subscribe(&mut self, topic: &str) -> bool {
        if self.topics.contains(topic) {
            return false;
        }
        self.topics.insert(topic.to_string())
    }

    /// Remove a topic. Returns `true` if it was present.
    pub fn unsubscribe(&mut self, topic: &str) -> bool {
        self.topics.remove(topic)
    }

    #[must_use]
    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    /// Check if a metadata frame should be delivered.
    #[must_use]
    pub fn matches(&self, metadata: &[u8]) -> bool {
        self.topics
            .iter()
            .any(|topic| metadata.starts_with(topic.as_bytes()))
    }

    /// Topics in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }
}
