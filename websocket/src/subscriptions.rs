//! Subscription management for WebSocket clients.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Available subscription topics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTopic {
    /// Registration requests created or changing status.
    Registration,
    /// Events emitted by the voting contract.
    Contract,
}

impl SubscriptionTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Contract => "contract",
        }
    }
}

impl fmt::Display for SubscriptionTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional filter for subscriptions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SubscriptionFilter {
    /// Only receive events that mention one of these addresses.
    pub addresses: Option<Vec<String>>,
}

/// Messages a client may send.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe {
        topic: SubscriptionTopic,
        #[serde(default)]
        filter: Option<SubscriptionFilter>,
    },
    Unsubscribe {
        topic: SubscriptionTopic,
    },
    Ping,
}

/// Control messages sent to a client. Events are sent as
/// [`SubscriptionEvent`]s.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Ack {
        action: String,
        topic: SubscriptionTopic,
    },
    Error {
        message: String,
    },
    Pong,
}

/// An event delivered to subscribed clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub topic: SubscriptionTopic,
    pub data: serde_json::Value,
    pub timestamp: u64,
}

impl SubscriptionEvent {
    /// Addresses named by the event payload (`address` or `voter`).
    pub fn addresses(&self) -> Vec<&str> {
        ["address", "voter"]
            .iter()
            .filter_map(|key| self.data.get(*key).and_then(|v| v.as_str()))
            .collect()
    }
}

/// Active subscriptions of one connection.
#[derive(Debug, Default)]
pub struct ClientSubscriptions {
    topics: HashMap<SubscriptionTopic, Option<SubscriptionFilter>>,
}

impl ClientSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe, replacing any filter already set for `topic`.
    pub fn subscribe(&mut self, topic: SubscriptionTopic, filter: Option<SubscriptionFilter>) {
        self.topics.insert(topic, filter);
    }

    /// Returns whether the client was subscribed.
    pub fn unsubscribe(&mut self, topic: &SubscriptionTopic) -> bool {
        self.topics.remove(topic).is_some()
    }

    pub fn is_subscribed(&self, topic: &SubscriptionTopic) -> bool {
        self.topics.contains_key(topic)
    }

    pub fn matches_filter(&self, topic: &SubscriptionTopic, event: &SubscriptionEvent) -> bool {
        match self.topics.get(topic) {
            None => false,
            Some(None) => true,
            Some(Some(filter)) => match &filter.addresses {
                None => true,
                Some(wanted) => event
                    .addresses()
                    .iter()
                    .any(|a| wanted.iter().any(|w| w.trim().eq_ignore_ascii_case(a))),
            },
        }
    }
}
