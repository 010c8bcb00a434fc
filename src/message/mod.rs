//! Message types exchanged through the overlay.
//!
//! Three layers of envelopes:
//!
//! - [`DataMessage`] / [`CommandMessage`]: topic-addressed content produced
//!   by local publishers. Data goes to workers, commands to stores.
//! - [`MessageContent`]: the tagged sum of the two, as carried on the wire.
//! - [`NodeMessage`]: the overlay envelope adding a TTL and the explicit
//!   receiver set used by source routing.

pub mod wire;

pub use wire::WireError;

use crate::identity::PeerId;
use crate::topic::Topic;

/// Topic-addressed payload for local data subscribers (workers).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataMessage {
    pub topic: Topic,
    pub payload: Vec<u8>,
}

impl DataMessage {
    pub fn new(topic: impl Into<Topic>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Store-level command carried by a [`CommandMessage`].
///
/// The store state machines themselves live outside the core; the routing
/// layer only moves these between peers and local store subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InternalCommand {
    Put { key: String, value: Vec<u8> },
    Erase { key: String },
    Clear,
}

/// Topic-addressed command for local command subscribers (stores).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandMessage {
    pub topic: Topic,
    pub command: InternalCommand,
}

impl CommandMessage {
    pub fn new(topic: impl Into<Topic>, command: InternalCommand) -> Self {
        Self {
            topic: topic.into(),
            command,
        }
    }
}

/// Tagged sum of the two content kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageContent {
    Data(DataMessage),
    Command(CommandMessage),
}

impl MessageContent {
    /// The topic the content is addressed to.
    pub fn topic(&self) -> &Topic {
        match self {
            MessageContent::Data(msg) => &msg.topic,
            MessageContent::Command(msg) => &msg.topic,
        }
    }

    /// Check whether the content is a data message.
    pub fn is_data(&self) -> bool {
        matches!(self, MessageContent::Data(_))
    }
}

impl From<DataMessage> for MessageContent {
    fn from(msg: DataMessage) -> Self {
        MessageContent::Data(msg)
    }
}

impl From<CommandMessage> for MessageContent {
    fn from(msg: CommandMessage) -> Self {
        MessageContent::Command(msg)
    }
}

/// Overlay envelope: content plus TTL and the explicit receiver set.
///
/// Receivers are the peers whose advertised filter matched the topic at the
/// publisher. Forwarders split the set by first hop and decrement the TTL;
/// they never add receivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeMessage {
    pub content: MessageContent,
    pub ttl: u16,
    pub receivers: Vec<PeerId>,
}

impl NodeMessage {
    pub fn new(content: impl Into<MessageContent>, ttl: u16, receivers: Vec<PeerId>) -> Self {
        Self {
            content: content.into(),
            ttl,
            receivers,
        }
    }
}
