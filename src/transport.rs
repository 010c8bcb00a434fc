//! The seam between the routing core and the (external) transport.
//!
//! The transport owns connection establishment, framing, and reconnect
//! timers. The core only sees two things: a [`PeerHandle`] per neighbor for
//! enqueueing outbound events, and lifecycle/status notifications flowing
//! the other way. Sending never blocks; handlers enqueue and move on.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::filter::Filter;
use crate::identity::PeerId;
use crate::message::NodeMessage;

/// Errors surfaced by the transport seam.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The neighbor's channel is gone; the transport tore the link down.
    #[error("peer channel closed")]
    ChannelClosed,
}

/// What one overlay node sends to a directly connected neighbor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerEvent {
    /// Flooded subscription update: the path walked so far, the origin's
    /// filter, and the origin's logical timestamp.
    FilterUpdate {
        path: Vec<PeerId>,
        filter: Filter,
        timestamp: u64,
    },
    /// A single forwarded node message (shortest-path shipping).
    Publication(NodeMessage),
    /// A batch of node messages from the dispatch layer.
    Batch(Vec<NodeMessage>),
}

/// Communication handle addressing one direct neighbor.
///
/// Obtained when the neighbor joins and invalidated when the transport drops
/// the connection. Cloning is cheap; the handle only wraps the link's sender.
#[derive(Clone, Debug)]
pub struct PeerHandle {
    tx: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerHandle {
    /// Enqueue an event for the neighbor. Fails only when the link is gone.
    pub fn send(&self, event: PeerEvent) -> Result<(), TransportError> {
        self.tx.send(event).map_err(|_| TransportError::ChannelClosed)
    }

    /// Check whether the link behind this handle has been torn down.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a connected handle/receiver pair for one directed link.
///
/// The transport calls this per connection and feeds the receiving end into
/// the remote node's event queue; test topologies pump it directly.
pub fn peer_channel() -> (PeerHandle, mpsc::UnboundedReceiver<PeerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PeerHandle { tx }, rx)
}

/// Status notifications emitted by the core for the embedding application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusEvent {
    /// A peer connection was lost ungracefully.
    PeerLost {
        peer: PeerId,
        reason: Option<String>,
    },
    /// A peering was removed deliberately.
    PeerRemoved { peer: PeerId },
    /// The transport should retry connecting to the peer after the delay.
    ReconnectScheduled { peer: PeerId, after: Duration },
}

/// Reconnect parameters cached per peer.
///
/// A zero retry interval disables reconnection attempts for that peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectDescriptor {
    pub retry: Duration,
}

impl ReconnectDescriptor {
    pub fn new(retry: Duration) -> Self {
        Self { retry }
    }

    /// Whether a lost connection to this peer should be retried.
    pub fn retries(&self) -> bool {
        !self.retry.is_zero()
    }
}
