//! The typed event surface of a node.
//!
//! Everything a node reacts to arrives as one [`Event`] through its
//! single-consumer queue: local publish/subscribe calls, transit traffic
//! from peers, lifecycle notifications from the transport, and control
//! requests. Handlers run strictly one event at a time, so the node's state
//! needs no locks.

use tokio::sync::{mpsc, oneshot};

use crate::filter::Filter;
use crate::identity::PeerId;
use crate::message::{CommandMessage, DataMessage, NodeMessage};
use crate::transport::PeerHandle;

/// One element of a heterogeneous batch, dispatched by its runtime kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MixedItem {
    Data(DataMessage),
    Command(CommandMessage),
    Node(NodeMessage),
}

/// Inbound events consumed by the node task.
#[derive(Debug)]
pub enum Event {
    /// Local publish of a data message.
    PublishData(DataMessage),
    /// Local publish of a command message.
    PublishCommand(CommandMessage),
    /// Local subscription to additional topic prefixes.
    Subscribe(Filter),
    /// A single transit node message from a peer.
    Publication(NodeMessage),
    /// Flooded subscription update from the overlay.
    FilterUpdate {
        path: Vec<PeerId>,
        filter: Filter,
        timestamp: u64,
    },
    /// A batch of node messages from the named direct neighbor.
    PeerBatch {
        sender: PeerId,
        batch: Vec<NodeMessage>,
    },
    /// A batch of data messages from a local publisher.
    WorkerBatch(Vec<DataMessage>),
    /// A batch of command messages from a local publisher.
    StoreBatch(Vec<CommandMessage>),
    /// A heterogeneous batch, dispatched per element.
    MixedBatch(Vec<MixedItem>),
    /// Deliver a data message locally only, bypassing peers.
    LocalPublishData(DataMessage),
    /// Deliver a command message locally only, bypassing peers.
    LocalPublishCommand(CommandMessage),
    /// Stop processing batches from the peer, buffering them instead.
    BlockPeer(PeerId),
    /// Resume processing batches from the peer, replaying what buffered.
    UnblockPeer(PeerId),
    /// The transport established a connection to a new direct neighbor.
    PeerConnected { peer: PeerId, handle: PeerHandle },
    /// The transport lost the connection to a direct neighbor.
    PeerDisconnected {
        peer: PeerId,
        reason: Option<String>,
    },
    /// Deliberate unpeering requested by the user.
    Unpeer(PeerId),
    /// Attach a local data subscriber.
    AddWorker(mpsc::UnboundedSender<DataMessage>),
    /// Attach a local command subscriber.
    AddStore(mpsc::UnboundedSender<CommandMessage>),
    /// Query this node's id.
    GetId(oneshot::Sender<PeerId>),
    /// Query the union of the filters of direct peers.
    GetDirectSubscriptions(oneshot::Sender<Filter>),
    /// Begin the shutdown drain.
    Shutdown,
}
