//! The per-peer overlay routing engine.
//!
//! A [`Node`] holds all core state for one overlay peer: the routing table
//! with per-neighbor distance vectors, the local and remote subscription
//! filters with their logical timestamps, the dispatch tree for outbound
//! traffic, and the block/replay bookkeeping for misbehaving peers.
//!
//! All state is owned exclusively by the node's task and mutated only inside
//! its event handlers; see [`Node::run`].

mod event;
mod handlers;
#[cfg(test)]
mod tests;

pub use event::{Event, MixedItem};

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::Config;
use crate::dispatch::DistributionTree;
use crate::filter::Filter;
use crate::identity::PeerId;
use crate::message::NodeMessage;
use crate::record::Recorder;
use crate::routing::RoutingTable;
use crate::topic::Topic;
use crate::transport::{PeerHandle, ReconnectDescriptor, StatusEvent};

/// Errors related to driving a node.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("event loop already running")]
    AlreadyRunning,
}

/// One overlay peer: routing state, subscriptions, and dispatch paths.
pub struct Node {
    /// This node's peer id.
    id: PeerId,

    /// Loaded configuration.
    config: Config,

    /// Routing entries for direct neighbors. The transport's connection
    /// events create entries; disconnection events remove them.
    tbl: RoutingTable,

    /// Prefixes with local subscribers on this node.
    filter: Filter,

    /// Filters of all reachable peers, direct or indirect.
    peer_filters: HashMap<PeerId, Filter>,

    /// Logical timestamps last accepted per origin peer. Monotonically
    /// non-decreasing; never purged.
    peer_timestamps: HashMap<PeerId, u64>,

    /// This node's logical clock for subscription floods.
    timestamp: u64,

    /// Maximum observed distance; also the TTL stamped on published
    /// messages. Starts at the configured default and only grows.
    ttl: u16,

    /// Outbound paths to peers, workers, and stores.
    dispatch: DistributionTree,

    /// Peers whose batches are buffered instead of processed.
    blocked_peers: HashSet<PeerId>,

    /// Batches buffered per blocked peer, in arrival order.
    blocked_msgs: HashMap<PeerId, Vec<Vec<NodeMessage>>>,

    /// Reconnect parameters per peer.
    reconnects: HashMap<PeerId, ReconnectDescriptor>,

    /// Optional recorder for outbound node messages.
    recorder: Option<Recorder>,

    /// Set once shutdown begins; suppresses reconnect scheduling.
    shutting_down: bool,

    /// Sender side of the event queue, cloned out to producers.
    event_tx: mpsc::UnboundedSender<Event>,
    /// Receiver side, consumed by [`Node::run`].
    event_rx: Option<mpsc::UnboundedReceiver<Event>>,

    /// Status notifications for the embedding application.
    status_tx: mpsc::UnboundedSender<StatusEvent>,
    status_rx: Option<mpsc::UnboundedReceiver<StatusEvent>>,
}

impl Node {
    /// Create a node from configuration.
    ///
    /// Uses the configured peer id or generates one. A configured recording
    /// directory that cannot be opened logs a warning and disables
    /// recording; it is never fatal.
    pub fn new(config: Config) -> Self {
        let id = config.create_peer_id();
        Self::with_id(id, config)
    }

    /// Create a node with an explicit peer id.
    pub fn with_id(id: PeerId, config: Config) -> Self {
        let recorder = config.recording_directory().and_then(|dir| {
            match Recorder::open(dir, config.output_generator_file_cap()) {
                Ok(recorder) => Some(recorder),
                Err(e) => {
                    warn!(error = %e, "cannot open recording file");
                    None
                }
            }
        });
        let ttl = config.ttl();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        Self {
            id,
            config,
            tbl: RoutingTable::new(),
            filter: Filter::new(),
            peer_filters: HashMap::new(),
            peer_timestamps: HashMap::new(),
            timestamp: 0,
            ttl,
            dispatch: DistributionTree::new(),
            blocked_peers: HashSet::new(),
            blocked_msgs: HashMap::new(),
            reconnects: HashMap::new(),
            recorder,
            shutting_down: false,
            event_tx,
            event_rx: Some(event_rx),
            status_tx,
            status_rx: Some(status_rx),
        }
    }

    // -- accessors -----------------------------------------------------------

    /// This node's peer id.
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// The configuration the node was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The local subscription filter.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// The routing table.
    pub fn tbl(&self) -> &RoutingTable {
        &self.tbl
    }

    /// All known peer filters.
    pub fn peer_filters(&self) -> &HashMap<PeerId, Filter> {
        &self.peer_filters
    }

    /// The filter advertised by a peer, or an empty filter if unknown.
    pub fn peer_filter(&self, peer: &PeerId) -> Filter {
        self.peer_filters.get(peer).cloned().unwrap_or_default()
    }

    /// The logical timestamp last accepted from a peer.
    pub fn peer_timestamp(&self, peer: &PeerId) -> Option<u64> {
        self.peer_timestamps.get(peer).copied()
    }

    /// Check whether any reachable peer subscribes to the topic.
    pub fn has_remote_subscriber(&self, topic: &Topic) -> bool {
        self.peer_filters.values().any(|f| f.matches(topic))
    }

    /// Communication handles of all direct neighbors.
    pub fn peer_handles(&self) -> Vec<PeerHandle> {
        self.tbl.iter().map(|(_, entry)| entry.handle.clone()).collect()
    }

    /// The current default TTL (peak observed distance).
    pub fn ttl(&self) -> u16 {
        self.ttl
    }

    /// This node's logical clock value.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Whether the node is draining toward termination.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Whether batches from the peer are currently buffered.
    pub fn is_blocked(&self, peer: &PeerId) -> bool {
        self.blocked_peers.contains(peer)
    }

    /// A sender for feeding events into this node's queue.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.event_tx.clone()
    }

    /// Take the status event receiver. Yields `None` on the second call.
    pub fn take_status_rx(&mut self) -> Option<mpsc::UnboundedReceiver<StatusEvent>> {
        self.status_rx.take()
    }

    /// Messages the recorder will still accept, if recording is on.
    pub fn recording_remaining(&self) -> Option<u64> {
        self.recorder.as_ref().map(Recorder::remaining)
    }

    // -- internal helpers ----------------------------------------------------

    /// Record an outbound node message if recording is enabled.
    pub(crate) fn record_outbound(&mut self, msg: &NodeMessage) {
        if let Some(recorder) = &mut self.recorder {
            recorder.record(msg);
        }
    }

    /// Record and stage a node message for the peer paths.
    pub(crate) fn push_to_peers(&mut self, msg: NodeMessage) {
        self.record_outbound(&msg);
        self.dispatch.peers.push(msg);
    }

    /// Emit a status notification; dropped when nobody listens.
    pub(crate) fn emit_status(&self, event: StatusEvent) {
        let _ = self.status_tx.send(event);
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("neighbors", &self.tbl.len())
            .field("peer_filters", &self.peer_filters.len())
            .field("ttl", &self.ttl)
            .field("timestamp", &self.timestamp)
            .field("shutting_down", &self.shutting_down)
            .finish()
    }
}
