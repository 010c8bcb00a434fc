//! Streaming dispatch: outbound paths to peers, workers, and stores.
//!
//! The [`DistributionTree`] owns three classes of outbound paths. Peer paths
//! buffer node messages per neighbor behind a central buffer and a selector:
//! while a batch from neighbor `h` is being handled, `h` is the *active
//! sender* and the fan-out skips it, so traffic never bounces straight back
//! to where it came from. Worker and store paths deliver data and command
//! messages to local subscribers.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::debug;

use crate::identity::PeerId;
use crate::message::{CommandMessage, DataMessage, NodeMessage};
use crate::transport::{PeerEvent, PeerHandle};

/// One outbound peer path: the neighbor's handle plus its batch buffer.
#[derive(Debug)]
struct PeerPath {
    handle: PeerHandle,
    buf: Vec<NodeMessage>,
}

/// Outbound path manager for peers.
///
/// `push` stages messages in a central buffer; `fan_out_flush` replicates
/// them to every per-peer buffer except the active sender; `emit_batches`
/// drains each per-peer buffer as a single batch.
#[derive(Debug, Default)]
pub struct PeerPaths {
    paths: BTreeMap<PeerId, PeerPath>,
    central: Vec<NodeMessage>,
    active_sender: Option<PeerId>,
}

impl PeerPaths {
    /// Register the outbound path for a newly connected neighbor.
    pub fn add_path(&mut self, peer: PeerId, handle: PeerHandle) {
        self.paths.insert(peer, PeerPath {
            handle,
            buf: Vec::new(),
        });
    }

    /// Drop a neighbor's path, discarding anything still buffered for it.
    pub fn remove_path(&mut self, peer: &PeerId) -> bool {
        self.paths.remove(peer).is_some()
    }

    pub fn has_path(&self, peer: &PeerId) -> bool {
        self.paths.contains_key(peer)
    }

    pub fn num_paths(&self) -> usize {
        self.paths.len()
    }

    /// Stage a message in the central buffer.
    pub fn push(&mut self, msg: NodeMessage) {
        self.central.push(msg);
    }

    pub fn set_active_sender(&mut self, sender: Option<PeerId>) {
        self.active_sender = sender;
    }

    pub fn active_sender(&self) -> Option<&PeerId> {
        self.active_sender.as_ref()
    }

    /// Replicate the central buffer to each per-peer buffer, skipping the
    /// active sender, then clear the central buffer.
    pub fn fan_out_flush(&mut self) {
        if self.central.is_empty() {
            return;
        }
        for msg in self.central.drain(..) {
            for (peer, path) in &mut self.paths {
                if Some(peer) != self.active_sender.as_ref() {
                    path.buf.push(msg.clone());
                }
            }
        }
    }

    /// Send each non-empty per-peer buffer as one batch.
    ///
    /// A closed link only logs: path removal is driven by the peer
    /// lifecycle events, not by send failures.
    pub fn emit_batches(&mut self) {
        for (peer, path) in &mut self.paths {
            if path.buf.is_empty() {
                continue;
            }
            let batch = std::mem::take(&mut path.buf);
            if path.handle.send(PeerEvent::Batch(batch)).is_err() {
                debug!(peer = %peer, "dropped batch: peer path closed");
            }
        }
    }
}

/// Outbound paths to local subscribers of one message type.
#[derive(Debug)]
pub struct LocalPaths<T> {
    senders: Vec<mpsc::UnboundedSender<T>>,
    buf: Vec<T>,
}

impl<T: Clone> LocalPaths<T> {
    pub fn new() -> Self {
        Self {
            senders: Vec::new(),
            buf: Vec::new(),
        }
    }

    /// Attach a local subscriber.
    pub fn add_path(&mut self, sender: mpsc::UnboundedSender<T>) {
        self.senders.push(sender);
    }

    /// Number of attached subscribers, counting only live ones.
    pub fn num_paths(&self) -> usize {
        self.senders.iter().filter(|s| !s.is_closed()).count()
    }

    /// Stage a message for the next emit.
    pub fn push(&mut self, msg: T) {
        self.buf.push(msg);
    }

    /// Deliver everything staged to every live subscriber, pruning
    /// subscribers that went away.
    pub fn emit_batches(&mut self) {
        if self.buf.is_empty() {
            self.senders.retain(|s| !s.is_closed());
            return;
        }
        for msg in self.buf.drain(..) {
            self.senders.retain(|sender| sender.send(msg.clone()).is_ok());
        }
    }
}

impl<T: Clone> Default for LocalPaths<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The distribution tree: all outbound paths of one node.
#[derive(Debug, Default)]
pub struct DistributionTree {
    pub peers: PeerPaths,
    pub workers: LocalPaths<DataMessage>,
    pub stores: LocalPaths<CommandMessage>,
}

impl DistributionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver staged worker and store traffic.
    pub fn flush_local(&mut self) {
        self.workers.emit_batches();
        self.stores.emit_batches();
    }
}
