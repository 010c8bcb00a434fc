//! Batch distribution: peer/worker/store fan-out and block/replay.

use tracing::{debug, warn};

use crate::identity::PeerId;
use crate::message::{CommandMessage, DataMessage, MessageContent, NodeMessage};
use crate::node::{MixedItem, Node};

impl Node {
    /// Prepare the dispatch tree for one inbound batch.
    ///
    /// Anything still sitting in the central buffer was staged by this node
    /// itself, so it must fan out to *all* paths before the selector starts
    /// excluding the batch's sender.
    pub(crate) fn before_batch(&mut self, sender: Option<PeerId>) {
        self.dispatch.peers.set_active_sender(None);
        self.dispatch.peers.fan_out_flush();
        self.dispatch.peers.set_active_sender(sender);
    }

    /// Flush the batch's output while the sender filter is still active,
    /// then clear the selector and emit.
    pub(crate) fn after_batch(&mut self) {
        self.dispatch.peers.fan_out_flush();
        self.dispatch.peers.set_active_sender(None);
        self.dispatch.peers.emit_batches();
        self.dispatch.flush_local();
    }

    /// Handle a batch of node messages from a direct neighbor.
    ///
    /// Blocked senders get their batches buffered wholesale. Otherwise each
    /// message is split into local delivery and onward forwarding; clone
    /// traffic and expired messages never leave this node.
    pub fn handle_peer_batch(&mut self, sender: &PeerId, batch: Vec<NodeMessage>) {
        if self.blocked_peers.contains(sender) {
            debug!(peer = %sender, "buffer batch from blocked peer");
            self.blocked_msgs
                .entry(sender.clone())
                .or_default()
                .push(batch);
            return;
        }
        let num_workers = self.dispatch.workers.num_paths();
        let num_stores = self.dispatch.stores.num_paths();
        debug!(num_workers, num_stores, "forward batch from peer");
        for mut msg in batch {
            match &msg.content {
                MessageContent::Data(data) => {
                    if num_workers > 0 {
                        self.dispatch.workers.push(data.clone());
                    }
                }
                MessageContent::Command(cmd) => {
                    if num_stores > 0 {
                        self.dispatch.stores.push(cmd.clone());
                    }
                }
            }
            if !self.config.forward() {
                continue;
            }
            // Store clone updates stay between a store and its local peers.
            if msg.content.topic().ends_with_clone_suffix() {
                continue;
            }
            if msg.ttl <= 1 {
                warn!("dropped a message with expired TTL");
                continue;
            }
            msg.ttl -= 1;
            self.push_to_peers(msg);
        }
    }

    /// Handle a batch of data messages from a local publisher.
    pub fn handle_worker_batch(&mut self, batch: Vec<DataMessage>) {
        debug!(count = batch.len(), "publish from local workers");
        for msg in batch {
            self.dispatch.workers.push(msg);
        }
    }

    /// Handle a batch of command messages from a local publisher.
    pub fn handle_store_batch(&mut self, batch: Vec<CommandMessage>) {
        debug!(count = batch.len(), "publish from local stores");
        for msg in batch {
            self.dispatch.stores.push(msg);
        }
    }

    /// Handle a heterogeneous batch, dispatching on each element's kind.
    pub fn handle_mixed_batch(&mut self, batch: Vec<MixedItem>) {
        debug!(count = batch.len(), "publish from custom batch");
        for item in batch {
            match item {
                MixedItem::Data(msg) => self.dispatch.workers.push(msg),
                MixedItem::Command(msg) => self.dispatch.stores.push(msg),
                MixedItem::Node(msg) => self.push_to_peers(msg),
            }
        }
    }

    /// Deliver content to local subscribers only, bypassing peers.
    pub fn ship_locally(&mut self, content: MessageContent) {
        match content {
            MessageContent::Data(msg) => {
                if self.dispatch.workers.num_paths() > 0 {
                    self.dispatch.workers.push(msg);
                    self.dispatch.workers.emit_batches();
                }
            }
            MessageContent::Command(msg) => {
                if self.dispatch.stores.num_paths() > 0 {
                    self.dispatch.stores.push(msg);
                    self.dispatch.stores.emit_batches();
                }
            }
        }
    }

    /// Start buffering batches from the peer.
    pub fn block_peer(&mut self, peer: PeerId) {
        debug!(peer = %peer, "blocking peer");
        self.blocked_peers.insert(peer);
    }

    /// Stop buffering and replay what accumulated, in order.
    ///
    /// Replay runs each buffered batch through the normal
    /// before/handle/after sequence. When the peer's inbound slot is
    /// already gone, the buffered batches are discarded.
    pub fn unblock_peer(&mut self, peer: &PeerId) {
        self.blocked_peers.remove(peer);
        let Some(batches) = self.blocked_msgs.remove(peer) else {
            return;
        };
        if !self.tbl.contains(peer) {
            debug!(peer = %peer, "dropped batches after unblocking peer: path no longer exists");
            return;
        }
        for batch in batches {
            debug!(peer = %peer, "handle blocked batch");
            self.before_batch(Some(peer.clone()));
            self.handle_peer_batch(peer, batch);
            self.after_batch();
        }
    }
}
