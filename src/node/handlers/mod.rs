//! Event dispatch and the node's run loop.

mod batch;
mod lifecycle;
mod publication;
mod subscription;

use tracing::{debug, info};

use crate::node::{Event, Node, NodeError};

impl Node {
    /// Run the event loop until shutdown completes.
    ///
    /// Consumes events from the node's queue in FIFO order. The loop ends
    /// when a shutdown was requested and the last peer path has closed, or
    /// when every sender is gone.
    pub async fn run(&mut self) -> Result<(), NodeError> {
        let mut event_rx = self.event_rx.take().ok_or(NodeError::AlreadyRunning)?;

        info!(id = %self.id(), "node event loop started");

        while let Some(event) = event_rx.recv().await {
            self.dispatch_event(event);
            if self.is_shutting_down() && self.dispatch.peers.num_paths() == 0 {
                info!("terminating: user shutdown");
                return Ok(());
            }
        }

        debug!("event loop stopped: all senders dropped");
        Ok(())
    }

    /// Dispatch a single event to its handler.
    ///
    /// Every handler is total: no event can fail the loop.
    pub fn dispatch_event(&mut self, event: Event) {
        match event {
            Event::PublishData(msg) => self.publish_data(msg),
            Event::PublishCommand(msg) => self.publish_command(msg),
            Event::Subscribe(filter) => self.subscribe(&filter),
            Event::Publication(msg) => self.handle_publication(msg),
            Event::FilterUpdate {
                path,
                filter,
                timestamp,
            } => self.handle_filter_update(path, filter, timestamp),
            Event::PeerBatch { sender, batch } => {
                self.before_batch(Some(sender.clone()));
                self.handle_peer_batch(&sender, batch);
                self.after_batch();
            }
            Event::WorkerBatch(batch) => {
                self.before_batch(None);
                self.handle_worker_batch(batch);
                self.after_batch();
            }
            Event::StoreBatch(batch) => {
                self.before_batch(None);
                self.handle_store_batch(batch);
                self.after_batch();
            }
            Event::MixedBatch(batch) => {
                self.before_batch(None);
                self.handle_mixed_batch(batch);
                self.after_batch();
            }
            Event::LocalPublishData(msg) => self.ship_locally(msg.into()),
            Event::LocalPublishCommand(msg) => self.ship_locally(msg.into()),
            Event::BlockPeer(peer) => self.block_peer(peer),
            Event::UnblockPeer(peer) => self.unblock_peer(&peer),
            Event::PeerConnected { peer, handle } => self.peer_connected(peer, handle),
            Event::PeerDisconnected { peer, reason } => self.peer_disconnected(&peer, reason),
            Event::Unpeer(peer) => self.handle_unpeer(&peer),
            Event::AddWorker(sender) => self.dispatch.workers.add_path(sender),
            Event::AddStore(sender) => self.dispatch.stores.add_path(sender),
            Event::GetId(reply) => {
                let _ = reply.send(self.id().clone());
            }
            Event::GetDirectSubscriptions(reply) => {
                let _ = reply.send(self.direct_subscriptions());
            }
            Event::Shutdown => self.shutdown(),
        }
    }
}
