//! Peer lifecycle: connect, disconnect, unpeer, and shutdown.

use tracing::{debug, info};

use crate::identity::PeerId;
use crate::node::Node;
use crate::routing::RouteEntry;
use crate::transport::{PeerHandle, ReconnectDescriptor, StatusEvent};

impl Node {
    /// A new direct neighbor joined.
    ///
    /// The routing entry is in place before any other handler can observe
    /// the peer, matching the transport contract that the table is updated
    /// ahead of the connect notification.
    pub fn peer_connected(&mut self, peer: PeerId, handle: PeerHandle) {
        self.tbl.insert(peer.clone(), RouteEntry::new(handle.clone()));
        self.dispatch.peers.add_path(peer.clone(), handle);
        self.reconnects
            .entry(peer.clone())
            .or_insert_with(|| ReconnectDescriptor::new(self.config.retry()));
        info!(peer = %peer, "peer connected");
    }

    /// Remove all state tied to a direct neighbor.
    ///
    /// The stored filter goes away only when the peer became unreachable
    /// through every remaining neighbor; its timestamp entry stays so a
    /// rejoining peer cannot replay stale filters.
    pub fn peer_removed(&mut self, peer: &PeerId) {
        self.tbl.remove(peer);
        self.dispatch.peers.remove_path(peer);
        self.blocked_peers.remove(peer);
        self.blocked_msgs.remove(peer);
        if self.tbl.distance_to(peer).is_none() {
            self.peer_filters.remove(peer);
        }
        debug!(peer = %peer, "peer state removed");
    }

    /// The transport lost the connection to a neighbor.
    ///
    /// Cleanup is identical to a deliberate removal; in addition the loss is
    /// surfaced as a status event and, outside shutdown, a reconnect is
    /// scheduled when the peer's descriptor allows one.
    pub fn peer_disconnected(&mut self, peer: &PeerId, reason: Option<String>) {
        if !self.tbl.contains(peer) {
            debug!(peer = %peer, "disconnect for unknown peer");
            return;
        }
        self.peer_removed(peer);
        self.peer_lost(peer, reason);
    }

    /// Deliberate unpeer requested by the user.
    pub fn handle_unpeer(&mut self, peer: &PeerId) {
        if !self.tbl.contains(peer) {
            debug!(peer = %peer, "cannot unpeer from unknown peer");
            return;
        }
        self.peer_removed(peer);
        self.reconnects.remove(peer);
        self.emit_status(StatusEvent::PeerRemoved { peer: peer.clone() });
        info!(peer = %peer, "removed peering");
    }

    /// Surface an ungraceful loss and schedule a reconnect when allowed.
    ///
    /// The actual timer lives in the transport; the core only announces
    /// when a retry should happen.
    fn peer_lost(&mut self, peer: &PeerId, reason: Option<String>) {
        info!(peer = %peer, reason = reason.as_deref().unwrap_or("none"), "lost remote peer");
        self.emit_status(StatusEvent::PeerLost {
            peer: peer.clone(),
            reason,
        });
        if self.shutting_down {
            return;
        }
        let Some(descriptor) = self.reconnects.get(peer) else {
            return;
        };
        if !descriptor.retries() {
            return;
        }
        info!(peer = %peer, after = ?descriptor.retry, "will try reconnecting");
        self.emit_status(StatusEvent::ReconnectScheduled {
            peer: peer.clone(),
            after: descriptor.retry,
        });
    }

    /// Begin the shutdown drain.
    ///
    /// Suppresses reconnect scheduling; the run loop terminates once the
    /// last peer path has closed.
    pub fn shutdown(&mut self) {
        info!("shutdown requested, draining peer paths");
        self.shutting_down = true;
    }
}
