//! Local subscribe and flooded filter updates.

use tracing::{debug, warn};

use crate::filter::Filter;
use crate::identity::PeerId;
use crate::node::Node;
use crate::transport::PeerEvent;

impl Node {
    /// Extend the local subscriptions and flood the change.
    ///
    /// Internal topics never enter the advertised filter. When nothing
    /// changes, no flood is sent and the logical clock stays put.
    pub fn subscribe(&mut self, what: &Filter) {
        if !self.filter.extend_if(what, |t| !t.is_internal()) {
            debug!("already subscribed to topic");
            return;
        }
        self.timestamp += 1;
        let path = vec![self.id.clone()];
        for (peer, entry) in self.tbl.iter() {
            let update = PeerEvent::FilterUpdate {
                path: path.clone(),
                filter: self.filter.clone(),
                timestamp: self.timestamp,
            };
            if entry.handle.send(update).is_err() {
                debug!(peer = %peer, "dropped filter update: peer path closed");
            }
        }
    }

    /// Handle a flooded subscription update from the overlay.
    ///
    /// The path records every hop the update has taken; its length is the
    /// distance to the origin. Loop-containing paths and stale timestamps
    /// make the flood idempotent.
    pub fn handle_filter_update(&mut self, mut path: Vec<PeerId>, filter: Filter, timestamp: u64) {
        // Drop nonsense messages.
        if path.is_empty() || filter.is_empty() {
            warn!("drop malformed filter update");
            return;
        }
        let last_hop = path[path.len() - 1].clone();
        if !self.tbl.contains(&last_hop) {
            warn!(last_hop = %last_hop, "received subscription from an unrecognized connection");
            return;
        }
        // Drop all paths that contain loops.
        if path.contains(&self.id) {
            debug!("drop path containing a loop");
            return;
        }
        let distance = path.len();
        if distance > usize::from(u16::MAX) {
            warn!(distance, "detected path with distance > 65535: drop");
            return;
        }
        self.ttl = self.ttl.max(distance as u16);
        let origin = path[0].clone();
        // Update the distance of indirect paths.
        if distance > 1 {
            self.tbl.record_distance(&last_hop, origin.clone(), distance);
        }
        // Forward the subscription to all peers not already on the path.
        path.push(self.id.clone());
        for (peer, entry) in self.tbl.iter() {
            if path.contains(peer) {
                continue;
            }
            let update = PeerEvent::FilterUpdate {
                path: path.clone(),
                filter: filter.clone(),
                timestamp,
            };
            if entry.handle.send(update).is_err() {
                debug!(peer = %peer, "dropped filter update: peer path closed");
            }
        }
        // Store the subscription if it is new. Equal timestamps lose: only a
        // strictly newer update replaces the stored filter.
        let ts = self.peer_timestamps.entry(origin.clone()).or_insert(0);
        if *ts < timestamp {
            self.peer_filters.insert(origin, filter);
            *ts = timestamp;
        }
    }

    /// The union of the filters of *direct* peers only.
    ///
    /// Indirect peers' filters are deliberately omitted to keep the
    /// semantics of the pre-overlay subscription query.
    pub fn direct_subscriptions(&self) -> Filter {
        let mut result = Filter::new();
        for (peer, filter) in &self.peer_filters {
            if self.tbl.contains(peer) {
                result.extend(filter);
            }
        }
        result
    }
}
