//! Publishing, forwarding, and the first-hop bucketing algorithm.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::identity::PeerId;
use crate::message::{CommandMessage, DataMessage, MessageContent, NodeMessage};
use crate::node::Node;
use crate::transport::PeerEvent;

impl Node {
    /// Publish a locally produced data message to matching peers.
    pub fn publish_data(&mut self, msg: DataMessage) {
        self.publish(msg.into());
    }

    /// Publish a locally produced command message to matching peers.
    pub fn publish_command(&mut self, msg: CommandMessage) {
        self.publish(msg.into());
    }

    /// Collect the receiver set for the content's topic and ship it.
    pub fn publish(&mut self, content: MessageContent) {
        let topic = content.topic();
        let mut receivers: Vec<PeerId> = self
            .peer_filters
            .iter()
            .filter(|(_, filter)| filter.matches(topic))
            .map(|(peer, _)| peer.clone())
            .collect();
        if receivers.is_empty() {
            debug!(topic = %topic, "no subscribers found for topic");
            return;
        }
        receivers.sort();
        let msg = NodeMessage::new(content, self.ttl, receivers);
        self.ship(msg);
    }

    /// Forward `msg` to all its receivers along shortest known paths.
    ///
    /// Uses one bucket per direct neighbor and puts every receiver into the
    /// bucket of its first hop: the receiver itself when directly connected,
    /// otherwise the neighbor with the shortest recorded path (ties go to
    /// the lexicographically smallest id). Receivers without any path are
    /// skipped. Each non-empty bucket gets one copy of the message with the
    /// receiver set replaced by the bucket's contents.
    pub fn ship(&mut self, msg: NodeMessage) {
        let mut buckets: BTreeMap<PeerId, Vec<PeerId>> = BTreeMap::new();
        for receiver in &msg.receivers {
            let first_hop = if self.tbl.contains(receiver) {
                receiver.clone()
            } else {
                match self.tbl.shortest_first_hop(receiver) {
                    Some(hop) => hop.clone(),
                    None => {
                        debug!(receiver = %receiver, "no path found for receiver");
                        continue;
                    }
                }
            };
            buckets.entry(first_hop).or_default().push(receiver.clone());
        }
        for (first_hop, bucket) in buckets {
            let Some(entry) = self.tbl.get(&first_hop) else {
                continue;
            };
            let handle = entry.handle.clone();
            let mut copy = msg.clone();
            copy.receivers = bucket;
            self.record_outbound(&copy);
            if handle.send(PeerEvent::Publication(copy)).is_err() {
                debug!(peer = %first_hop, "dropped publication: peer path closed");
            }
        }
    }

    /// Direct-send shortcut: wrap `data` for a single receiver and send it
    /// along the first hop, or drop it when no path is known.
    pub fn ship_to(&mut self, data: DataMessage, receiver: &PeerId) {
        let first_hop = if self.tbl.contains(receiver) {
            receiver.clone()
        } else {
            match self.tbl.shortest_first_hop(receiver) {
                Some(hop) => hop.clone(),
                None => {
                    debug!(receiver = %receiver, "no path found for receiver");
                    return;
                }
            }
        };
        let msg = NodeMessage::new(data, self.ttl, vec![receiver.clone()]);
        let Some(entry) = self.tbl.get(&first_hop) else {
            return;
        };
        let handle = entry.handle.clone();
        self.record_outbound(&msg);
        if handle.send(PeerEvent::Publication(msg)).is_err() {
            debug!(peer = %first_hop, "dropped publication: peer path closed");
        }
    }

    /// Handle a transit node message.
    ///
    /// Decrements the TTL, splits off local delivery when this node is in
    /// the receiver set, and ships the rest onward with the decremented TTL
    /// preserved.
    pub fn handle_publication(&mut self, mut msg: NodeMessage) {
        let Some(ttl) = msg.ttl.checked_sub(1) else {
            warn!("drop message: TTL expired");
            return;
        };
        msg.ttl = ttl;
        let before = msg.receivers.len();
        msg.receivers.retain(|r| *r != self.id);
        if msg.receivers.len() != before {
            self.ship_locally(msg.content.clone());
        }
        if msg.receivers.is_empty() {
            return;
        }
        if msg.ttl == 0 {
            warn!("drop message: TTL expired");
            return;
        }
        self.ship(msg);
    }
}
