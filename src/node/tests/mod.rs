//! Node test helpers: in-process topologies wired with link channels.

use super::*;

use std::collections::HashMap;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::filter::Filter;
use crate::message::{CommandMessage, DataMessage, NodeMessage};
use crate::transport::{peer_channel, PeerEvent};

mod lifecycle;

pub(super) fn make_node(id: &str) -> Node {
    Node::with_id(PeerId::new(id), Config::new())
}

pub(super) fn make_node_with_ttl(id: &str, ttl: u16) -> Node {
    let mut config = Config::new();
    config.node.ttl = Some(ttl);
    Node::with_id(PeerId::new(id), config)
}

pub(super) fn data_msg(topic: &str) -> DataMessage {
    DataMessage::new(topic, topic.as_bytes().to_vec())
}

pub(super) fn node_msg(topic: &str, ttl: u16, receivers: &[&str]) -> NodeMessage {
    NodeMessage::new(
        data_msg(topic),
        ttl,
        receivers.iter().map(|r| PeerId::new(*r)).collect(),
    )
}

/// Attach a worker path to the node, returning the receiving end.
pub(super) fn attach_worker(node: &mut Node) -> UnboundedReceiver<DataMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    node.dispatch_event(Event::AddWorker(tx));
    rx
}

/// Attach a store path to the node, returning the receiving end.
pub(super) fn attach_store(node: &mut Node) -> UnboundedReceiver<CommandMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    node.dispatch_event(Event::AddStore(tx));
    rx
}

pub(super) fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}

/// One directed link: events sent by `sender` on their handle for
/// `receiver`, waiting to be pumped into the receiver's node.
struct Link {
    sender: PeerId,
    receiver: PeerId,
    rx: UnboundedReceiver<PeerEvent>,
}

/// A small in-process topology of nodes joined by link channels.
///
/// `pump` plays the transport: it drains every link and feeds the events
/// into the receiving node's handlers until the whole net is quiescent.
pub(super) struct TestNet {
    nodes: Vec<Node>,
    index: HashMap<PeerId, usize>,
    links: Vec<Link>,
}

impl TestNet {
    pub(super) fn new(ids: &[&str]) -> Self {
        let mut nodes = Vec::new();
        let mut index = HashMap::new();
        for id in ids {
            index.insert(PeerId::new(*id), nodes.len());
            nodes.push(make_node(id));
        }
        Self {
            nodes,
            index,
            links: Vec::new(),
        }
    }

    pub(super) fn node(&self, id: &str) -> &Node {
        &self.nodes[self.index[&PeerId::new(id)]]
    }

    pub(super) fn node_mut(&mut self, id: &str) -> &mut Node {
        let idx = self.index[&PeerId::new(id)];
        &mut self.nodes[idx]
    }

    /// Connect two nodes with a bidirectional pair of links.
    pub(super) fn connect(&mut self, a: &str, b: &str) {
        self.connect_directed(a, b);
        self.connect_directed(b, a);
    }

    fn connect_directed(&mut self, from: &str, to: &str) {
        let (handle, rx) = peer_channel();
        let from_id = PeerId::new(from);
        let to_id = PeerId::new(to);
        self.node_mut(from).peer_connected(to_id.clone(), handle);
        self.links.push(Link {
            sender: from_id,
            receiver: to_id,
            rx,
        });
    }

    /// Tear down the connection between two nodes, both directions.
    pub(super) fn disconnect(&mut self, a: &str, b: &str) {
        let a_id = PeerId::new(a);
        let b_id = PeerId::new(b);
        self.node_mut(a).peer_disconnected(&b_id, None);
        self.node_mut(b).peer_disconnected(&a_id, None);
        self.links
            .retain(|l| !(l.sender == a_id && l.receiver == b_id) && !(l.sender == b_id && l.receiver == a_id));
    }

    /// Deliver link traffic until the net is quiescent.
    ///
    /// Returns the number of events delivered; a follow-up call returning 0
    /// demonstrates the flood terminated.
    pub(super) fn pump(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            let mut progress = false;
            for link in &mut self.links {
                while let Ok(event) = link.rx.try_recv() {
                    progress = true;
                    delivered += 1;
                    let idx = self.index[&link.receiver];
                    let node = &mut self.nodes[idx];
                    match event {
                        PeerEvent::FilterUpdate {
                            path,
                            filter,
                            timestamp,
                        } => node.handle_filter_update(path, filter, timestamp),
                        PeerEvent::Publication(msg) => node.handle_publication(msg),
                        PeerEvent::Batch(batch) => node.dispatch_event(Event::PeerBatch {
                            sender: link.sender.clone(),
                            batch,
                        }),
                    }
                }
            }
            if !progress {
                return delivered;
            }
        }
    }

    /// Drain the raw events queued on the link from `from` to `to` without
    /// delivering them.
    pub(super) fn take_link_events(&mut self, from: &str, to: &str) -> Vec<PeerEvent> {
        let from_id = PeerId::new(from);
        let to_id = PeerId::new(to);
        let link = self
            .links
            .iter_mut()
            .find(|l| l.sender == from_id && l.receiver == to_id)
            .expect("no such link");
        let mut events = Vec::new();
        while let Ok(event) = link.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Subscribe `node` to `topics` without going through the overlay.
pub(super) fn subscribe(node: &mut Node, topics: &[&str]) {
    node.subscribe(&Filter::from_topics(topics.iter().copied()));
}
