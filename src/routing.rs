//! Routing table: direct neighbors and distance vectors.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashMap;

use crate::identity::PeerId;
use crate::transport::PeerHandle;

/// Routing state for one direct neighbor.
///
/// The entry's existence encodes distance 1. `distances` records indirect
/// reachability only: peers reachable *through* this neighbor, with path
/// lengths of at least 2, learned from flooded subscription paths.
#[derive(Clone, Debug)]
pub struct RouteEntry {
    /// Token for addressing the neighbor through the transport.
    pub handle: PeerHandle,
    /// Indirect peer id -> shortest known path length (>= 2).
    pub distances: HashMap<PeerId, usize>,
}

impl RouteEntry {
    pub fn new(handle: PeerHandle) -> Self {
        Self {
            handle,
            distances: HashMap::new(),
        }
    }
}

/// Per-node view of reachable peers.
///
/// Keyed by neighbor id in a `BTreeMap` so iteration is ordered; together
/// with the explicit tie-break in [`RoutingTable::shortest_first_hop`] this
/// keeps path selection fully deterministic.
#[derive(Clone, Debug, Default)]
pub struct RoutingTable {
    entries: BTreeMap<PeerId, RouteEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry for a new direct neighbor, replacing any previous one.
    pub fn insert(&mut self, peer: PeerId, entry: RouteEntry) {
        self.entries.insert(peer, entry);
    }

    /// Remove a direct neighbor. Indirect distances recorded on *other*
    /// entries are left alone: the removed peer may remain reachable
    /// through them.
    pub fn remove(&mut self, peer: &PeerId) -> Option<RouteEntry> {
        self.entries.remove(peer)
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.entries.contains_key(peer)
    }

    pub fn get(&self, peer: &PeerId) -> Option<&RouteEntry> {
        self.entries.get(peer)
    }

    pub fn get_mut(&mut self, peer: &PeerId) -> Option<&mut RouteEntry> {
        self.entries.get_mut(peer)
    }

    /// Iterate over `(neighbor, entry)` pairs in id order.
    pub fn iter(&self) -> btree_map::Iter<'_, PeerId, RouteEntry> {
        self.entries.iter()
    }

    /// Iterate over direct neighbor ids in order.
    pub fn neighbors(&self) -> impl Iterator<Item = &PeerId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record an indirect path to `origin` through the neighbor `via`,
    /// keeping the minimum of the recorded and offered distance.
    pub fn record_distance(&mut self, via: &PeerId, origin: PeerId, distance: usize) {
        if let Some(entry) = self.entries.get_mut(via) {
            entry
                .distances
                .entry(origin)
                .and_modify(|d| *d = (*d).min(distance))
                .or_insert(distance);
        }
    }

    /// Shortest known distance to `target`: 1 for a direct neighbor, else
    /// the minimum over all recorded indirect paths, else `None`.
    pub fn distance_to(&self, target: &PeerId) -> Option<usize> {
        if self.entries.contains_key(target) {
            return Some(1);
        }
        self.entries
            .values()
            .filter_map(|entry| entry.distances.get(target).copied())
            .min()
    }

    /// The neighbor to forward through for `target`.
    ///
    /// A direct neighbor is its own first hop. Otherwise the neighbor with
    /// the minimum recorded distance wins; ties go to the lexicographically
    /// smallest neighbor id. Returns `None` when no path is known.
    pub fn shortest_first_hop(&self, target: &PeerId) -> Option<&PeerId> {
        if let Some((peer, _)) = self.entries.get_key_value(target) {
            return Some(peer);
        }
        let mut best: Option<(&PeerId, usize)> = None;
        for (peer, entry) in &self.entries {
            if let Some(&distance) = entry.distances.get(target) {
                // Ascending iteration order means a strict comparison keeps
                // the smallest id among equally distant neighbors.
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((peer, distance));
                }
            }
        }
        best.map(|(peer, _)| peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::peer_channel;

    fn table_with(neighbors: &[&str]) -> RoutingTable {
        let mut tbl = RoutingTable::new();
        for n in neighbors {
            let (handle, _rx) = peer_channel();
            tbl.insert(PeerId::new(*n), RouteEntry::new(handle));
        }
        tbl
    }

    #[test]
    fn test_direct_neighbor_distance_is_one() {
        let tbl = table_with(&["b"]);
        assert_eq!(tbl.distance_to(&PeerId::new("b")), Some(1));
    }

    #[test]
    fn test_indirect_distance_is_minimum() {
        let mut tbl = table_with(&["b", "c"]);
        tbl.record_distance(&PeerId::new("b"), PeerId::new("z"), 4);
        tbl.record_distance(&PeerId::new("c"), PeerId::new("z"), 2);
        assert_eq!(tbl.distance_to(&PeerId::new("z")), Some(2));
    }

    #[test]
    fn test_unknown_peer_is_unreachable() {
        let tbl = table_with(&["b"]);
        assert_eq!(tbl.distance_to(&PeerId::new("z")), None);
        assert_eq!(tbl.shortest_first_hop(&PeerId::new("z")), None);
    }

    #[test]
    fn test_record_distance_keeps_minimum() {
        let mut tbl = table_with(&["b"]);
        tbl.record_distance(&PeerId::new("b"), PeerId::new("z"), 5);
        tbl.record_distance(&PeerId::new("b"), PeerId::new("z"), 3);
        tbl.record_distance(&PeerId::new("b"), PeerId::new("z"), 7);
        assert_eq!(tbl.distance_to(&PeerId::new("z")), Some(3));
    }

    #[test]
    fn test_first_hop_prefers_direct() {
        let mut tbl = table_with(&["b", "c"]);
        tbl.record_distance(&PeerId::new("c"), PeerId::new("b"), 2);
        assert_eq!(tbl.shortest_first_hop(&PeerId::new("b")), Some(&PeerId::new("b")));
    }

    #[test]
    fn test_first_hop_prefers_shorter_path() {
        let mut tbl = table_with(&["b", "c"]);
        tbl.record_distance(&PeerId::new("b"), PeerId::new("z"), 4);
        tbl.record_distance(&PeerId::new("c"), PeerId::new("z"), 2);
        assert_eq!(tbl.shortest_first_hop(&PeerId::new("z")), Some(&PeerId::new("c")));
    }

    #[test]
    fn test_first_hop_tie_breaks_on_smallest_id() {
        let mut tbl = table_with(&["x", "y"]);
        tbl.record_distance(&PeerId::new("y"), PeerId::new("z"), 2);
        tbl.record_distance(&PeerId::new("x"), PeerId::new("z"), 2);
        assert_eq!(tbl.shortest_first_hop(&PeerId::new("z")), Some(&PeerId::new("x")));
    }

    #[test]
    fn test_remove_keeps_other_entries_distances() {
        let mut tbl = table_with(&["b", "c"]);
        tbl.record_distance(&PeerId::new("c"), PeerId::new("b"), 3);
        tbl.remove(&PeerId::new("b"));
        // "b" is gone as a direct neighbor but still reachable through "c".
        assert_eq!(tbl.distance_to(&PeerId::new("b")), Some(3));
    }
}
