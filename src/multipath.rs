//! Source-routed dissemination trees.
//!
//! A [`Multipath`] encodes the branching forwarding plan for one message:
//! every node names a peer, children are the peers reached through it.
//! Linear paths from the routing layer are merged in with [`Multipath::splice`],
//! so a batch of unicast paths collapses into a single tree.


use std::fmt;

use crate::identity::PeerId;
use crate::message::wire::{put_str, put_u16, ByteReader, WireError};

/// Children grow in blocks of this many slots to amortize allocations.
const BLOCK_SIZE: usize = 16;

/// A tree of peer ids encoding a source-routed dissemination plan.
///
/// Children are kept strictly increasing by id; the tree never holds
/// duplicate siblings. Equality is structural.
#[derive(Clone, PartialEq, Eq)]
pub struct Multipath {
    id: PeerId,
    children: Vec<Multipath>,
}

impl Multipath {
    /// Create a tree consisting of a single node.
    pub fn new(id: impl Into<PeerId>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
        }
    }

    /// Build a linear chain from the given path.
    ///
    /// Returns `None` only for an empty path.
    pub fn from_linear(path: &[PeerId]) -> Option<Self> {
        let (first, rest) = path.split_first()?;
        let mut root = Multipath::new(first.clone());
        let mut cursor = &mut root;
        for id in rest {
            cursor = cursor.emplace_child(id.clone()).0;
        }
        Some(root)
    }

    /// The peer this node stands for.
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// The children in ascending id order.
    pub fn children(&self) -> &[Multipath] {
        &self.children
    }

    /// Check whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Ordered lookup of a direct child by id.
    pub fn child(&self, id: &PeerId) -> Option<&Multipath> {
        self.children
            .binary_search_by(|node| node.id.cmp(id))
            .ok()
            .map(|pos| &self.children[pos])
    }

    /// Find the child with the given id, inserting it in sorted position if
    /// absent. Returns the child and whether an insertion happened.
    pub fn emplace_child(&mut self, id: PeerId) -> (&mut Multipath, bool) {
        match self.children.binary_search_by(|node| node.id.cmp(&id)) {
            Ok(pos) => (&mut self.children[pos], false),
            Err(pos) => {
                if self.children.len() == self.children.capacity() {
                    self.children.reserve_exact(BLOCK_SIZE);
                }
                self.children.insert(pos, Multipath::new(id));
                (&mut self.children[pos], true)
            }
        }
    }

    /// Merge a linear path into the tree.
    ///
    /// An empty path is a no-op returning true. The path's first element must
    /// equal this node's id; otherwise the tree is left unchanged and false
    /// is returned. Remaining elements descend the tree, creating children
    /// on demand. Splicing the same path twice leaves the tree unchanged.
    pub fn splice(&mut self, path: &[PeerId]) -> bool {
        let Some((first, rest)) = path.split_first() else {
            return true;
        };
        if *first != self.id {
            return false;
        }
        let mut cursor = self;
        for id in rest {
            cursor = cursor.emplace_child(id.clone()).0;
        }
        true
    }

    /// Total number of nodes in the tree, the root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Multipath::node_count).sum::<usize>()
    }

    // -- wire form ----------------------------------------------------------

    /// Encode the tree: id, then child count, then children recursively.
    /// An empty children sequence encodes as a zero count.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        put_str(buf, self.id.as_str());
        put_u16(buf, self.children.len() as u16);
        for child in &self.children {
            child.encode(buf);
        }
    }

    /// Decode a tree, requiring the buffer to be fully consumed.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut reader = ByteReader::new(buf);
        let path = Self::decode_from(&mut reader)?;
        if reader.remaining() > 0 {
            return Err(WireError::TrailingBytes(reader.remaining()));
        }
        Ok(path)
    }

    fn decode_from(reader: &mut ByteReader<'_>) -> Result<Self, WireError> {
        let id = PeerId::new(reader.str()?);
        let count = reader.u16()? as usize;
        let mut node = Multipath::new(id);
        for _ in 0..count {
            let child = Self::decode_from(reader)?;
            // The wire form must respect the sibling order invariant.
            if let Some(last) = node.children.last() {
                if *last.id() >= child.id {
                    return Err(WireError::Malformed(
                        "multipath children out of order".into(),
                    ));
                }
            }
            node.children.push(child);
        }
        Ok(node)
    }
}

impl fmt::Debug for Multipath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Multipath {
    /// Renders `("a", [("b"), ("c")])`, eliding empty children sequences.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(\"{}\"", self.id)?;
        if !self.children.is_empty() {
            f.write_str(", [")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt::Display::fmt(child, f)?;
            }
            f.write_str("]")?;
        }
        f.write_str(")")
    }
}
