//! Peer identifiers for the overlay.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for an overlay peer.
///
/// Ids are short string labels with a total lexicographic order. The empty
/// label is reserved as the invalid id; routing code uses it as a sentinel
/// for "no peer".
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer id from a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The distinguished invalid id.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Check whether this is the invalid id.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Generate a random id (8 random bytes, hex-encoded).
    ///
    /// Used by the daemon when no id is configured and by test topologies.
    pub fn random() -> Self {
        let bytes: [u8; 8] = rand::random();
        Self(hex::encode(bytes))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

impl From<String> for PeerId {
    fn from(label: String) -> Self {
        Self(label)
    }
}
