//! Topics: path-like message addresses with prefix semantics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix marking topics reserved for internal use. Internal topics never
/// enter the advertised subscription filter.
pub const INTERNAL_PREFIX: &str = "<$>";

/// Suffix identifying intra-store clone traffic. Messages on such topics are
/// delivered locally but never relayed across peers.
pub const CLONE_SUFFIX: &str = "/data/clone";

/// Suffix identifying store master traffic (the clone suffix counterpart).
pub const MASTER_SUFFIX: &str = "/data/master";

/// A path-like topic string, e.g. `zeek/events/http`.
///
/// Topics form a hierarchy through plain string prefixes: a subscription to
/// `a/b` covers `a/b/c` as well as `a/bc`. Matching is intentionally the
/// cheap string comparison rather than per-segment splitting.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Create a topic from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The topic as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the topic is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether this topic is reserved for internal use.
    pub fn is_internal(&self) -> bool {
        self.0.starts_with(INTERNAL_PREFIX)
    }

    /// Check whether `prefix` is a string prefix of this topic.
    pub fn has_prefix(&self, prefix: &Topic) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Check whether this topic carries intra-store clone traffic.
    pub fn ends_with_clone_suffix(&self) -> bool {
        self.0.ends_with(CLONE_SUFFIX)
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.0)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        Self(name)
    }
}
