//! Subscription filters: ordered sets of topic prefixes.

use std::fmt;
use std::slice;

use serde::{Deserialize, Serialize};

use crate::topic::Topic;

/// An ordered set of topic prefixes expressing what a peer wants to receive.
///
/// Backed by a sorted, deduplicated vector. Insertion keeps the order; the
/// matcher checks whether any stored prefix covers a given topic.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Vec<Topic>);

impl Filter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter from arbitrary topics, sorting and deduplicating.
    pub fn from_topics<I, T>(topics: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Topic>,
    {
        let mut entries: Vec<Topic> = topics.into_iter().map(Into::into).collect();
        entries.sort();
        entries.dedup();
        Self(entries)
    }

    /// Insert a single prefix, keeping the set sorted.
    ///
    /// Returns true if the filter changed.
    pub fn insert(&mut self, topic: Topic) -> bool {
        match self.0.binary_search(&topic) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, topic);
                true
            }
        }
    }

    /// Insert every prefix of `other` that satisfies `pred`.
    ///
    /// Returns true if the filter changed.
    pub fn extend_if<F>(&mut self, other: &Filter, pred: F) -> bool
    where
        F: Fn(&Topic) -> bool,
    {
        let mut changed = false;
        for topic in &other.0 {
            if pred(topic) {
                changed |= self.insert(topic.clone());
            }
        }
        changed
    }

    /// Insert every prefix of `other`. Returns true if the filter changed.
    pub fn extend(&mut self, other: &Filter) -> bool {
        self.extend_if(other, |_| true)
    }

    /// Check whether any stored prefix covers `topic`.
    pub fn matches(&self, topic: &Topic) -> bool {
        self.0.iter().any(|prefix| topic.has_prefix(prefix))
    }

    /// Check whether the filter holds no prefixes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of stored prefixes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the stored prefixes in order.
    pub fn iter(&self) -> slice::Iter<'_, Topic> {
        self.0.iter()
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a Filter {
    type Item = &'a Topic;
    type IntoIter = slice::Iter<'a, Topic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
