use std::collections::HashSet;

use serde::Serialize;

use super::matching::{Finding, Hit, MatchKey};

/// Ordered, deduplicating collection of hits gathered while scanning text.
///
/// Entries are keyed by `(pattern, start, end)`; the first hit inserted for a
/// key wins and later ones are ignored. Iteration follows insertion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchCask {
    hits: Vec<Hit>,
    #[serde(skip)]
    seen: HashSet<MatchKey>,
}

impl MatchCask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `hit` unless its key is already present. Returns whether it was added.
    pub fn add(&mut self, hit: impl Into<Hit>) -> bool {
        let hit = hit.into();
        if !self.seen.insert(hit.key()) {
            return false;
        }
        self.hits.push(hit);
        true
    }

    pub fn contains(&self, key: &MatchKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }
}

impl<'a> IntoIterator for &'a MatchCask {
    type Item = &'a Hit;
    type IntoIter = std::slice::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<Hit> for MatchCask {
    fn extend<I: IntoIterator<Item = Hit>>(&mut self, iter: I) {
        for hit in iter {
            self.add(hit);
        }
    }
}
