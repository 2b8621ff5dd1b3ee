use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;

use crate::grammar::node::NodeId;
use crate::results::ParseResults;

/// A node matched: where it ended and what it produced
#[derive(Debug, Clone)]
pub(crate) struct Success {
    pub(crate) end: usize,
    pub(crate) results: ParseResults,
}

/// A node did not match
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fail {
    pub(crate) offset: usize,
    pub(crate) message: Arc<str>,
    pub(crate) fatal: bool,
}

impl Fail {
    pub(crate) fn new(offset: usize, message: &Arc<str>) -> Self {
        Self {
            offset,
            message: Arc::clone(message),
            fatal: false,
        }
    }

    pub(crate) fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

/// Memoized outcome of evaluating one node at one offset
#[derive(Debug, Clone)]
pub(crate) struct MemoEntry {
    pub(crate) outcome: Result<Success, Fail>,
    /// Furthest failure recorded while computing `outcome`
    pub(crate) furthest: Option<Fail>,
}

type MemoTable = HashMap<(NodeId, usize), MemoEntry, ahash::RandomState>;

/// Packrat memoization table for one session
///
/// Keyed by `(node, offset)`. Entries are valid only for the text the
/// session was created with.
///
/// Outcomes of action nodes live in a separate table that is never cleared
/// for size, so a user callback runs at most once per `(node, offset)`.
/// Everything else is bounded by `max_size` and recomputed after a clear.
#[derive(Debug)]
pub(crate) struct PackratCache {
    entries: MemoTable,
    pinned: MemoTable,
    max_size: usize,
}

impl PackratCache {
    pub(crate) fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::with_hasher(ahash::RandomState::new()),
            pinned: HashMap::with_hasher(ahash::RandomState::new()),
            max_size,
        }
    }

    pub(crate) fn get(&self, node: NodeId, offset: usize) -> Option<&MemoEntry> {
        let key = (node, offset);
        self.pinned.get(&key).or_else(|| self.entries.get(&key))
    }

    /// Store an entry; returns true if the bounded table had to be cleared first
    pub(crate) fn insert(&mut self, node: NodeId, offset: usize, entry: MemoEntry, pinned: bool) -> bool {
        if pinned {
            self.pinned.insert((node, offset), entry);
            return false;
        }
        let evicted = self.entries.len() >= self.max_size;
        if evicted {
            log::trace!("packrat cache full at {} entries, clearing", self.entries.len());
            self.entries.clear();
        }
        self.entries.insert((node, offset), entry);
        evicted
    }

    /// Drop every entry, pinned ones included
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.pinned.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len() + self.pinned.len()
    }
}

/// Counters for one session, accumulated over its parses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseMetrics {
    /// Lookups answered from the cache
    pub cache_hits: usize,
    /// Lookups that had to evaluate
    pub cache_misses: usize,
    /// Times the cache was cleared for exceeding its bound
    pub cache_evictions: usize,
    /// Node evaluations, memoized or not
    pub evaluations: usize,
    pub parse_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(end: usize) -> MemoEntry {
        MemoEntry {
            outcome: Ok(Success {
                end,
                results: ParseResults::new(),
            }),
            furthest: None,
        }
    }

    #[test]
    fn test_cache_roundtrip() {
        let mut cache = PackratCache::new(16);
        assert!(cache.get(3, 0).is_none());
        assert!(!cache.insert(3, 0, entry(2), false));
        let hit = cache.get(3, 0).expect("entry stored");
        assert!(matches!(hit.outcome, Ok(Success { end: 2, .. })));
        assert!(cache.get(3, 1).is_none());
    }

    #[test]
    fn test_cache_clears_when_full() {
        let mut cache = PackratCache::new(2);
        cache.insert(0, 0, entry(1), false);
        cache.insert(1, 0, entry(1), false);
        assert!(cache.insert(2, 0, entry(1), false));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(0, 0).is_none());
        assert!(cache.get(2, 0).is_some());
    }

    #[test]
    fn test_pinned_entries_survive_clearing() {
        let mut cache = PackratCache::new(1);
        cache.insert(7, 0, entry(1), true);
        cache.insert(0, 0, entry(1), false);
        assert!(cache.insert(1, 0, entry(1), false));
        assert!(cache.get(7, 0).is_some());
        assert!(cache.get(0, 0).is_none());

        cache.clear();
        assert!(cache.get(7, 0).is_none());
        assert_eq!(cache.len(), 0);
    }
}
