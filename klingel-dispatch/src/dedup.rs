//! Time-bounded set of already dispatched session ids.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Session ids seen within the last `ttl`
///
/// Entries are kept in insertion order next to the lookup map and pruned
/// lazily from the front on every insert, so memory stays proportional to
/// the number of sessions inside the window. An entry older than `ttl` no
/// longer counts as seen even before it has been pruned.
#[derive(Debug, Clone)]
pub struct DedupSet {
    ttl: Duration,
    seen: HashMap<String, Instant>,
    order: VecDeque<(Instant, String)>,
}

impl DedupSet {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether `session_id` was recorded less than `ttl` before `now`
    pub fn contains(&self, session_id: &str, now: Instant) -> bool {
        self.seen
            .get(session_id)
            .map_or(false, |&at| now.saturating_duration_since(at) < self.ttl)
    }

    /// Record `session_id` as seen at `now`, pruning expired entries first
    pub fn insert(&mut self, session_id: impl Into<String>, now: Instant) {
        self.prune(now);
        let session_id = session_id.into();
        self.seen.insert(session_id.clone(), now);
        self.order.push_back((now, session_id));
    }

    /// Drop every entry recorded `ttl` or more before `now`
    pub fn prune(&mut self, now: Instant) {
        while let Some((at, _)) = self.order.front() {
            if now.saturating_duration_since(*at) < self.ttl {
                break;
            }
            if let Some((at, session_id)) = self.order.pop_front() {
                // A re-inserted id has a newer timestamp in the map; keep it
                if self.seen.get(&session_id) == Some(&at) {
                    self.seen.remove(&session_id);
                }
            }
        }
    }

    /// Number of ids currently tracked, expired-but-unpruned ones included
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_contains_after_insert() {
        let start = Instant::now();
        let mut set = DedupSet::new(TTL);

        assert!(!set.contains("abc", start));
        set.insert("abc", start);
        assert!(set.contains("abc", start));
        assert!(set.contains("abc", start + Duration::from_secs(59)));
        assert!(!set.contains("other", start));
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let start = Instant::now();
        let mut set = DedupSet::new(TTL);
        set.insert("abc", start);

        assert!(!set.contains("abc", start + TTL));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_insert_prunes_expired_entries() {
        let start = Instant::now();
        let mut set = DedupSet::new(TTL);
        set.insert("a", start);
        set.insert("b", start + Duration::from_secs(30));

        set.insert("c", start + Duration::from_secs(61));
        assert_eq!(set.len(), 2);
        assert!(!set.contains("a", start + Duration::from_secs(61)));
        assert!(set.contains("b", start + Duration::from_secs(61)));
        assert!(set.contains("c", start + Duration::from_secs(61)));

        set.prune(start + Duration::from_secs(200));
        assert!(set.is_empty());
    }

    #[test]
    fn test_reinserted_id_survives_pruning_of_old_entry() {
        let start = Instant::now();
        let mut set = DedupSet::new(TTL);
        set.insert("abc", start);

        // Expired but not yet pruned, then seen again
        let later = start + Duration::from_secs(70);
        set.insert("abc", later);
        set.prune(later + Duration::from_secs(1));

        assert!(set.contains("abc", later + Duration::from_secs(1)));
        assert_eq!(set.len(), 1);
    }
}
