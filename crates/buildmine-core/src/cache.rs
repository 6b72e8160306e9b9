//! Bounded, recency-ordered commit cache.
//!
//! The cache answers "has this commit already been measured" for one
//! repository's processing session. It only stores [`CommitMetrics`], the
//! complete shape; partial tallies cannot be inserted (see
//! [`PartialCommitMetrics::complete`](crate::metrics::PartialCommitMetrics::complete)).

use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use lru::LruCache;
use thiserror::Error;
use tracing::debug;

use crate::metrics::CommitMetrics;

/// Capacity used when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Errors constructing a [`CommitCache`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheError {
    /// Capacity must be at least one entry.
    #[error("commit cache capacity must be positive")]
    ZeroCapacity,
}

/// Fixed-capacity LRU map from commit sha to its metrics.
#[derive(Debug)]
pub struct CommitCache {
    entries: LruCache<String, CommitMetrics>,
}

impl CommitCache {
    /// Create a cache holding at most `capacity` commits.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity)?;
        Ok(Self {
            entries: LruCache::new(capacity),
        })
    }

    /// Look up a commit, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, sha: &str) -> Option<&CommitMetrics> {
        self.entries.get(sha)
    }

    /// Look up a commit whose committer timestamp is known.
    ///
    /// An entry recorded for a different timestamp is stale (the sha was
    /// reused or history was rewritten); it is dropped and reported as a miss.
    pub fn get_verified(
        &mut self,
        sha: &str,
        committed_at: Option<DateTime<Utc>>,
    ) -> Option<&CommitMetrics> {
        let stale = match (self.entries.peek(sha), committed_at) {
            (Some(cached), Some(expected)) => cached
                .committed_at
                .is_some_and(|recorded| recorded != expected),
            _ => false,
        };
        if stale {
            debug!(%sha, "dropping stale cache entry");
            self.entries.pop(sha);
            return None;
        }
        self.entries.get(sha)
    }

    /// Insert or refresh a commit, evicting the least-recently-used entry when full.
    pub fn put(&mut self, sha: impl Into<String>, metrics: CommitMetrics) {
        let sha = sha.into();
        if let Some((evicted, _)) = self.entries.push(sha.clone(), metrics)
            && evicted != sha
        {
            debug!(sha = %evicted, "evicted commit from cache");
        }
    }

    /// Remove a commit.
    pub fn delete(&mut self, sha: &str) -> Option<CommitMetrics> {
        self.entries.pop(sha)
    }

    /// Whether a commit is cached, without touching recency.
    pub fn contains(&self, sha: &str) -> bool {
        self.entries.contains(sha)
    }

    /// Number of cached commits.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached commits.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn metrics(added: u64) -> CommitMetrics {
        CommitMetrics {
            production_added: added,
            ..CommitMetrics::default()
        }
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(CommitCache::new(0).unwrap_err(), CacheError::ZeroCapacity);
    }

    #[test]
    fn overflow_evicts_first_inserted() {
        let n = 3;
        let mut cache = CommitCache::new(n).unwrap();
        for i in 0..=n {
            cache.put(format!("c{i}"), metrics(i as u64));
        }

        assert!(!cache.contains("c0"));
        for i in 1..=n {
            assert!(cache.contains(&format!("c{i}")));
        }
        assert_eq!(cache.len(), n);
    }

    #[test]
    fn get_promotes_entry() {
        let n = 3;
        let mut cache = CommitCache::new(n).unwrap();
        for i in 0..n {
            cache.put(format!("c{i}"), metrics(i as u64));
        }

        assert!(cache.get("c0").is_some());
        cache.put("d0", metrics(100));

        assert!(cache.contains("c0"), "promoted key must survive");
        assert!(!cache.contains("c1"), "next-oldest key is evicted");
    }

    #[test]
    fn promoted_key_survives_until_n_more_puts() {
        let n = 4;
        let mut cache = CommitCache::new(n).unwrap();
        for i in 0..n {
            cache.put(format!("c{i}"), metrics(0));
        }
        assert!(cache.get("c0").is_some());

        for i in 0..n - 1 {
            cache.put(format!("new{i}"), metrics(0));
        }
        assert!(cache.contains("c0"));

        cache.put("one-more", metrics(0));
        assert!(!cache.contains("c0"));
    }

    #[test]
    fn reinsert_promotes_and_replaces() {
        let mut cache = CommitCache::new(2).unwrap();
        cache.put("a", metrics(1));
        cache.put("b", metrics(2));
        cache.put("a", metrics(3));
        cache.put("c", metrics(4));

        assert_eq!(cache.get("a").map(|m| m.production_added), Some(3));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn delete_removes_entry() {
        let mut cache = CommitCache::new(2).unwrap();
        cache.put("a", metrics(1));
        assert_eq!(cache.delete("a").map(|m| m.production_added), Some(1));
        assert!(cache.get("a").is_none());
        assert!(cache.delete("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn verified_get_drops_mismatched_timestamp() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut cache = CommitCache::new(4).unwrap();
        cache.put(
            "a",
            CommitMetrics {
                committed_at: Some(t1),
                ..CommitMetrics::default()
            },
        );

        assert!(cache.get_verified("a", Some(t1)).is_some());
        assert!(cache.get_verified("a", None).is_some());
        assert!(cache.get_verified("a", Some(t2)).is_none());
        assert!(!cache.contains("a"));
    }

    #[test]
    fn capacity_is_reported() {
        assert_eq!(CommitCache::new(DEFAULT_CAPACITY).unwrap().capacity(), 10_000);
    }
}
