//! In-memory memoization of commit history fetches.
//!
//! Key: (sorted repository set, author, window bounds). A hit returns the
//! prior result with no network activity; a miss runs the supplied fetch
//! and stores the commits before returning. No eviction, no TTL — entries
//! live for the process lifetime. Two tasks racing on the same cold key may
//! both compute; the first insert wins and the duplicate work is harmless.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::errors::StatsEngineResult;
use crate::github::history::{CommitsByRepo, HistoryFetchOutcome};
use crate::model::{FailedUnit, RepoRef, TimeWindow};

/// Deterministic cache key for one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    repos: Vec<String>,
    author: String,
    window: TimeWindow,
}

impl CacheKey {
    /// Repository order does not affect the key: the set is sorted.
    pub fn new(repos: &[RepoRef], author: &str, window: &TimeWindow) -> Self {
        let mut repos: Vec<String> = repos.iter().map(RepoRef::full_name).collect();
        repos.sort();
        Self {
            repos,
            author: author.to_string(),
            window: *window,
        }
    }
}

/// What a cache lookup produced. Failed units are only reported on the
/// populating fetch; a hit implies no new network activity and therefore no
/// new failures.
#[derive(Debug)]
pub struct CacheLookup {
    pub commits_by_repo: Arc<CommitsByRepo>,
    pub failed_units: Vec<FailedUnit>,
    pub was_hit: bool,
}

/// Process-lifetime memoization table shared across workers.
#[derive(Debug, Default)]
pub struct FetchCache {
    inner: Mutex<HashMap<CacheKey, Arc<CommitsByRepo>>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for the key, or runs `fetch` and stores
    /// its commits. The lock is never held across the fetch await.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        repos: &[RepoRef],
        author: &str,
        window: &TimeWindow,
        fetch: F,
    ) -> StatsEngineResult<CacheLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StatsEngineResult<HistoryFetchOutcome>>,
    {
        let key = CacheKey::new(repos, author, window);

        if let Some(hit) = self.lookup(&key) {
            debug!(author, repos = repos.len(), "fetch cache hit");
            return Ok(CacheLookup {
                commits_by_repo: hit,
                failed_units: Vec::new(),
                was_hit: true,
            });
        }

        let outcome = fetch().await?;
        let commits = Arc::new(outcome.commits_by_repo);

        let stored = {
            let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            guard.entry(key).or_insert_with(|| commits.clone()).clone()
        };

        Ok(CacheLookup {
            commits_by_repo: stored,
            failed_units: outcome.failed_units,
            was_hit: false,
        })
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<CommitsByRepo>> {
        let guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        guard.get(key).cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn window() -> TimeWindow {
        TimeWindow {
            since: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            until: Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
        }
    }

    fn repos() -> Vec<RepoRef> {
        vec![
            RepoRef {
                owner: "acme".into(),
                name: "b".into(),
            },
            RepoRef {
                owner: "acme".into(),
                name: "a".into(),
            },
        ]
    }

    #[test]
    fn key_ignores_repository_order() {
        let forward = CacheKey::new(&repos(), "jdoe", &window());
        let mut reversed_repos = repos();
        reversed_repos.reverse();
        let reversed = CacheKey::new(&reversed_repos, "jdoe", &window());
        assert_eq!(forward, reversed);

        let other_author = CacheKey::new(&repos(), "other", &window());
        assert_ne!(forward, other_author);
    }

    #[tokio::test]
    async fn second_lookup_issues_no_fetch() {
        let cache = FetchCache::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let repos = repos();

        let first = cache
            .get_or_fetch(&repos, "jdoe", &window(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let mut map: CommitsByRepo = BTreeMap::new();
                map.insert("acme/a".into(), Vec::new());
                Ok(HistoryFetchOutcome {
                    commits_by_repo: map,
                    failed_units: vec![FailedUnit {
                        unit: "acme/b in batch 0".into(),
                        reason: "timeout".into(),
                    }],
                })
            })
            .await
            .unwrap();
        assert!(!first.was_hit);
        assert_eq!(first.failed_units.len(), 1);

        let second = cache
            .get_or_fetch(&repos, "jdoe", &window(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(HistoryFetchOutcome::default())
            })
            .await
            .unwrap();
        assert!(second.was_hit);
        // Identical result, and failures are not re-reported on a hit.
        assert!(Arc::ptr_eq(&first.commits_by_repo, &second.commits_by_repo));
        assert!(second.failed_units.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn distinct_windows_are_distinct_entries() {
        let cache = FetchCache::new();
        let w1 = window();
        let w2 = TimeWindow {
            since: w1.since,
            until: w1.until + chrono::Duration::days(1),
        };

        for w in [&w1, &w2] {
            cache
                .get_or_fetch(&repos(), "jdoe", w, || async {
                    Ok(HistoryFetchOutcome::default())
                })
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 2);
    }
}
