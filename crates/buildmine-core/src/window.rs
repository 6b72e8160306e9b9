//! Commit-window aggregation.
//!
//! A build's window is the half-open interval
//! `(previous build completion, this build's creation]`. The aggregator
//! walks the repository history backward from the window end, one lazily
//! fetched page at a time, and stops at the first commit at or before the
//! window start. The first build of a repository has no start and is capped
//! at a fixed number of commits instead.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::cache::{CacheError, CommitCache};
use crate::fetch::fetch_commit_metrics;
use crate::metrics::{CommitMetrics, PartialCommitMetrics, WindowMetrics};
use crate::repo::RepoName;
use crate::source::{CommitQuery, CommitSummary, DataSource};

/// Commits examined for a repository's first build.
pub const COLD_START_COMMIT_LIMIT: usize = 100;

/// The commits attributable to one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildWindow {
    /// Completion time of the previous build; `None` on cold start.
    pub start: Option<DateTime<Utc>>,
    /// Creation time of this build.
    pub end: DateTime<Utc>,
    /// Sha the build ran on. A cached head is trusted by sha alone.
    pub head_sha: String,
}

impl BuildWindow {
    /// Whether this is the first build of the repository.
    pub const fn is_cold_start(&self) -> bool {
        self.start.is_none()
    }

    /// Whether a commit lies after the window's lower bound.
    ///
    /// History is listed newest first, so the first commit for which this is
    /// false ends the window.
    pub fn reaches(&self, committed_at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| committed_at > start)
    }
}

/// Limits applied while walking history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimits {
    /// Commits examined when the window has no start.
    pub cold_start_commit_limit: usize,
    /// Page size for history listing.
    pub per_page: u32,
}

impl Default for WindowLimits {
    fn default() -> Self {
        Self {
            cold_start_commit_limit: COLD_START_COMMIT_LIMIT,
            per_page: 100,
        }
    }
}

/// State shared by every window of one repository.
#[derive(Debug)]
pub struct MiningState {
    /// Metrics of commits already measured.
    pub cache: CommitCache,
    /// Author logins seen so far.
    pub contributors: HashSet<String>,
}

impl MiningState {
    /// Fresh state with a cache of the given capacity.
    pub fn new(cache_capacity: usize) -> Result<Self, CacheError> {
        Ok(Self {
            cache: CommitCache::new(cache_capacity)?,
            contributors: HashSet::new(),
        })
    }
}

/// One step of a [`CommitHistory`] walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPage {
    /// Commits of one page, newest first.
    Commits(Vec<CommitSummary>),
    /// The page could not be fetched; the walk ends here.
    Failed {
        /// 1-based number of the failed page.
        page: u32,
    },
}

/// Lazy, newest-first sequence of history pages.
///
/// Pages are requested only as the iterator is advanced. After a failed page
/// or the last page the iterator is exhausted; [`CommitHistory::restart`]
/// rewinds it to the first page.
pub struct CommitHistory<'a, S: ?Sized> {
    source: &'a S,
    repo: &'a RepoName,
    query: CommitQuery,
    finished: bool,
}

impl<'a, S: DataSource + ?Sized> CommitHistory<'a, S> {
    /// Walk history matching `query`, starting from `query.page`.
    pub const fn new(source: &'a S, repo: &'a RepoName, query: CommitQuery) -> Self {
        Self {
            source,
            repo,
            query,
            finished: false,
        }
    }

    /// Rewind to the first page.
    pub const fn restart(&mut self) {
        self.query.page = 1;
        self.finished = false;
    }
}

impl<S: DataSource + ?Sized> Iterator for CommitHistory<'_, S> {
    type Item = HistoryPage;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let page = self.query.page;
        match self.source.list_commits(self.repo, &self.query) {
            Some(listing) => {
                self.finished = !listing.has_more || listing.commits.is_empty();
                self.query.page += 1;
                Some(HistoryPage::Commits(listing.commits))
            }
            None => {
                self.finished = true;
                Some(HistoryPage::Failed { page })
            }
        }
    }
}

/// Running total for one window.
#[derive(Debug, Default)]
struct WindowFold {
    totals: CommitMetrics,
    touched: HashSet<String>,
}

impl WindowFold {
    fn is_touched(&self, sha: &str) -> bool {
        self.touched.contains(sha)
    }

    /// Charge a commit to the window once.
    fn charge(&mut self, sha: &str, metrics: &CommitMetrics) {
        if self.touched.insert(sha.to_string()) {
            self.totals.absorb(metrics);
        }
    }

    /// Charge freshly measured figures and cache them if they are complete.
    fn charge_measured(&mut self, sha: &str, measured: &PartialCommitMetrics, cache: &mut CommitCache) {
        self.charge(sha, &measured.lossy());
        match measured.complete() {
            Some(complete) => cache.put(sha, complete),
            None => debug!(%sha, "line counts incomplete, not caching"),
        }
    }
}

/// Aggregate every commit of `window` not yet charged to an earlier window.
///
/// Mutates the repository's cache and contributor set. A failed history page
/// ends the window early with the totals gathered so far.
#[instrument(skip_all, fields(repo = %repo, head = %window.head_sha, cold = window.is_cold_start()))]
pub fn aggregate<S: DataSource + ?Sized>(
    source: &S,
    repo: &RepoName,
    window: &BuildWindow,
    state: &mut MiningState,
    limits: &WindowLimits,
) -> WindowMetrics {
    let mut fold = WindowFold::default();

    let head = window.head_sha.as_str();
    if state.cache.get(head).is_none()
        && let Some(measured) = fetch_commit_metrics(source, repo, head, &mut state.contributors)
    {
        fold.charge_measured(head, &measured, &mut state.cache);
    }

    let query = CommitQuery {
        since: window.start,
        until: Some(window.end),
        page: 1,
        per_page: limits.per_page.max(1),
    };
    let cap = if window.is_cold_start() {
        limits.cold_start_commit_limit
    } else {
        usize::MAX
    };

    let in_window = CommitHistory::new(source, repo, query)
        .map_while(|page| match page {
            HistoryPage::Commits(commits) => Some(commits),
            HistoryPage::Failed { page } => {
                warn!(page, "commit listing failed, closing window early");
                None
            }
        })
        .flatten()
        .take_while(|commit| window.reaches(commit.committed_at))
        .take(cap);

    for commit in in_window {
        let sha = commit.sha.as_str();
        if fold.is_touched(sha) {
            continue;
        }

        if let Some(cached) = state.cache.get_verified(sha, Some(commit.committed_at)) {
            let cached = cached.clone();
            debug!(%sha, "cache hit");
            fold.charge(sha, &cached);
        } else if let Some(measured) = fetch_commit_metrics(source, repo, sha, &mut state.contributors) {
            fold.charge_measured(sha, &measured, &mut state.cache);
        }
    }

    let metrics = WindowMetrics {
        commits_touched: fold.touched.len(),
        committers: state.contributors.len(),
        totals: fold.totals,
    };
    debug!(
        commits = metrics.commits_touched,
        sloc = metrics.sloc(),
        "window aggregated"
    );
    metrics
}
