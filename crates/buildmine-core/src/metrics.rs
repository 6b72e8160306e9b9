//! Commit-level and window-level metric shapes.
//!
//! [`CommitMetrics`] is the one canonical shape stored in the commit cache.
//! A commit whose line counts could not all be determined is represented by
//! [`PartialCommitMetrics`] instead, which can still be folded into a window
//! total but can only reach the cache through [`PartialCommitMetrics::complete`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Churn and file-classification figures for one commit (or a sum of commits).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMetrics {
    /// Committer timestamp of the commit this was computed for.
    ///
    /// `None` for window sums and when the source did not report one.
    pub committed_at: Option<DateTime<Utc>>,
    /// Lines added to production files.
    pub production_added: u64,
    /// Lines removed from production files.
    pub production_removed: u64,
    /// Lines added to test files.
    pub tests_added: u64,
    /// Lines removed from test files.
    pub tests_removed: u64,
    /// Production files touched.
    pub production_files: u64,
    /// Documentation files touched.
    pub documentation_files: u64,
    /// Files that are neither test, production nor documentation.
    pub other_files: u64,
    /// Files added (or copied) by the commit.
    pub files_added: u64,
    /// Files removed by the commit.
    pub files_deleted: u64,
    /// Files modified or renamed by the commit.
    pub files_modified: u64,
    /// Distinct file extensions touched, with leading dot.
    pub extensions: BTreeSet<String>,
}

impl CommitMetrics {
    /// Add another commit's figures into this one.
    pub fn absorb(&mut self, other: &Self) {
        self.production_added += other.production_added;
        self.production_removed += other.production_removed;
        self.tests_added += other.tests_added;
        self.tests_removed += other.tests_removed;
        self.production_files += other.production_files;
        self.documentation_files += other.documentation_files;
        self.other_files += other.other_files;
        self.files_added += other.files_added;
        self.files_deleted += other.files_deleted;
        self.files_modified += other.files_modified;
        self.extensions.extend(other.extensions.iter().cloned());
    }
}

/// Commit figures as gathered, where any of the four line counts may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialCommitMetrics {
    /// Committer timestamp, if reported.
    pub committed_at: Option<DateTime<Utc>>,
    /// Production lines added, `None` if a production file lacked counts.
    pub production_added: Option<u64>,
    /// Production lines removed.
    pub production_removed: Option<u64>,
    /// Test lines added.
    pub tests_added: Option<u64>,
    /// Test lines removed.
    pub tests_removed: Option<u64>,
    /// Production files touched.
    pub production_files: u64,
    /// Documentation files touched.
    pub documentation_files: u64,
    /// Other files touched.
    pub other_files: u64,
    /// Files added or copied.
    pub files_added: u64,
    /// Files removed.
    pub files_deleted: u64,
    /// Files modified or renamed.
    pub files_modified: u64,
    /// Distinct extensions touched.
    pub extensions: BTreeSet<String>,
}

impl PartialCommitMetrics {
    /// Start a tally where all four line counts are known (zero).
    pub fn empty(committed_at: Option<DateTime<Utc>>) -> Self {
        Self {
            committed_at,
            production_added: Some(0),
            production_removed: Some(0),
            tests_added: Some(0),
            tests_removed: Some(0),
            ..Self::default()
        }
    }

    /// Whether all four line counts are known.
    pub const fn is_complete(&self) -> bool {
        self.production_added.is_some()
            && self.production_removed.is_some()
            && self.tests_added.is_some()
            && self.tests_removed.is_some()
    }

    /// The canonical shape, only when every required field is present.
    pub fn complete(&self) -> Option<CommitMetrics> {
        Some(CommitMetrics {
            committed_at: self.committed_at,
            production_added: self.production_added?,
            production_removed: self.production_removed?,
            tests_added: self.tests_added?,
            tests_removed: self.tests_removed?,
            production_files: self.production_files,
            documentation_files: self.documentation_files,
            other_files: self.other_files,
            files_added: self.files_added,
            files_deleted: self.files_deleted,
            files_modified: self.files_modified,
            extensions: self.extensions.clone(),
        })
    }

    /// Best-effort figures with unknown line counts read as zero.
    pub fn lossy(&self) -> CommitMetrics {
        CommitMetrics {
            committed_at: self.committed_at,
            production_added: self.production_added.unwrap_or(0),
            production_removed: self.production_removed.unwrap_or(0),
            tests_added: self.tests_added.unwrap_or(0),
            tests_removed: self.tests_removed.unwrap_or(0),
            production_files: self.production_files,
            documentation_files: self.documentation_files,
            other_files: self.other_files,
            files_added: self.files_added,
            files_deleted: self.files_deleted,
            files_modified: self.files_modified,
            extensions: self.extensions.clone(),
        }
    }
}

/// Aggregate over every commit charged to one build window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMetrics {
    /// Summed commit figures.
    pub totals: CommitMetrics,
    /// Commits charged to this window.
    pub commits_touched: usize,
    /// Size of the repository's contributor set once the window was processed.
    pub committers: usize,
}

impl WindowMetrics {
    /// Test lines per thousand added lines; zero when nothing was added.
    pub fn test_lines_per_kloc(&self) -> f64 {
        let added = self.totals.production_added + self.totals.tests_added;
        if added == 0 {
            0.0
        } else {
            self.totals.tests_added as f64 / added as f64 * 1000.0
        }
    }

    /// Production plus test lines added.
    pub const fn sloc(&self) -> u64 {
        self.totals.production_added + self.totals.tests_added
    }

    /// Production lines added plus removed.
    pub const fn src_churn(&self) -> u64 {
        self.totals.production_added + self.totals.production_removed
    }

    /// Test lines added plus removed.
    pub const fn test_churn(&self) -> u64 {
        self.totals.tests_added + self.totals.tests_removed
    }
}
