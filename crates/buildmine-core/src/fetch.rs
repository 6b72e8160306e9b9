//! Per-commit measurement.
//!
//! Turns one commit's diff into [`PartialCommitMetrics`] by classifying every
//! changed file, and records the commit author as a repository contributor.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::classify::{FileCategory, classify, dotted_extension};
use crate::metrics::PartialCommitMetrics;
use crate::repo::RepoName;
use crate::source::{ChangeType, CommitDetail, DataSource};

/// Measure a commit diff.
///
/// A production or test file without a line count makes the matching pair
/// of counters unknown, which keeps the result out of the commit cache.
pub fn measure(detail: &CommitDetail) -> PartialCommitMetrics {
    let mut metrics = PartialCommitMetrics::empty(detail.committed_at);

    for file in &detail.files {
        match classify(&file.path) {
            FileCategory::Test => {
                metrics.tests_added = add(metrics.tests_added, file.lines_added);
                metrics.tests_removed = add(metrics.tests_removed, file.lines_removed);
            }
            FileCategory::Production => {
                metrics.production_added = add(metrics.production_added, file.lines_added);
                metrics.production_removed = add(metrics.production_removed, file.lines_removed);
                metrics.production_files += 1;
            }
            FileCategory::Documentation => metrics.documentation_files += 1,
            FileCategory::Other => metrics.other_files += 1,
        }

        match file.change_type {
            ChangeType::Added | ChangeType::Copied => metrics.files_added += 1,
            ChangeType::Removed => metrics.files_deleted += 1,
            _ => metrics.files_modified += 1,
        }

        let ext = dotted_extension(&file.path);
        if !ext.is_empty() {
            metrics.extensions.insert(ext);
        }
    }

    metrics
}

fn add(total: Option<u64>, lines: Option<u64>) -> Option<u64> {
    Some(total? + lines?)
}

/// Fetch and measure one commit, adding its author to `contributors`.
///
/// Returns `None` when the source could not supply the commit.
pub fn fetch_commit_metrics<S: DataSource + ?Sized>(
    source: &S,
    repo: &RepoName,
    sha: &str,
    contributors: &mut HashSet<String>,
) -> Option<PartialCommitMetrics> {
    let Some(detail) = source.fetch_commit_detail(repo, sha) else {
        warn!(%repo, %sha, "commit detail unavailable, skipping commit");
        return None;
    };

    if let Some(login) = &detail.author_login
        && contributors.insert(login.clone())
    {
        debug!(%login, total = contributors.len(), "new contributor");
    }

    let metrics = measure(&detail);
    debug!(
        %sha,
        files = detail.files.len(),
        complete = metrics.is_complete(),
        "measured commit"
    );
    Some(metrics)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::source::FileChange;
    use crate::source::fake::FakeSource;

    fn change(path: &str, added: Option<u64>, removed: Option<u64>, kind: ChangeType) -> FileChange {
        FileChange {
            path: path.to_string(),
            lines_added: added,
            lines_removed: removed,
            change_type: kind,
        }
    }

    fn detail(sha: &str, author: Option<&str>, files: Vec<FileChange>) -> CommitDetail {
        CommitDetail {
            sha: sha.to_string(),
            committed_at: None,
            author_login: author.map(str::to_string),
            files,
        }
    }

    #[test]
    fn measure_splits_lines_by_category() {
        let d = detail(
            "a",
            None,
            vec![
                change("src/lib.py", Some(10), Some(2), ChangeType::Modified),
                change("tests/test_lib.py", Some(5), Some(1), ChangeType::Added),
                change("README.md", Some(3), Some(0), ChangeType::Modified),
                change("logo.png", Some(0), Some(0), ChangeType::Removed),
                change("Makefile", Some(1), Some(1), ChangeType::Renamed),
            ],
        );

        let m = measure(&d).complete().unwrap();
        assert_eq!(m.production_added, 10);
        assert_eq!(m.production_removed, 2);
        assert_eq!(m.tests_added, 5);
        assert_eq!(m.tests_removed, 1);
        assert_eq!(m.production_files, 1);
        assert_eq!(m.documentation_files, 1);
        assert_eq!(m.other_files, 2);
        assert_eq!(m.files_added, 1);
        assert_eq!(m.files_deleted, 1);
        assert_eq!(m.files_modified, 3);
        assert_eq!(
            m.extensions,
            BTreeSet::from([".md".to_string(), ".png".to_string(), ".py".to_string()])
        );
    }

    #[test]
    fn missing_count_on_source_file_is_incomplete() {
        let d = detail(
            "a",
            None,
            vec![
                change("src/big.js", None, Some(4), ChangeType::Modified),
                change("spec/a_spec.rb", Some(2), Some(0), ChangeType::Modified),
            ],
        );

        let m = measure(&d);
        assert!(!m.is_complete());
        assert_eq!(m.production_added, None);
        assert_eq!(m.production_removed, Some(4));
        assert_eq!(m.tests_added, Some(2));
    }

    #[test]
    fn missing_count_on_other_file_is_ignored() {
        let d = detail("a", None, vec![change("data.bin", None, None, ChangeType::Added)]);
        assert!(measure(&d).is_complete());
    }

    #[test]
    fn fetch_records_distinct_authors() {
        let repo = RepoName::new("o", "r");
        let mut source = FakeSource::default();
        source.details.insert("a".into(), detail("a", Some("ann"), vec![]));
        source.details.insert("b".into(), detail("b", Some("bob"), vec![]));
        source.details.insert("c".into(), detail("c", Some("ann"), vec![]));
        source.details.insert("d".into(), detail("d", None, vec![]));

        let mut contributors = HashSet::new();
        for sha in ["a", "b", "c", "d"] {
            assert!(fetch_commit_metrics(&source, &repo, sha, &mut contributors).is_some());
        }
        assert_eq!(contributors.len(), 2);
    }

    #[test]
    fn fetch_of_missing_commit_is_absent() {
        let repo = RepoName::new("o", "r");
        let source = FakeSource::default();
        let mut contributors = HashSet::new();
        assert!(fetch_commit_metrics(&source, &repo, "nope", &mut contributors).is_none());
        assert!(contributors.is_empty());
    }
}
