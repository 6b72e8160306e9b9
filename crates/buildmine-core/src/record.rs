//! The per-build output row.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::ecosystem::{BuildLanguage, TestFramework};

/// Output column names, in file order.
pub const COLUMNS: &[&str] = &[
    "repo",
    "id_build",
    "branch",
    "commit_sha",
    "languages",
    "status",
    "conclusion",
    "created_at",
    "updated_at",
    "build_duration",
    "total_builds",
    "gh_files_added",
    "gh_files_deleted",
    "gh_files_modified",
    "tests_ran",
    "gh_lines_added",
    "gh_lines_deleted",
    "file_types",
    "gh_tests_added",
    "gh_tests_deleted",
    "gh_test_churn",
    "gh_src_churn",
    "gh_pull_req_number",
    "gh_is_pr",
    "gh_sloc",
    "gh_description_complexity",
    "gh_src_files",
    "gh_doc_files",
    "gh_other_files",
    "git_num_committers",
    "gh_job_id",
    "total_jobs",
    "gh_first_commit_created_at",
    "gh_team_size_last_3_month",
    "gh_commits_on_files_touched",
    "gh_num_pr_comments",
    "git_merged_with",
    "gh_test_lines_per_kloc",
    "build_language",
    "test_framework",
    "tests_passed",
    "tests_failed",
    "tests_skipped",
    "tests_total",
    "fetch_duration",
];

/// One CI build, flattened. Field order is column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildRecord {
    /// `owner/name`.
    pub repo: String,
    /// Run id.
    pub id_build: u64,
    /// Branch the run built.
    pub branch: Option<String>,
    /// Head commit sha.
    pub commit_sha: String,
    /// Primary language of the repository.
    pub languages: String,
    /// Run status.
    pub status: Option<String>,
    /// Run conclusion.
    pub conclusion: Option<String>,
    /// Run creation time.
    #[serde(serialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Run completion (last update) time.
    #[serde(serialize_with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    /// `updated_at - created_at`, seconds.
    pub build_duration: i64,
    /// Runs created at or before this run's completion.
    pub total_builds: usize,
    /// Files added across the window.
    pub gh_files_added: u64,
    /// Files removed across the window.
    pub gh_files_deleted: u64,
    /// Files modified across the window.
    pub gh_files_modified: u64,
    /// Whether any job step looks like a test step.
    pub tests_ran: bool,
    /// Production lines added.
    pub gh_lines_added: u64,
    /// Production lines removed.
    pub gh_lines_deleted: u64,
    /// Extensions touched, joined with `", "`.
    pub file_types: String,
    /// Test lines added.
    pub gh_tests_added: u64,
    /// Test lines removed.
    pub gh_tests_deleted: u64,
    /// Test lines added plus removed.
    pub gh_test_churn: u64,
    /// Production lines added plus removed.
    pub gh_src_churn: u64,
    /// Pull request number, 0 when not PR-triggered.
    pub gh_pull_req_number: u64,
    /// Whether the run was triggered by a pull request.
    pub gh_is_pr: bool,
    /// Production plus test lines added.
    pub gh_sloc: u64,
    /// Words in the PR title and body.
    pub gh_description_complexity: usize,
    /// Production files touched.
    pub gh_src_files: u64,
    /// Documentation files touched.
    pub gh_doc_files: u64,
    /// Other files touched.
    pub gh_other_files: u64,
    /// Distinct authors seen in the repository so far.
    pub git_num_committers: usize,
    /// Job ids, joined with `";"`.
    pub gh_job_id: String,
    /// Number of jobs.
    pub total_jobs: usize,
    /// Head commit timestamp.
    #[serde(serialize_with = "optional_timestamp")]
    pub gh_first_commit_created_at: Option<DateTime<Utc>>,
    /// Distinct committers over the recent look-back span.
    pub gh_team_size_last_3_month: usize,
    /// Commits charged to the window.
    pub gh_commits_on_files_touched: usize,
    /// PR comment count.
    pub gh_num_pr_comments: u64,
    /// PR merge commit sha.
    pub git_merged_with: Option<String>,
    /// Test lines per thousand added lines.
    pub gh_test_lines_per_kloc: f64,
    /// Build language detected from root files.
    pub build_language: Option<BuildLanguage>,
    /// Test framework detected from build files.
    pub test_framework: Option<TestFramework>,
    /// Tests passed.
    pub tests_passed: u64,
    /// Tests failed.
    pub tests_failed: u64,
    /// Tests skipped.
    pub tests_skipped: u64,
    /// Tests counted, errors included.
    pub tests_total: u64,
    /// Wall-clock seconds spent assembling this record.
    pub fetch_duration: f64,
}

/// RFC 3339, UTC, whole seconds: `2024-01-01T00:00:00Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Join job ids with `;`.
pub fn join_job_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

fn timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}

fn optional_timestamp<S: Serializer>(
    ts: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    use chrono::TimeZone;

    use super::*;

    /// A plausible record for run `id` of `repo`.
    pub(crate) fn record(repo: &str, id: u64) -> BuildRecord {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        BuildRecord {
            repo: repo.to_string(),
            id_build: id,
            branch: Some("main".into()),
            commit_sha: "abc123".into(),
            languages: "Ruby".into(),
            status: Some("completed".into()),
            conclusion: Some("success".into()),
            created_at,
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap(),
            build_duration: 300,
            total_builds: 1,
            gh_files_added: 1,
            gh_files_deleted: 0,
            gh_files_modified: 2,
            tests_ran: true,
            gh_lines_added: 10,
            gh_lines_deleted: 2,
            file_types: ".rb, .md".into(),
            gh_tests_added: 5,
            gh_tests_deleted: 0,
            gh_test_churn: 5,
            gh_src_churn: 12,
            gh_pull_req_number: 0,
            gh_is_pr: false,
            gh_sloc: 15,
            gh_description_complexity: 0,
            gh_src_files: 1,
            gh_doc_files: 1,
            gh_other_files: 0,
            git_num_committers: 2,
            gh_job_id: "11;12".into(),
            total_jobs: 2,
            gh_first_commit_created_at: Some(created_at),
            gh_team_size_last_3_month: 2,
            gh_commits_on_files_touched: 3,
            gh_num_pr_comments: 0,
            git_merged_with: None,
            gh_test_lines_per_kloc: 333.5,
            build_language: Some(BuildLanguage::Ruby),
            test_framework: Some(TestFramework::Rspec),
            tests_passed: 9,
            tests_failed: 1,
            tests_skipped: 0,
            tests_total: 10,
            fetch_duration: 1.5,
        }
    }
}
