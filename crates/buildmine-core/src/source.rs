//! The remote data source the miner reads from.
//!
//! [`DataSource`] is the seam between the mining core and the hosting
//! platform. Implementations own transport, retry, backoff and rate-limit
//! handling; they hand back either a value or `None` ("absent after
//! retries"), and callers skip the item and carry on.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repo::RepoName;

/// How a commit changed a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// File created.
    Added,
    /// File deleted.
    Removed,
    /// File contents changed.
    Modified,
    /// File moved (possibly with changes).
    Renamed,
    /// File copied from another path.
    Copied,
    /// Mode or metadata change.
    Changed,
    /// Listed without change.
    Unchanged,
    /// Any status this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// One file entry of a commit diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Repository-relative path.
    #[serde(rename = "filename")]
    pub path: String,
    /// Lines added; `None` when the source omitted the count.
    #[serde(rename = "additions", default)]
    pub lines_added: Option<u64>,
    /// Lines removed; `None` when the source omitted the count.
    #[serde(rename = "deletions", default)]
    pub lines_removed: Option<u64>,
    /// Kind of change.
    #[serde(rename = "status")]
    pub change_type: ChangeType,
}

/// Full detail of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDetail {
    /// Commit sha.
    pub sha: String,
    /// Committer timestamp.
    pub committed_at: Option<DateTime<Utc>>,
    /// Platform login of the commit author, if linked to an account.
    pub author_login: Option<String>,
    /// Changed files.
    pub files: Vec<FileChange>,
}

/// A commit as it appears in a history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// Commit sha.
    pub sha: String,
    /// Committer timestamp.
    pub committed_at: DateTime<Utc>,
    /// Platform login of the committer, if linked to an account.
    pub committer_login: Option<String>,
}

/// Parameters of one commit-history page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitQuery {
    /// Lower time bound, if any.
    pub since: Option<DateTime<Utc>>,
    /// Upper time bound, if any.
    pub until: Option<DateTime<Utc>>,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
}

/// One page of history, newest commit first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitPage {
    /// Commits on this page.
    pub commits: Vec<CommitSummary>,
    /// Whether a further page exists.
    pub has_more: bool,
}

/// A CI workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow id.
    pub id: u64,
    /// Workflow display name.
    #[serde(default)]
    pub name: String,
    /// Path of the workflow definition file (e.g. `.github/workflows/build.yml`).
    pub path: String,
}

/// Head commit of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadCommit {
    /// Commit sha.
    pub id: String,
    /// Commit timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Pull request reference attached to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// Pull request number.
    pub number: u64,
}

/// Metadata of one CI workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Run id.
    pub id: u64,
    /// Sha of the commit the run built.
    pub head_sha: String,
    /// Branch the run built.
    #[serde(default)]
    pub head_branch: Option<String>,
    /// Run status (`completed`, `in_progress`, ...).
    #[serde(default)]
    pub status: Option<String>,
    /// Run conclusion (`success`, `failure`, ...).
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Creation (trigger) time.
    pub created_at: DateTime<Utc>,
    /// Last update time; completion time for finished runs.
    pub updated_at: DateTime<Utc>,
    /// Triggering event (`push`, `pull_request`, ...).
    pub event: String,
    /// Pull requests associated with the run.
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
    /// Head commit metadata, when the platform reports it.
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
}

/// One page of workflow runs, in the source's order (newest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPage {
    /// Runs on this page.
    pub runs: Vec<WorkflowRun>,
    /// Whether a further page exists.
    pub has_more: bool,
}

/// One step of a CI job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStep {
    /// Step display name.
    pub name: String,
}

/// One job of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job id.
    pub id: u64,
    /// Job steps.
    #[serde(default)]
    pub steps: Vec<JobStep>,
}

/// Pull request fields the miner reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestDetails {
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Description body.
    #[serde(default)]
    pub body: Option<String>,
    /// Number of issue comments.
    #[serde(rename = "comments", default)]
    pub comment_count: u64,
    /// Merge commit sha, if merged.
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
}

/// Read access to a hosted repository and its CI history.
///
/// Every method returns `None` when the value could not be obtained after the
/// implementation's own retries.
pub trait DataSource {
    /// Full detail of one commit.
    fn fetch_commit_detail(&self, repo: &RepoName, sha: &str) -> Option<CommitDetail>;

    /// One page of commit history, newest first, bounded by the query.
    fn list_commits(&self, repo: &RepoName, query: &CommitQuery) -> Option<CommitPage>;

    /// CI workflow definitions of the repository.
    fn list_workflows(&self, repo: &RepoName) -> Option<Vec<Workflow>>;

    /// One page of runs of one workflow.
    fn list_workflow_runs(&self, repo: &RepoName, workflow_id: u64, page: u32) -> Option<RunPage>;

    /// Raw log archive (zip) of one run.
    fn fetch_run_log_archive(&self, repo: &RepoName, run_id: u64) -> Option<Vec<u8>>;

    /// Jobs of one run.
    fn list_run_jobs(&self, repo: &RepoName, run_id: u64) -> Option<Vec<Job>>;

    /// Pull request details.
    fn fetch_pull_request(&self, repo: &RepoName, number: u64) -> Option<PullRequestDetails>;

    /// File names in the repository root.
    fn list_root_files(&self, repo: &RepoName) -> Option<Vec<String>>;

    /// Text content of one file on the default branch.
    fn fetch_file_content(&self, repo: &RepoName, path: &str) -> Option<String>;

    /// Bytes of code per language.
    fn fetch_languages(&self, repo: &RepoName) -> Option<BTreeMap<String, u64>>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_change_deserializes_platform_shape() {
        let json = r#"{"filename":"src/a.rs","additions":3,"deletions":1,"status":"renamed"}"#;
        let change: FileChange = serde_json::from_str(json).unwrap();
        assert_eq!(change.path, "src/a.rs");
        assert_eq!(change.lines_added, Some(3));
        assert_eq!(change.lines_removed, Some(1));
        assert_eq!(change.change_type, ChangeType::Renamed);
    }

    #[test]
    fn file_change_tolerates_missing_counts_and_unknown_status() {
        let json = r#"{"filename":"big.bin","status":"exploded"}"#;
        let change: FileChange = serde_json::from_str(json).unwrap();
        assert_eq!(change.lines_added, None);
        assert_eq!(change.change_type, ChangeType::Unknown);
    }

    #[test]
    fn workflow_run_deserializes_platform_shape() {
        let json = r#"{
            "id": 42,
            "head_sha": "abc",
            "head_branch": "main",
            "status": "completed",
            "conclusion": "success",
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-01T10:05:00Z",
            "event": "pull_request",
            "pull_requests": [{"number": 7, "url": "x"}],
            "head_commit": {"id": "abc", "timestamp": "2024-03-01T09:59:00Z", "message": "m"}
        }"#;
        let run: WorkflowRun = serde_json::from_str(json).unwrap();
        assert_eq!(run.id, 42);
        assert_eq!(run.pull_requests, vec![PullRequestRef { number: 7 }]);
        assert_eq!(run.head_commit.unwrap().id, "abc");
    }

    #[test]
    fn pull_request_tolerates_null_body() {
        let json = r#"{"title":"Fix it","body":null,"comments":3,"merge_commit_sha":null}"#;
        let pr: PullRequestDetails = serde_json::from_str(json).unwrap();
        assert_eq!(pr.title, "Fix it");
        assert_eq!(pr.body, None);
        assert_eq!(pr.comment_count, 3);
    }
}
