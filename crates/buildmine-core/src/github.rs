//! GitHub REST implementation of [`DataSource`].
//!
//! All retry, backoff and rate-limit handling lives here. Callers only see
//! a value or `None`.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::GithubConfig;
use crate::repo::RepoName;
use crate::source::{
    CommitDetail, CommitPage, CommitQuery, CommitSummary, DataSource, FileChange, Job,
    PullRequestDetails, RunPage, Workflow, WorkflowRun,
};

const USER_AGENT: &str = concat!("buildmine/", env!("CARGO_PKG_VERSION"));
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Extra wait after a rate-limit window resets.
const RATE_LIMIT_GRACE: Duration = Duration::from_secs(10);

/// Failures inside the client. Never returned past the [`DataSource`] seam.
#[derive(Error, Debug)]
pub enum GithubError {
    /// The request could not be sent or its body not read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(StatusCode),

    /// The resource does not exist.
    #[error("not found")]
    NotFound,

    /// The body did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later one.
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Delay after the failed attempt numbered `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl From<&GithubConfig> for RetryPolicy {
    fn from(config: &GithubConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_secs(config.backoff_base_secs),
        }
    }
}

/// Time to wait for a rate-limit window ending at `reset` (Unix seconds).
pub fn rate_limit_delay(reset: i64, now: DateTime<Utc>) -> Duration {
    let remaining = Utc
        .timestamp_opt(reset, 0)
        .single()
        .map(|reset| reset - now)
        .and_then(|delta| delta.to_std().ok())
        .unwrap_or_default();
    remaining + RATE_LIMIT_GRACE
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<i64> {
    headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}

/// How a non-success response should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    /// Rate limited; wait until the window resets (Unix seconds), if known.
    RateLimited(Option<i64>),
    /// Server-side trouble; back off and try again.
    Transient,
    /// Retrying cannot help (bad request, no access, gone, not found).
    Permanent,
}

fn classify_failure(status: StatusCode, headers: &HeaderMap) -> Failure {
    let reset = rate_limit_reset(headers);
    match status {
        StatusCode::TOO_MANY_REQUESTS => Failure::RateLimited(reset),
        StatusCode::FORBIDDEN if reset.is_some() || rate_limit_exhausted(headers) => {
            Failure::RateLimited(reset)
        }
        status if status.is_server_error() => Failure::Transient,
        _ => Failure::Permanent,
    }
}

/// Decode a contents-API payload: base64 with embedded line breaks.
///
/// Returns `None` for content that is not valid UTF-8.
pub fn decode_content(encoded: &str) -> Option<String> {
    let compact: String = encoded.split_whitespace().collect();
    let bytes = STANDARD.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Deserialize)]
struct Login {
    login: String,
}

#[derive(Deserialize)]
struct GitSignature {
    date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct GitCommit {
    committer: Option<GitSignature>,
}

#[derive(Deserialize)]
struct RawCommit {
    sha: String,
    commit: GitCommit,
    author: Option<Login>,
    committer: Option<Login>,
    #[serde(default)]
    files: Vec<FileChange>,
}

impl RawCommit {
    fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.commit.committer.as_ref().and_then(|c| c.date)
    }

    fn into_detail(self) -> CommitDetail {
        CommitDetail {
            committed_at: self.committed_at(),
            sha: self.sha,
            author_login: self.author.map(|a| a.login),
            files: self.files,
        }
    }

    fn into_summary(self) -> Option<CommitSummary> {
        Some(CommitSummary {
            committed_at: self.committed_at()?,
            sha: self.sha,
            committer_login: self.committer.map(|c| c.login),
        })
    }
}

#[derive(Deserialize)]
struct WorkflowList {
    workflows: Vec<Workflow>,
}

#[derive(Deserialize)]
struct RunList {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct JobList {
    jobs: Vec<Job>,
}

#[derive(Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Names of the plain files in a directory listing.
fn file_names(entries: Vec<ContentEntry>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|e| e.kind == "file")
        .map(|e| e.name)
        .collect()
}

#[derive(Deserialize)]
struct FileContent {
    content: Option<String>,
}

/// Blocking GitHub REST client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
    policy: RetryPolicy,
    per_page: u32,
}

impl GithubClient {
    /// Build a client from configuration.
    pub fn new(config: &GithubConfig) -> Result<Self, GithubError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            policy: RetryPolicy::from(config),
            per_page: config.per_page.max(1),
        })
    }

    /// Whether requests are authenticated.
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn repo_url(&self, repo: &RepoName, rest: &str) -> String {
        format!("{}/repos/{}/{}{rest}", self.api_url, repo.owner, repo.name)
    }

    /// Send a GET, retrying per policy.
    ///
    /// Transport errors, 5xx and rate limits are retried. Any other 4xx
    /// fails at once.
    fn send(&self, url: &str, query: &[(&str, String)]) -> Result<Response, GithubError> {
        let mut last_error = GithubError::Status(StatusCode::SERVICE_UNAVAILABLE);

        for attempt in 0..self.policy.max_attempts {
            let mut request = self.http.get(url).query(query).header(ACCEPT, GITHUB_JSON);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let delay = match request.send() {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let delay = match classify_failure(status, response.headers()) {
                        Failure::Permanent if status == StatusCode::NOT_FOUND => {
                            return Err(GithubError::NotFound);
                        }
                        Failure::Permanent => return Err(GithubError::Status(status)),
                        Failure::RateLimited(Some(reset)) => rate_limit_delay(reset, Utc::now()),
                        Failure::RateLimited(None) | Failure::Transient => {
                            self.policy.backoff(attempt)
                        }
                    };
                    warn!(%url, %status, attempt, ?delay, "request failed");
                    last_error = GithubError::Status(status);
                    delay
                }
                Err(e) => {
                    let delay = self.policy.backoff(attempt);
                    warn!(%url, error = %e, attempt, ?delay, "request failed");
                    last_error = GithubError::Transport(e);
                    delay
                }
            };

            if attempt + 1 < self.policy.max_attempts {
                thread::sleep(delay);
            }
        }

        Err(last_error)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Option<T> {
        let result = self
            .send(url, query)
            .and_then(|response| response.json::<T>().map_err(|e| GithubError::Decode(e.to_string())));
        Self::absent_on_error(url, result)
    }

    fn absent_on_error<T>(url: &str, result: Result<T, GithubError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(GithubError::NotFound) => {
                debug!(%url, "resource not found");
                None
            }
            Err(e) => {
                warn!(%url, error = %e, "giving up on request");
                None
            }
        }
    }

    fn paging(&self, page: u32) -> [(&'static str, String); 2] {
        [
            ("page", page.to_string()),
            ("per_page", self.per_page.to_string()),
        ]
    }
}

impl DataSource for GithubClient {
    #[instrument(skip(self, repo), fields(repo = %repo))]
    fn fetch_commit_detail(&self, repo: &RepoName, sha: &str) -> Option<CommitDetail> {
        let url = self.repo_url(repo, &format!("/commits/{sha}"));
        self.get_json::<RawCommit>(&url, &[])
            .map(RawCommit::into_detail)
    }

    #[instrument(skip(self, repo, query), fields(repo = %repo, page = query.page))]
    fn list_commits(&self, repo: &RepoName, query: &CommitQuery) -> Option<CommitPage> {
        let url = self.repo_url(repo, "/commits");
        let mut params = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        if let Some(since) = query.since {
            params.push(("since", iso(since)));
        }
        if let Some(until) = query.until {
            params.push(("until", iso(until)));
        }

        let raw: Vec<RawCommit> = self.get_json(&url, &params)?;
        let has_more = raw.len() >= query.per_page as usize;
        let commits = raw.into_iter().filter_map(RawCommit::into_summary).collect();
        Some(CommitPage { commits, has_more })
    }

    fn list_workflows(&self, repo: &RepoName) -> Option<Vec<Workflow>> {
        let url = self.repo_url(repo, "/actions/workflows");
        self.get_json::<WorkflowList>(&url, &self.paging(1))
            .map(|list| list.workflows)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    fn list_workflow_runs(&self, repo: &RepoName, workflow_id: u64, page: u32) -> Option<RunPage> {
        let url = self.repo_url(repo, &format!("/actions/workflows/{workflow_id}/runs"));
        let list: RunList = self.get_json(&url, &self.paging(page))?;
        let has_more = list.workflow_runs.len() >= self.per_page as usize;
        Some(RunPage {
            runs: list.workflow_runs,
            has_more,
        })
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    fn fetch_run_log_archive(&self, repo: &RepoName, run_id: u64) -> Option<Vec<u8>> {
        let url = self.repo_url(repo, &format!("/actions/runs/{run_id}/logs"));
        let result = self
            .send(&url, &[])
            .and_then(|response| Ok(response.bytes()?.to_vec()));
        Self::absent_on_error(&url, result)
    }

    fn list_run_jobs(&self, repo: &RepoName, run_id: u64) -> Option<Vec<Job>> {
        let url = self.repo_url(repo, &format!("/actions/runs/{run_id}/jobs"));
        self.get_json::<JobList>(&url, &self.paging(1))
            .map(|list| list.jobs)
    }

    fn fetch_pull_request(&self, repo: &RepoName, number: u64) -> Option<PullRequestDetails> {
        let url = self.repo_url(repo, &format!("/pulls/{number}"));
        self.get_json(&url, &[])
    }

    fn list_root_files(&self, repo: &RepoName) -> Option<Vec<String>> {
        let url = self.repo_url(repo, "/contents");
        let entries: Vec<ContentEntry> = self.get_json(&url, &[])?;
        Some(file_names(entries))
    }

    fn fetch_file_content(&self, repo: &RepoName, path: &str) -> Option<String> {
        let url = self.repo_url(repo, &format!("/contents/{path}"));
        let file: FileContent = self.get_json(&url, &[])?;
        let decoded = decode_content(file.content.as_deref()?);
        if decoded.is_none() {
            debug!(%path, "file content is not UTF-8 text");
        }
        decoded
    }

    fn fetch_languages(&self, repo: &RepoName) -> Option<BTreeMap<String, u64>> {
        let url = self.repo_url(repo, "/languages");
        self.get_json(&url, &[])
    }
}
