//! Build record compilation: one repository, run by run.
//!
//! [`mine_repository`] gathers repository-level facts once, lists the runs
//! of the selected workflows oldest first, and turns each run into a
//! [`BuildRecord`]: commit window, test results from the log archive, job
//! and pull request metadata. The window marker advances to each run's
//! completion time, so consecutive windows never overlap.
//!
//! Every remote failure degrades to a zeroed or empty field; only the sink
//! can fail a repository.

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::MiningConfig;
use crate::detect::{
    detect_build_language, detect_test_framework, primary_language, root_files,
};
use crate::ecosystem::{BuildLanguage, TestFramework};
use crate::error::MineResult;
use crate::logs::{TestResultSummary, summarize_archive};
use crate::metrics::WindowMetrics;
use crate::record::{BuildRecord, join_job_ids};
use crate::repo::RepoName;
use crate::sink::RecordSink;
use crate::source::{CommitQuery, DataSource, Job, WorkflowRun};
use crate::window::{
    BuildWindow, CommitHistory, HistoryPage, MiningState, WindowLimits, aggregate,
};

// ──────────────────────────────────────────────
// Options and progress
// ──────────────────────────────────────────────

/// Inclusive creation-date bounds on the runs that are mined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFilter {
    /// Earliest creation date, inclusive.
    pub from: Option<NaiveDate>,
    /// Latest creation date, inclusive.
    pub to: Option<NaiveDate>,
}

impl RunFilter {
    /// Whether a run created at `created_at` falls within the bounds.
    pub fn admits(&self, created_at: DateTime<Utc>) -> bool {
        let day = created_at.date_naive();
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

/// Everything [`mine_repository`] needs besides the source and sink.
#[derive(Debug, Clone)]
pub struct MineOptions {
    /// Mining settings.
    pub mining: MiningConfig,
    /// Page size for listing endpoints.
    pub per_page: u32,
    /// Run date bounds.
    pub filter: RunFilter,
}

impl Default for MineOptions {
    fn default() -> Self {
        Self {
            mining: MiningConfig::default(),
            per_page: 100,
            filter: RunFilter::default(),
        }
    }
}

/// Progress events emitted while a repository is mined.
#[derive(Debug, Clone)]
pub enum MineEvent {
    /// Repository-level facts are known.
    FactsGathered(RepoFacts),
    /// Runs were listed.
    RunsListed {
        /// Runs of the selected workflows.
        listed: usize,
        /// Runs inside the date bounds.
        selected: usize,
    },
    /// A run was already recorded and was skipped.
    RunSkipped {
        /// Run id.
        id: u64,
    },
    /// A record was written.
    RecordWritten {
        /// Run id.
        id: u64,
        /// 1-based position among the selected runs.
        position: usize,
        /// Number of selected runs.
        of: usize,
    },
}

/// What happened to one repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepoSummary {
    /// `owner/name`.
    pub repo: String,
    /// Runs of the selected workflows.
    pub runs_listed: usize,
    /// Runs inside the date bounds.
    pub runs_selected: usize,
    /// Records written.
    pub records_written: usize,
    /// Runs skipped because they were already recorded.
    pub runs_skipped: usize,
    /// Distinct commit authors seen.
    pub committers: usize,
    /// Facts gathered for the repository.
    pub facts: RepoFacts,
}

// ──────────────────────────────────────────────
// Repository facts
// ──────────────────────────────────────────────

/// Facts gathered once per repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoFacts {
    /// Language with the most bytes, or `"unknown"`.
    pub primary_language: String,
    /// Distinct committers over the look-back span ending at the newest commit.
    pub team_size: usize,
    /// Build language from root build files.
    pub build_language: Option<BuildLanguage>,
    /// First test framework declared in a root build file.
    pub test_framework: Option<TestFramework>,
}

/// Gather [`RepoFacts`].
#[instrument(skip_all, fields(repo = %repo))]
pub fn gather_facts<S: DataSource + ?Sized>(
    source: &S,
    repo: &RepoName,
    options: &MineOptions,
) -> RepoFacts {
    let languages = source.fetch_languages(repo);
    if languages.is_none() {
        warn!("language breakdown unavailable");
    }

    let root = root_files(source, repo);
    let facts = RepoFacts {
        primary_language: primary_language(languages.as_ref()),
        team_size: team_size(source, repo, options.mining.team_window_days, options.per_page),
        build_language: detect_build_language(&root),
        test_framework: detect_test_framework(source, repo, &root),
    };
    info!(
        language = %facts.primary_language,
        team = facts.team_size,
        build = ?facts.build_language,
        framework = ?facts.test_framework,
        "repository facts"
    );
    facts
}

/// Distinct committer logins over the `days` before the newest commit.
pub fn team_size<S: DataSource + ?Sized>(
    source: &S,
    repo: &RepoName,
    days: i64,
    per_page: u32,
) -> usize {
    let newest = CommitQuery {
        since: None,
        until: None,
        page: 1,
        per_page: 1,
    };
    let Some(latest) = source
        .list_commits(repo, &newest)
        .and_then(|page| page.commits.into_iter().next())
    else {
        warn!(%repo, "no commits listed, team size is zero");
        return 0;
    };

    let span = CommitQuery {
        since: Some(latest.committed_at - Duration::days(days)),
        until: Some(latest.committed_at),
        page: 1,
        per_page: per_page.max(1),
    };
    let committers: HashSet<String> = CommitHistory::new(source, repo, span)
        .map_while(|page| match page {
            HistoryPage::Commits(commits) => Some(commits),
            HistoryPage::Failed { page } => {
                warn!(page, "commit listing failed, team size is partial");
                None
            }
        })
        .flatten()
        .filter_map(|commit| commit.committer_login)
        .collect();
    committers.len()
}

// ──────────────────────────────────────────────
// Runs
// ──────────────────────────────────────────────

/// Every run of the workflows defined in one of `workflow_files`, oldest
/// first and without duplicates.
#[instrument(skip(source, repo), fields(repo = %repo))]
pub fn collect_runs<S: DataSource + ?Sized>(
    source: &S,
    repo: &RepoName,
    workflow_files: &[String],
) -> Vec<WorkflowRun> {
    let Some(workflows) = source.list_workflows(repo) else {
        warn!("workflow listing unavailable");
        return Vec::new();
    };

    let selected: Vec<_> = workflows
        .iter()
        .filter(|w| {
            let path = w.path.to_lowercase();
            workflow_files
                .iter()
                .any(|name| path.contains(&format!("/{}", name.to_lowercase())))
        })
        .collect();
    if selected.is_empty() {
        warn!(?workflow_files, "no build workflows found");
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut runs = Vec::new();
    for workflow in selected {
        let mut page = 1;
        loop {
            let Some(listing) = source.list_workflow_runs(repo, workflow.id, page) else {
                warn!(workflow = workflow.id, page, "run listing failed, keeping earlier pages");
                break;
            };
            let count = listing.runs.len();
            runs.extend(listing.runs.into_iter().filter(|run| seen.insert(run.id)));
            debug!(workflow = workflow.id, page, count, "listed runs");
            if !listing.has_more || count == 0 {
                break;
            }
            page += 1;
        }
    }

    runs.sort_by_key(|run| (run.created_at, run.id));
    runs
}

/// State carried from one run of a repository to the next.
#[derive(Debug)]
pub struct RepoSession {
    /// Commit cache and contributor set.
    pub state: MiningState,
    /// Completion time of the last processed run.
    pub last_window_end: Option<DateTime<Utc>>,
    /// Run ids already recorded.
    pub emitted: HashSet<u64>,
}

/// Inputs to one record that are shared by every run of a repository.
struct RunContext<'a, S: ?Sized> {
    source: &'a S,
    repo: &'a RepoName,
    facts: &'a RepoFacts,
    all_runs: &'a [WorkflowRun],
    limits: WindowLimits,
}

/// Build one record and advance the window marker.
fn process_run<S: DataSource + ?Sized>(
    ctx: &RunContext<'_, S>,
    session: &mut RepoSession,
    run: &WorkflowRun,
) -> BuildRecord {
    let started = Instant::now();
    let (source, repo) = (ctx.source, ctx.repo);

    let window = BuildWindow {
        start: session.last_window_end,
        end: run.created_at,
        head_sha: run.head_sha.clone(),
    };
    let metrics = aggregate(source, repo, &window, &mut session.state, &ctx.limits);

    let tests = source.fetch_run_log_archive(repo, run.id).map_or_else(
        || {
            warn!(run = run.id, "log archive unavailable, counting no tests");
            TestResultSummary::default()
        },
        |bytes| summarize_archive(&bytes, ctx.facts.test_framework, ctx.facts.build_language),
    );

    let jobs = source.list_run_jobs(repo, run.id).unwrap_or_else(|| {
        warn!(run = run.id, "job listing unavailable");
        Vec::new()
    });
    let pull = PullRequestFacts::resolve(source, repo, run);

    let mut record = assemble(run, ctx, &metrics, &tests, &jobs, pull);
    record.fetch_duration = started.elapsed().as_secs_f64();

    session.last_window_end = Some(run.updated_at);
    record
}

/// Pull request columns of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PullRequestFacts {
    is_pr: bool,
    number: u64,
    description_words: usize,
    comments: u64,
    merge_commit_sha: Option<String>,
}

impl PullRequestFacts {
    /// Resolve PR metadata for PR-triggered runs; the first attached PR wins.
    fn resolve<S: DataSource + ?Sized>(source: &S, repo: &RepoName, run: &WorkflowRun) -> Self {
        let Some(first) = run.pull_requests.first() else {
            return Self::default();
        };
        if run.event != "pull_request" {
            return Self::default();
        }

        let mut facts = Self {
            is_pr: true,
            number: first.number,
            ..Self::default()
        };
        match source.fetch_pull_request(repo, first.number) {
            Some(details) => {
                facts.description_words = details.title.split_whitespace().count()
                    + details
                        .body
                        .as_deref()
                        .map_or(0, |body| body.split_whitespace().count());
                facts.comments = details.comment_count;
                facts.merge_commit_sha = details.merge_commit_sha;
            }
            None => warn!(pr = first.number, "pull request details unavailable"),
        }
        facts
    }
}

fn assemble<S: ?Sized>(
    run: &WorkflowRun,
    ctx: &RunContext<'_, S>,
    metrics: &WindowMetrics,
    tests: &TestResultSummary,
    jobs: &[Job],
    pull: PullRequestFacts,
) -> BuildRecord {
    let totals = &metrics.totals;
    let job_ids: Vec<u64> = jobs.iter().map(|job| job.id).collect();
    let tests_ran = jobs
        .iter()
        .flat_map(|job| &job.steps)
        .any(|step| step.name.to_lowercase().contains("test"));
    let total_builds = ctx
        .all_runs
        .iter()
        .filter(|other| other.created_at <= run.updated_at)
        .count();

    BuildRecord {
        repo: ctx.repo.to_string(),
        id_build: run.id,
        branch: run.head_branch.clone(),
        commit_sha: run.head_sha.clone(),
        languages: ctx.facts.primary_language.clone(),
        status: run.status.clone(),
        conclusion: run.conclusion.clone(),
        created_at: run.created_at,
        updated_at: run.updated_at,
        build_duration: (run.updated_at - run.created_at).num_seconds(),
        total_builds,
        gh_files_added: totals.files_added,
        gh_files_deleted: totals.files_deleted,
        gh_files_modified: totals.files_modified,
        tests_ran,
        gh_lines_added: totals.production_added,
        gh_lines_deleted: totals.production_removed,
        file_types: totals
            .extensions
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        gh_tests_added: totals.tests_added,
        gh_tests_deleted: totals.tests_removed,
        gh_test_churn: metrics.test_churn(),
        gh_src_churn: metrics.src_churn(),
        gh_pull_req_number: pull.number,
        gh_is_pr: pull.is_pr,
        gh_sloc: metrics.sloc(),
        gh_description_complexity: pull.description_words,
        gh_src_files: totals.production_files,
        gh_doc_files: totals.documentation_files,
        gh_other_files: totals.other_files,
        git_num_committers: metrics.committers,
        gh_job_id: join_job_ids(&job_ids),
        total_jobs: job_ids.len(),
        gh_first_commit_created_at: run.head_commit.as_ref().map(|c| c.timestamp),
        gh_team_size_last_3_month: ctx.facts.team_size,
        gh_commits_on_files_touched: metrics.commits_touched,
        gh_num_pr_comments: pull.comments,
        git_merged_with: pull.merge_commit_sha,
        gh_test_lines_per_kloc: metrics.test_lines_per_kloc(),
        build_language: ctx.facts.build_language,
        test_framework: ctx.facts.test_framework,
        tests_passed: tests.passed,
        tests_failed: tests.failed,
        tests_skipped: tests.skipped,
        tests_total: tests.total,
        fetch_duration: 0.0,
    }
}

// ──────────────────────────────────────────────
// Repository loop
// ──────────────────────────────────────────────

/// Mine every selected run of one repository into `sink`.
///
/// State (cache, contributors, window marker) lives for this call only.
/// Runs the sink has already recorded are skipped, but still advance the
/// window marker so the next window starts where the recorded one ended.
#[instrument(skip(source, options, sink, on_event), fields(repo = %repo))]
pub fn mine_repository<S: DataSource + ?Sized, K: RecordSink + ?Sized>(
    source: &S,
    repo: &RepoName,
    options: &MineOptions,
    sink: &mut K,
    mut on_event: impl FnMut(MineEvent),
) -> MineResult<RepoSummary> {
    let facts = gather_facts(source, repo, options);
    on_event(MineEvent::FactsGathered(facts.clone()));

    let all_runs = collect_runs(source, repo, &options.mining.workflow_files);
    let selected: Vec<&WorkflowRun> = all_runs
        .iter()
        .filter(|run| options.filter.admits(run.created_at))
        .collect();
    info!(listed = all_runs.len(), selected = selected.len(), "runs to mine");
    on_event(MineEvent::RunsListed {
        listed: all_runs.len(),
        selected: selected.len(),
    });

    let repo_key = repo.to_string();
    let mut session = RepoSession {
        state: MiningState::new(options.mining.cache_capacity)?,
        last_window_end: None,
        emitted: sink.seen(&repo_key),
    };
    let ctx = RunContext {
        source,
        repo,
        facts: &facts,
        all_runs: &all_runs,
        limits: WindowLimits {
            cold_start_commit_limit: options.mining.cold_start_commit_limit,
            per_page: options.per_page,
        },
    };

    let mut written = 0;
    let mut skipped = 0;
    for (index, run) in selected.iter().enumerate() {
        if session.emitted.contains(&run.id) {
            debug!(run = run.id, "already recorded, skipping");
            session.last_window_end = Some(run.updated_at);
            skipped += 1;
            on_event(MineEvent::RunSkipped { id: run.id });
            continue;
        }

        let record = process_run(&ctx, &mut session, run);
        sink.append(&record)?;
        session.emitted.insert(run.id);
        written += 1;
        info!(
            run = run.id,
            commits = record.gh_commits_on_files_touched,
            tests = record.tests_total,
            "build recorded"
        );
        on_event(MineEvent::RecordWritten {
            id: run.id,
            position: index + 1,
            of: selected.len(),
        });
    }

    Ok(RepoSummary {
        repo: repo_key,
        runs_listed: all_runs.len(),
        runs_selected: selected.len(),
        records_written: written,
        runs_skipped: skipped,
        committers: session.state.contributors.len(),
        facts,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::io::{Cursor, Write};

    use chrono::TimeZone;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::source::fake::FakeSource;
    use crate::source::{
        ChangeType, CommitDetail, CommitSummary, FileChange, HeadCommit, JobStep,
        PullRequestDetails, PullRequestRef, Workflow,
    };

    fn at(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn repo() -> RepoName {
        RepoName::new("octo", "widget")
    }

    fn sha(n: i64) -> String {
        format!("c{n:02}")
    }

    fn run(id: u64, created: i64, updated: i64, head: i64) -> WorkflowRun {
        WorkflowRun {
            id,
            head_sha: sha(head),
            head_branch: Some("main".into()),
            status: Some("completed".into()),
            conclusion: Some("success".into()),
            created_at: at(created),
            updated_at: at(updated),
            event: "push".into(),
            pull_requests: Vec::new(),
            head_commit: Some(HeadCommit {
                id: sha(head),
                timestamp: at(head),
            }),
        }
    }

    fn log_zip(text: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("0_build.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(text.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Ten hourly commits (hours 1..=10), each adding one Ruby source line
    /// and one spec line; authors alternate between two logins.
    fn scripted_repo() -> FakeSource {
        let mut source = FakeSource::default();
        for hour in (1..=10).rev() {
            let login = if hour % 2 == 0 { "ana" } else { "bo" };
            source.commits.push(CommitSummary {
                sha: sha(hour),
                committed_at: at(hour),
                committer_login: Some(login.into()),
            });
            source.details.insert(
                sha(hour),
                CommitDetail {
                    sha: sha(hour),
                    committed_at: Some(at(hour)),
                    author_login: Some(login.into()),
                    files: vec![
                        FileChange {
                            path: format!("lib/f{hour}.rb"),
                            lines_added: Some(1),
                            lines_removed: Some(0),
                            change_type: ChangeType::Added,
                        },
                        FileChange {
                            path: format!("spec/f{hour}_spec.rb"),
                            lines_added: Some(1),
                            lines_removed: Some(0),
                            change_type: ChangeType::Modified,
                        },
                    ],
                },
            );
        }

        source.workflows = vec![
            Workflow {
                id: 1,
                name: "Build".into(),
                path: ".github/workflows/build.yml".into(),
            },
            Workflow {
                id: 2,
                name: "Docs".into(),
                path: ".github/workflows/docs.yml".into(),
            },
        ];
        // Newest first, as the platform lists them.
        source.runs.insert(
            1,
            vec![run(300, 10, 11, 10), run(200, 6, 7, 6), run(100, 3, 4, 3)],
        );
        source.runs.insert(2, vec![run(900, 5, 6, 5)]);
        source.root_files = vec!["Gemfile".into(), "README.md".into()];
        source
            .file_contents
            .insert("Gemfile".into(), "gem 'rspec'\n".into());
        source.languages = BTreeMap::from([("Ruby".into(), 900), ("Shell".into(), 100)]);
        source
    }

    fn mine(source: &FakeSource, sink: &mut Vec<BuildRecord>) -> RepoSummary {
        mine_repository(source, &repo(), &MineOptions::default(), sink, |_| {}).unwrap()
    }

    fn by_id(records: &[BuildRecord]) -> HashMap<u64, &BuildRecord> {
        records.iter().map(|r| (r.id_build, r)).collect()
    }

    #[test]
    fn runs_are_selected_merged_and_sorted() {
        let mut source = scripted_repo();
        source.runs.insert(
            3,
            vec![run(250, 8, 9, 8), run(200, 6, 7, 6)],
        );
        source.workflows.push(Workflow {
            id: 3,
            name: "Nightly".into(),
            path: ".github/workflows/nightly/BUILD.yml".into(),
        });

        let runs = collect_runs(&source, &repo(), &["build.yml".to_string()]);
        let ids: Vec<u64> = runs.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![100, 200, 250, 300]);
    }

    #[test]
    fn no_build_workflow_yields_no_runs() {
        let mut source = scripted_repo();
        source.workflows.retain(|w| w.id == 2);
        assert!(collect_runs(&source, &repo(), &["build.yml".to_string()]).is_empty());
    }

    #[test]
    fn consecutive_windows_partition_history() {
        let source = scripted_repo();
        let mut records = Vec::new();
        let summary = mine(&source, &mut records);

        assert_eq!(summary.records_written, 3);
        let ids: Vec<u64> = records.iter().map(|r| r.id_build).collect();
        assert_eq!(ids, vec![100, 200, 300]);

        let runs = by_id(&records);
        // Cold start: commits 1..=3. Then (4, 6] and (7, 10].
        assert_eq!(runs[&100].gh_commits_on_files_touched, 3);
        assert_eq!(runs[&200].gh_commits_on_files_touched, 2);
        assert_eq!(runs[&300].gh_commits_on_files_touched, 3);
        assert_eq!(runs[&300].gh_lines_added, 3);
        assert_eq!(runs[&300].gh_tests_added, 3);
        assert_eq!(runs[&300].gh_sloc, 6);
        assert_eq!(runs[&300].gh_files_added, 3);
        assert_eq!(runs[&300].gh_files_modified, 3);
        assert!((runs[&300].gh_test_lines_per_kloc - 500.0).abs() < f64::EPSILON);
        assert_eq!(runs[&300].file_types, ".rb");
    }

    #[test]
    fn each_commit_is_fetched_once() {
        let source = scripted_repo();
        let mut records = Vec::new();
        mine(&source, &mut records);
        for hour in [1, 3, 5, 6, 8, 10] {
            assert_eq!(source.detail_fetches(&sha(hour)), 1, "commit {hour}");
        }
    }

    #[test]
    fn repository_facts_flow_into_records() {
        let source = scripted_repo();
        let mut records = Vec::new();
        let summary = mine(&source, &mut records);

        assert_eq!(summary.facts.primary_language, "Ruby");
        assert_eq!(summary.facts.build_language, Some(BuildLanguage::Ruby));
        assert_eq!(summary.facts.test_framework, Some(TestFramework::Rspec));
        assert_eq!(summary.facts.team_size, 2);

        let first = &records[0];
        assert_eq!(first.languages, "Ruby");
        assert_eq!(first.build_language, Some(BuildLanguage::Ruby));
        assert_eq!(first.gh_team_size_last_3_month, 2);
    }

    #[test]
    fn run_level_columns() {
        let mut source = scripted_repo();
        source.jobs.insert(
            200,
            vec![
                Job {
                    id: 21,
                    steps: vec![JobStep { name: "Checkout".into() }],
                },
                Job {
                    id: 22,
                    steps: vec![JobStep { name: "Run Tests".into() }],
                },
            ],
        );
        let mut records = Vec::new();
        mine(&source, &mut records);
        let runs = by_id(&records);

        let build = runs[&200];
        assert_eq!(build.build_duration, 3600);
        assert_eq!(build.gh_job_id, "21;22");
        assert_eq!(build.total_jobs, 2);
        assert!(build.tests_ran);
        assert!(!runs[&100].tests_ran);
        assert_eq!(build.gh_first_commit_created_at, Some(at(6)));
        // Runs created at or before 07:00: 100 and 200.
        assert_eq!(build.total_builds, 2);
        assert_eq!(runs[&300].total_builds, 3);
        assert!(build.fetch_duration >= 0.0);
    }

    #[test]
    fn test_results_come_from_the_log_archive() {
        let mut source = scripted_repo();
        source
            .logs
            .insert(200, log_zip("10 examples, 2 failures, 1 pending"));
        source.logs.insert(300, b"not a zip".to_vec());
        let mut records = Vec::new();
        mine(&source, &mut records);
        let runs = by_id(&records);

        assert_eq!(runs[&200].tests_passed, 7);
        assert_eq!(runs[&200].tests_failed, 2);
        assert_eq!(runs[&200].tests_skipped, 1);
        assert_eq!(runs[&200].tests_total, 10);
        assert_eq!(runs[&300].tests_total, 0);
        assert_eq!(runs[&100].tests_total, 0);
    }

    #[test]
    fn pull_request_columns() {
        let mut source = scripted_repo();
        let runs = source.runs.get_mut(&1).unwrap();
        runs[1].event = "pull_request".into();
        runs[1].pull_requests = vec![PullRequestRef { number: 42 }];
        runs[2].pull_requests = vec![PullRequestRef { number: 41 }];
        source.pulls.insert(
            42,
            PullRequestDetails {
                title: "Fix the flux".into(),
                body: Some("Longer  description\nhere".into()),
                comment_count: 4,
                merge_commit_sha: Some("m42".into()),
            },
        );

        let mut records = Vec::new();
        mine(&source, &mut records);
        let runs = by_id(&records);

        let pr = runs[&200];
        assert!(pr.gh_is_pr);
        assert_eq!(pr.gh_pull_req_number, 42);
        assert_eq!(pr.gh_description_complexity, 6);
        assert_eq!(pr.gh_num_pr_comments, 4);
        assert_eq!(pr.git_merged_with.as_deref(), Some("m42"));

        // A push run with a PR attached is not PR-triggered.
        assert!(!runs[&100].gh_is_pr);
        assert_eq!(runs[&100].gh_pull_req_number, 0);
    }

    #[test]
    fn missing_pull_request_details_keep_the_number() {
        let mut source = scripted_repo();
        let runs = source.runs.get_mut(&1).unwrap();
        runs[0].event = "pull_request".into();
        runs[0].pull_requests = vec![PullRequestRef { number: 7 }];

        let mut records = Vec::new();
        mine(&source, &mut records);
        let pr = by_id(&records)[&300];
        assert!(pr.gh_is_pr);
        assert_eq!(pr.gh_pull_req_number, 7);
        assert_eq!(pr.gh_description_complexity, 0);
        assert_eq!(pr.git_merged_with, None);
    }

    #[test]
    fn recorded_runs_are_skipped_but_move_the_window() {
        let source = scripted_repo();
        let mut records = Vec::new();
        mine(&source, &mut records);
        records.retain(|r| r.id_build != 300);

        let mut events = Vec::new();
        let summary =
            mine_repository(&source, &repo(), &MineOptions::default(), &mut records, |e| {
                events.push(e);
            })
            .unwrap();

        assert_eq!(summary.runs_skipped, 2);
        assert_eq!(summary.records_written, 1);
        let rerun = records.last().unwrap();
        assert_eq!(rerun.id_build, 300);
        assert_eq!(rerun.gh_commits_on_files_touched, 3);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, MineEvent::RunSkipped { id: 100 }))
        );
    }

    #[test]
    fn date_filter_is_inclusive() {
        let filter = RunFilter {
            from: NaiveDate::from_ymd_opt(2024, 3, 1),
            to: NaiveDate::from_ymd_opt(2024, 3, 1),
        };
        assert!(filter.admits(at(0)));
        assert!(filter.admits(at(23)));
        assert!(!filter.admits(at(24)));
        assert!(!filter.admits(at(-1)));
        assert!(RunFilter::default().admits(at(-1000)));
    }

    #[test]
    fn filtered_runs_are_not_mined() {
        let mut source = scripted_repo();
        source.runs.insert(1, vec![run(300, 30, 31, 10), run(100, 3, 4, 3)]);
        let options = MineOptions {
            filter: RunFilter {
                from: NaiveDate::from_ymd_opt(2024, 3, 2),
                to: None,
            },
            ..MineOptions::default()
        };

        let mut records = Vec::new();
        let summary = mine_repository(&source, &repo(), &options, &mut records, |_| {}).unwrap();
        assert_eq!(summary.runs_listed, 2);
        assert_eq!(summary.runs_selected, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id_build, 300);
    }

    #[test]
    fn team_size_counts_recent_committers_only() {
        let mut source = scripted_repo();
        source.commits.push(CommitSummary {
            sha: "ancient".into(),
            committed_at: at(-24 * 200),
            committer_login: Some("old-timer".into()),
        });
        assert_eq!(team_size(&source, &repo(), 90, 100), 2);
        assert_eq!(team_size(&source, &repo(), 365, 100), 3);
    }

    #[test]
    fn empty_repository_yields_no_records() {
        let source = FakeSource::default();
        let mut records = Vec::new();
        let summary = mine(&source, &mut records);
        assert_eq!(summary.runs_listed, 0);
        assert!(records.is_empty());
        assert_eq!(summary.facts.primary_language, "unknown");
        assert_eq!(summary.facts.team_size, 0);
    }
}
