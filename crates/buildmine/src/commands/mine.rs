//! Mine command: thin CLI layer over `buildmine_core::compile`.

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::Args;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

use buildmine_core::compile::{MineEvent, MineOptions, RepoSummary, RunFilter, mine_repository};
use buildmine_core::config::Config;
use buildmine_core::github::GithubClient;
use buildmine_core::repo::read_projects_file;
use buildmine_core::sink::CsvSink;
use buildmine_core::RepoName;

use super::utf8_path;

/// Arguments for the `mine` subcommand.
#[derive(Args, Debug, Default)]
pub struct MineArgs {
    /// Repositories to mine (`owner/name` or a GitHub URL)
    #[arg(value_name = "REPO")]
    pub repos: Vec<String>,

    /// CSV file listing repositories in its first column
    #[arg(long, value_name = "FILE")]
    pub projects: Option<PathBuf>,

    /// Output CSV file (overrides config)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Only mine runs created on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub from_date: Option<NaiveDate>,

    /// Only mine runs created on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub to_date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct MineReport {
    output: String,
    repositories: Vec<RepoSummary>,
}

/// Collect the repositories named on the command line and in the projects file.
fn resolve_repos(args: &MineArgs) -> anyhow::Result<Vec<RepoName>> {
    let mut repos = args
        .repos
        .iter()
        .map(|raw| {
            raw.parse::<RepoName>()
                .with_context(|| format!("invalid repository: {raw}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if let Some(ref path) = args.projects {
        let path = utf8_path(path.clone())?;
        let listed = read_projects_file(&path)
            .with_context(|| format!("failed to read projects file {path}"))?;
        debug!(count = listed.len(), %path, "read projects file");
        repos.extend(listed);
    }

    let mut seen = std::collections::HashSet::new();
    repos.retain(|repo| seen.insert(repo.to_string()));
    Ok(repos)
}

/// Mine each repository into the output CSV.
#[instrument(name = "cmd_mine", skip_all, fields(json_output = global_json))]
pub fn cmd_mine(
    args: MineArgs,
    global_json: bool,
    quiet: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let repos = resolve_repos(&args)?;
    if repos.is_empty() {
        bail!("no repositories to mine (pass REPO arguments or --projects FILE)");
    }

    let filter = RunFilter {
        from: args.from_date,
        to: args.to_date,
    };
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        bail!("--from-date {from} is after --to-date {to}");
    }

    let mut github = config.github.clone();
    if args.token.is_some() {
        github.token = args.token.clone();
    }
    let client = GithubClient::new(&github).context("failed to build GitHub client")?;
    if !client.is_authenticated() {
        warn!("no GitHub token configured, requests are subject to the anonymous rate limit");
    }

    let output = match args.output {
        Some(path) => utf8_path(path)?,
        None => config.output.path.clone(),
    };
    let mut sink = CsvSink::open(&output)
        .with_context(|| format!("failed to open output file {output}"))?;

    let options = MineOptions {
        mining: config.mining.clone(),
        per_page: github.per_page,
        filter,
    };

    let mut summaries = Vec::with_capacity(repos.len());
    for repo in &repos {
        let spinner = spinner(quiet || global_json);
        spinner.set_message(format!("{repo}: gathering facts..."));

        let label = repo.to_string();
        let summary = mine_repository(&client, repo, &options, &mut sink, |event| {
            handle_event(&spinner, &label, event);
        })
        .with_context(|| format!("failed to mine {repo}"));
        spinner.finish_and_clear();
        let summary = summary?;

        info!(
            repo = %summary.repo,
            written = summary.records_written,
            skipped = summary.runs_skipped,
            "repository mined"
        );
        if !global_json {
            print_summary(&summary);
        }
        summaries.push(summary);
    }

    if global_json {
        let report = MineReport {
            output: output.to_string(),
            repositories: summaries,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let total: usize = summaries.iter().map(|s| s.records_written).sum();
        println!(
            "{} {} records written to {}",
            "✓".green().bold(),
            total,
            output.as_str().cyan(),
        );
    }

    Ok(())
}

fn spinner(hidden: bool) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if hidden {
        spinner.set_draw_target(ProgressDrawTarget::hidden());
        return spinner;
    }
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Translate a mining event into spinner progress.
fn handle_event(spinner: &ProgressBar, repo: &str, event: MineEvent) {
    match event {
        MineEvent::FactsGathered(facts) => {
            spinner.set_message(format!(
                "{repo}: {} ({}), listing runs...",
                facts.primary_language,
                facts
                    .test_framework
                    .map_or_else(|| "no test framework".to_string(), |fw| fw.to_string()),
            ));
        }
        MineEvent::RunsListed { listed, selected } => {
            spinner.set_message(format!("{repo}: {selected} of {listed} runs selected"));
        }
        MineEvent::RunSkipped { id } => {
            debug!(id, "run already recorded");
        }
        MineEvent::RecordWritten { id, position, of } => {
            spinner.set_message(format!("{repo}: run {id} ({position}/{of})"));
        }
    }
}

fn print_summary(summary: &RepoSummary) {
    let mark = if summary.runs_selected == 0 {
        "○".yellow().to_string()
    } else {
        "✓".green().to_string()
    };
    println!(
        "  {} {} {}",
        mark,
        summary.repo.bold(),
        format!(
            "{} written, {} already recorded, {} of {} runs selected",
            summary.records_written,
            summary.runs_skipped,
            summary.runs_selected,
            summary.runs_listed,
        )
        .dimmed(),
    );
}
