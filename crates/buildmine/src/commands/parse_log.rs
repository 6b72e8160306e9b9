//! Parse-log command: count test results in a saved CI log or log archive.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, instrument};

use buildmine_core::ecosystem::{BuildLanguage, TestFramework};
use buildmine_core::logs::{TestResultSummary, parse_log, summarize_archive};

/// Leading bytes of a zip archive.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Arguments for the `parse-log` subcommand.
#[derive(Args, Debug)]
pub struct ParseLogArgs {
    /// Test framework whose output the log contains (e.g. rspec, junit, pytest)
    #[arg(short, long, value_name = "NAME")]
    pub framework: TestFramework,

    /// Build language, which picks the JUnit output format (e.g. java-maven)
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<BuildLanguage>,

    /// Plain-text log or zip log archive
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Serialize)]
struct ParseReport {
    file: String,
    archive: bool,
    framework: TestFramework,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<BuildLanguage>,
    #[serde(flatten)]
    summary: TestResultSummary,
}

fn summarize(
    bytes: &[u8],
    framework: TestFramework,
    language: Option<BuildLanguage>,
) -> (bool, TestResultSummary) {
    if bytes.starts_with(ZIP_MAGIC) {
        (true, summarize_archive(bytes, Some(framework), language))
    } else {
        let text = String::from_utf8_lossy(bytes);
        (false, parse_log(framework, &text, language))
    }
}

/// Parse one log file and print its test counts.
#[instrument(name = "cmd_parse_log", skip_all, fields(json_output = global_json))]
pub fn cmd_parse_log(args: ParseLogArgs, global_json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let (archive, summary) = summarize(&bytes, args.framework, args.language);
    debug!(archive, total = summary.total, "parsed log");

    let report = ParseReport {
        file: args.file.display().to_string(),
        archive,
        framework: args.framework,
        language: args.language,
        summary,
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {}",
        report.file.bold(),
        format!("({})", report.framework).dimmed()
    );
    if summary.is_empty() {
        println!("  {} {}", "○".yellow(), "no test results found".yellow());
        return Ok(());
    }
    println!("  {}: {}", "Passed".dimmed(), summary.passed.green());
    println!("  {}: {}", "Failed".dimmed(), summary.failed.red());
    println!("  {}: {}", "Skipped".dimmed(), summary.skipped.yellow());
    println!("  {}: {}", "Errors".dimmed(), summary.errors);
    println!("  {}: {}", "Total".dimmed(), summary.total.bold());
    Ok(())
}
