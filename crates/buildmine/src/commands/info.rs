//! Info command: show package and effective configuration.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use buildmine_core::config::{self, Config};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    api_url: String,
    token_set: bool,
    output: String,
    cache_capacity: usize,
    cold_start_commit_limit: usize,
    team_window_days: i64,
    workflow_files: Vec<String>,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &camino::Utf8Path) -> Self {
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            api_url: config.github.api_url.clone(),
            token_set: config.github.token.as_deref().is_some_and(|t| !t.is_empty()),
            output: config.output.path.to_string(),
            cache_capacity: config.mining.cache_capacity,
            cold_start_commit_limit: config.mining.cold_start_commit_limit,
            team_window_days: config.mining.team_window_days,
            workflow_files: config.mining.workflow_files.clone(),
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
}

/// Print package information.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory for config discovery
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let full_info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, cwd),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&full_info)?);
        return Ok(());
    }

    let package = &full_info.package;
    println!("{} {}", package.name.bold(), package.version.green());
    if !package.description.is_empty() {
        println!("{}", package.description);
    }
    if !package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), package.license);
    }
    if !package.repository.is_empty() {
        println!("{}: {}", "Repository".dimmed(), package.repository.cyan());
    }

    let cfg = &full_info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    if let Some(ref path) = cfg.config_file {
        println!("{}: {}", "Config file".dimmed(), path.cyan());
    } else {
        println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
    }
    println!("{}: {}", "Log level".dimmed(), cfg.log_level);
    if let Some(ref dir) = cfg.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    println!("{}: {}", "Output".dimmed(), cfg.output.cyan());

    println!();
    println!("{}", "GitHub".bold().underline());
    println!("{}: {}", "API".dimmed(), cfg.api_url.cyan());
    if cfg.token_set {
        println!("{}: {}", "Token".dimmed(), "set".green());
    } else {
        println!(
            "{}: {}",
            "Token".dimmed(),
            "not set (anonymous rate limit)".yellow()
        );
    }

    println!();
    println!("{}", "Mining".bold().underline());
    println!("{}: {}", "Commit cache".dimmed(), cfg.cache_capacity);
    println!(
        "{}: {}",
        "Cold-start commit limit".dimmed(),
        cfg.cold_start_commit_limit
    );
    println!("{}: {} days", "Team window".dimmed(), cfg.team_window_days);
    if cfg.workflow_files.is_empty() {
        println!("{}: {}", "Workflows".dimmed(), "none".yellow());
    } else {
        println!(
            "{}: {}",
            "Workflows".dimmed(),
            cfg.workflow_files.join(", ").cyan()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::default()
    }

    fn test_cwd() -> camino::Utf8PathBuf {
        camino::Utf8PathBuf::from("/tmp")
    }

    #[test]
    fn test_cmd_info_text_succeeds() {
        assert!(cmd_info(InfoArgs::default(), false, &test_config(), &test_cwd()).is_ok());
    }

    #[test]
    fn test_cmd_info_json_via_global() {
        assert!(cmd_info(InfoArgs::default(), true, &test_config(), &test_cwd()).is_ok());
    }

    #[test]
    fn test_config_info_no_file() {
        let config = Config::default();
        let cwd = camino::Utf8PathBuf::from("/nonexistent");
        let info = ConfigInfo::from_config(&config, &cwd);
        assert!(info.config_file.is_none());
        assert_eq!(info.log_level, "info");
        assert!(!info.token_set);
    }

    #[test]
    fn test_config_info_reports_token_presence() {
        let mut config = Config::default();
        config.github.token = Some("ghp_example".to_string());
        let info = ConfigInfo::from_config(&config, &test_cwd());
        assert!(info.token_set);
    }
}
