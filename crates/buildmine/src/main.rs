//! buildmine CLI
#![deny(unsafe_code)]

use anyhow::Context;
use buildmine::{Cli, Commands, commands};
use buildmine_core::config::ConfigLoader;
use clap::Parser;
use tracing::debug;

mod observability;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = camino::Utf8PathBuf::try_from(cwd).map_err(|e| {
        anyhow::anyhow!(
            "current directory is not valid UTF-8: {}",
            e.into_path_buf().display()
        )
    })?;
    let mut loader = ConfigLoader::new().with_project_search(&cwd);
    if let Some(ref config_path) = cli.config {
        let config_path = camino::Utf8PathBuf::try_from(config_path.clone()).map_err(|e| {
            anyhow::anyhow!(
                "config path is not valid UTF-8: {}",
                e.into_path_buf().display()
            )
        })?;
        loader = loader.with_file(&config_path);
    }
    let config = loader.load().context("failed to load configuration")?;

    let log_location = observability::LogLocation::from_env(
        config
            .log_dir
            .as_ref()
            .map(|dir| dir.as_std_path().to_path_buf()),
    );
    let _guard = observability::init_observability(
        &log_location,
        cli.quiet,
        cli.verbose,
        config.log_level.as_str(),
    );

    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json = cli.json,
        color = ?cli.color,
        chdir = ?cli.chdir,
        "CLI initialized"
    );

    let result = match cli.command {
        Commands::Mine(args) => commands::mine::cmd_mine(args, cli.json, cli.quiet, &config),
        Commands::Classify(args) => commands::classify::cmd_classify(args, cli.json),
        Commands::ParseLog(args) => commands::parse_log::cmd_parse_log(args, cli.json),
        Commands::Info(args) => commands::info::cmd_info(args, cli.json, &config, &cwd),
    };
    if let Err(ref err) = result {
        tracing::error!(error = %err, "fatal error");
    }
    result
}
