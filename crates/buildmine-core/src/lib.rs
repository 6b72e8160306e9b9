//! Core library for buildmine.
//!
//! Mines a hosted repository's CI history into one flat metrics record per
//! build: commit churn and file classification for the commits each build
//! introduced, contributor and team figures, pull request metadata, and
//! test results parsed out of the build's log archive.
//!
//! # Modules
//!
//! - [`cache`] - Bounded LRU cache of per-commit metrics
//! - [`classify`] - File classification (test, production, documentation)
//! - [`compile`] - Per-run record compilation and the repository loop
//! - [`config`] - Configuration loading and management
//! - [`detect`] - Build language, test framework and primary language
//! - [`ecosystem`] - Build language and test framework types
//! - [`error`] - Error types and result aliases
//! - [`fetch`] - Per-commit measurement
//! - [`github`] - GitHub REST data source
//! - [`logs`] - CI log parsing
//! - [`metrics`] - Commit and window metric shapes
//! - [`record`] - The output row
//! - [`repo`] - Repository names and project lists
//! - [`sink`] - CSV output
//! - [`source`] - The data source seam
//! - [`window`] - Commit-window aggregation
//!
//! # Quick Start
//!
//! ```no_run
//! use buildmine_core::compile::{MineOptions, mine_repository};
//! use buildmine_core::github::GithubClient;
//! use buildmine_core::sink::CsvSink;
//! use buildmine_core::{ConfigLoader, RepoName};
//!
//! let config = ConfigLoader::new().with_user_config(true).load()?;
//! let client = GithubClient::new(&config.github)?;
//! let mut sink = CsvSink::open(&config.output.path)?;
//! let repo: RepoName = "octo/widget".parse()?;
//!
//! let summary = mine_repository(&client, &repo, &MineOptions::default(), &mut sink, |_| {})?;
//! println!("{} records", summary.records_written);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![deny(unsafe_code)]

pub mod cache;

pub mod classify;

pub mod compile;

pub mod config;

pub mod detect;

pub mod ecosystem;

pub mod error;

pub mod fetch;

pub mod github;

pub mod logs;

pub mod metrics;

pub mod record;

pub mod repo;

pub mod sink;

pub mod source;

pub mod window;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult, MineError, MineResult, SinkError, SinkResult};

pub use repo::RepoName;
