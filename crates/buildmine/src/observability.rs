//! Logging setup.
//!
//! JSON lines go to a daily-rolling file and human-readable lines go to
//! stderr. Nothing here writes to stdout, which carries command output.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "BUILDMINE_LOG_PATH";
const ENV_LOG_DIR: &str = "BUILDMINE_LOG_DIR";
const LOG_FILE_NAME: &str = "buildmine.jsonl";

/// Places the log file may go, most specific first.
#[derive(Debug, Default, Clone)]
pub struct LogLocation {
    /// Full file path, from `BUILDMINE_LOG_PATH`.
    pub path: Option<PathBuf>,
    /// Directory, from `BUILDMINE_LOG_DIR`.
    pub dir: Option<PathBuf>,
    /// Directory from the `log_dir` config key.
    pub config_dir: Option<PathBuf>,
}

impl LogLocation {
    /// Read the environment overrides on top of the configured directory.
    pub fn from_env(config_dir: Option<PathBuf>) -> Self {
        Self {
            path: std::env::var_os(ENV_LOG_PATH).map(PathBuf::from),
            dir: std::env::var_os(ENV_LOG_DIR).map(PathBuf::from),
            config_dir,
        }
    }

    /// Directory and file name to log into. The file is created.
    ///
    /// An explicit path or directory must be usable. Without one, the
    /// platform data directory and then the working directory are tried.
    fn resolve(&self) -> Result<(PathBuf, String), String> {
        let candidates: Vec<(PathBuf, String)> = if let Some(ref path) = self.path {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| format!("{ENV_LOG_PATH} must end in a UTF-8 file name"))?;
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            vec![(dir.to_path_buf(), name.to_string())]
        } else if let Some(dir) = self.dir.as_ref().or(self.config_dir.as_ref()) {
            vec![(dir.clone(), LOG_FILE_NAME.to_string())]
        } else {
            directories::ProjectDirs::from("", "", env!("CARGO_PKG_NAME"))
                .map(|dirs| dirs.data_local_dir().join("logs"))
                .into_iter()
                .chain(std::env::current_dir().ok())
                .map(|dir| (dir, LOG_FILE_NAME.to_string()))
                .collect()
        };

        let mut last_error = "no writable log directory found".to_string();
        for (dir, name) in candidates {
            match touch(&dir, &name) {
                Ok(()) => return Ok((dir, name)),
                Err(err) => last_error = err,
            }
        }
        Err(last_error)
    }
}

fn touch(dir: &Path, file_name: &str) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create log directory {}: {e}", dir.display()))?;
    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open log file {}: {e}", path.display()))?;
    Ok(())
}

/// Stderr echo level: errors when quiet, warnings by default, and the
/// verbose level otherwise.
pub const fn stderr_level(quiet: bool, verbose: u8) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    }
}

/// Global filter. Priority: quiet flag, verbose flag, `RUST_LOG`, then
/// `default_level`.
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    match (quiet, verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 1) => EnvFilter::new("debug"),
        (false, 2..) => EnvFilter::new("trace"),
        (false, 0) => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
        }
    }
}

/// Keeps the background log writer alive; drop it last.
pub struct ObservabilityGuard {
    _file: WorkerGuard,
}

fn file_writer(location: &LogLocation) -> (NonBlocking, WorkerGuard) {
    match location.resolve() {
        Ok((dir, name)) => tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name)),
        Err(err) => {
            eprintln!("warning: {err}; logging to stderr");
            tracing_appender::non_blocking(std::io::stderr())
        }
    }
}

/// Install the global subscriber.
pub fn init_observability(
    location: &LogLocation,
    quiet: bool,
    verbose: u8,
    default_level: &str,
) -> ObservabilityGuard {
    let (writer, guard) = file_writer(location);

    let file_layer = fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_writer(writer);
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(stderr_level(quiet, verbose));

    tracing_subscriber::registry()
        .with(env_filter(quiet, verbose, default_level))
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::debug!("observability initialized");
    ObservabilityGuard { _file: guard }
}
