//! Error types for buildmine-core

use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors writing build records.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The output file could not be opened or created.
    #[error("cannot open output {path}: {source}")]
    Open {
        /// Output path.
        path: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// Reading existing rows or writing a new one failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`SinkError`].
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors setting up a repository mining session.
#[derive(Error, Debug)]
pub enum MineError {
    /// The commit cache could not be created.
    #[error(transparent)]
    Cache(#[from] crate::cache::CacheError),

    /// A record could not be written.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Result type alias using [`MineError`].
pub type MineResult<T> = Result<T, MineError>;
