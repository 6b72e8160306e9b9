//! Command implementations

pub mod classify;

pub mod info;

pub mod mine;

pub mod parse_log;

use anyhow::Context;
use camino::Utf8PathBuf;
use std::path::PathBuf;

/// Convert a command-line path into a UTF-8 path.
pub fn utf8_path(path: PathBuf) -> anyhow::Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path)
        .map_err(|e| anyhow::anyhow!("path is not valid UTF-8: {}", e.into_path_buf().display()))
        .context("invalid path argument")
}
