//! Repository identifiers and project-list parsing.

use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, warn};

/// An `owner/name` repository on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoName {
    /// Account or organization that owns the repository.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoName {
    /// Build a repository name from its parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A project reference that names no repository.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("not a repository reference: {0:?}")]
pub struct InvalidRepo(pub String);

impl FromStr for RepoName {
    type Err = InvalidRepo;

    /// Accepts `owner/name`, `https://host/owner/name(.git)` and
    /// `git@host:owner/name(.git)`. For URLs the last two path segments win.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let path = trimmed.strip_prefix("git@").map_or_else(
            || {
                trimmed
                    .split_once("//")
                    .map_or(trimmed, |(_, after_scheme)| after_scheme)
            },
            |rest| rest.split_once(':').map_or(rest, |(_, path)| path),
        );

        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let mut segments = path.rsplit('/').filter(|s| !s.is_empty());
        let name = segments.next();
        let owner = segments.next();

        match (owner, name) {
            (Some(owner), Some(name)) => Ok(Self::new(owner, name)),
            _ => Err(InvalidRepo(s.to_string())),
        }
    }
}

/// Read a projects file: one repository reference in the first CSV column of
/// each row. Rows that name no repository are logged and skipped.
#[instrument]
pub fn read_projects_file(path: &Utf8Path) -> csv::Result<Vec<RepoName>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path.as_std_path())?;

    let mut repos = Vec::new();
    for row in reader.records() {
        let row = row?;
        let Some(first) = row.get(0).filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        match first.parse::<RepoName>() {
            Ok(repo) => repos.push(repo),
            Err(e) => warn!(%e, "skipping project row"),
        }
    }
    Ok(repos)
}
