//! Repository detection: build language, test framework, primary language.
//!
//! Reads the repository root through a [`DataSource`] and matches it
//! against the marker files and dependency patterns of
//! [`crate::ecosystem`].
//!
//! # Example
//!
//! ```no_run
//! use buildmine_core::detect;
//! use buildmine_core::github::GithubClient;
//! use buildmine_core::config::GithubConfig;
//! use buildmine_core::repo::RepoName;
//!
//! let client = GithubClient::new(&GithubConfig::default())?;
//! let repo: RepoName = "rails/rails".parse()?;
//! let root = detect::root_files(&client, &repo);
//! match detect::detect_build_language(&root) {
//!     Some(lang) => println!("Build language: {lang}"),
//!     None => println!("Unknown build language"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::ecosystem::{BuildLanguage, TestFramework};
use crate::repo::RepoName;
use crate::source::DataSource;

/// Reported when the languages endpoint yields nothing.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// File names in the repository root; empty when the listing is absent.
#[instrument(skip(source, repo), fields(repo = %repo))]
pub fn root_files<S: DataSource + ?Sized>(source: &S, repo: &RepoName) -> Vec<String> {
    source.list_root_files(repo).unwrap_or_else(|| {
        warn!("root listing unavailable, detection will find nothing");
        Vec::new()
    })
}

/// Identify the build language from root file names.
///
/// Languages are tried in [`BuildLanguage::ALL`] order; the first one with a
/// marker file present wins.
pub fn detect_build_language(root_files: &[String]) -> Option<BuildLanguage> {
    let found = BuildLanguage::ALL.iter().copied().find(|lang| {
        lang.marker_files()
            .iter()
            .any(|marker| root_files.iter().any(|f| f == marker))
    });
    debug!(?found, "build language");
    found
}

/// Every test framework declared in a root build file, in
/// [`TestFramework::ALL`] order.
///
/// A framework is confirmed only when its dependency pattern matches the
/// content of one of its candidate files. Each file is fetched at most once.
#[instrument(skip(source, repo, root_files), fields(repo = %repo))]
pub fn detect_test_frameworks<S: DataSource + ?Sized>(
    source: &S,
    repo: &RepoName,
    root_files: &[String],
) -> Vec<TestFramework> {
    let mut contents: HashMap<&str, Option<String>> = HashMap::new();
    let mut found = Vec::new();

    for framework in TestFramework::ALL.iter().copied() {
        let Some(pattern) = framework.dependency_pattern() else {
            continue;
        };
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!(%framework, error = %e, "bad dependency pattern, skipping");
                continue;
            }
        };

        let declared = framework
            .candidate_files()
            .iter()
            .filter(|candidate| root_files.iter().any(|f| f == *candidate))
            .any(|candidate| {
                contents
                    .entry(*candidate)
                    .or_insert_with(|| source.fetch_file_content(repo, candidate))
                    .as_deref()
                    .is_some_and(|text| re.is_match(text))
            });

        if declared {
            debug!(%framework, "test framework declared");
            found.push(framework);
        }
    }

    found
}

/// The first declared test framework, if any.
pub fn detect_test_framework<S: DataSource + ?Sized>(
    source: &S,
    repo: &RepoName,
    root_files: &[String],
) -> Option<TestFramework> {
    detect_test_frameworks(source, repo, root_files)
        .into_iter()
        .next()
}

/// The language with the most bytes; [`UNKNOWN_LANGUAGE`] when there is none.
///
/// Ties go to the name that sorts first.
pub fn primary_language(languages: Option<&BTreeMap<String, u64>>) -> String {
    languages
        .into_iter()
        .flatten()
        .fold(None::<(&String, u64)>, |best, (name, bytes)| match best {
            Some((_, top)) if top >= *bytes => best,
            _ => Some((name, *bytes)),
        })
        .map_or_else(|| UNKNOWN_LANGUAGE.to_string(), |(name, _)| name.clone())
}
