//! CI log parsing.
//!
//! Turns free-text console output into a [`TestResultSummary`]. The
//! framework-specific part is data (see [`patterns`]); this module strips
//! terminal escapes, runs the pattern over the text and folds every match.

pub mod archive;
pub mod patterns;

use std::borrow::Cow;
use std::ops::AddAssign;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ecosystem::{BuildLanguage, TestFramework};
use patterns::{LogFormat, RawCounts};

pub use archive::summarize_archive;

/// Normalized test outcome of one log fragment or a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultSummary {
    /// Tests that passed.
    pub passed: u64,
    /// Tests that failed.
    pub failed: u64,
    /// Tests skipped or pending.
    pub skipped: u64,
    /// Tests that errored, for frameworks that report errors apart from failures.
    pub errors: u64,
    /// `passed + failed + skipped + errors`.
    pub total: u64,
}

impl TestResultSummary {
    /// Build a summary; negative counts are clamped to zero.
    pub fn from_counts(passed: i64, failed: i64, skipped: i64, errors: i64) -> Self {
        let clamp = |n: i64| u64::try_from(n).unwrap_or(0);
        let (passed, failed, skipped, errors) =
            (clamp(passed), clamp(failed), clamp(skipped), clamp(errors));
        Self {
            passed,
            failed,
            skipped,
            errors,
            total: passed
                .saturating_add(failed)
                .saturating_add(skipped)
                .saturating_add(errors),
        }
    }

    /// Whether nothing was counted.
    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl AddAssign for TestResultSummary {
    fn add_assign(&mut self, other: Self) {
        self.passed = self.passed.saturating_add(other.passed);
        self.failed = self.failed.saturating_add(other.failed);
        self.skipped = self.skipped.saturating_add(other.skipped);
        self.errors = self.errors.saturating_add(other.errors);
        self.total = self.total.saturating_add(other.total);
    }
}

static ANSI_ESCAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").ok());

/// Remove ANSI terminal escape sequences.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    match ANSI_ESCAPE.as_ref() {
        Some(re) => re.replace_all(text, ""),
        None => Cow::Borrowed(text),
    }
}

/// Parse a fragment for a known framework.
///
/// A framework with no format for this build language, or text with no
/// match, yields an empty summary.
pub fn parse_log(
    framework: TestFramework,
    text: &str,
    language: Option<BuildLanguage>,
) -> TestResultSummary {
    let Some(format) = LogFormat::resolve(framework, language) else {
        debug!(%framework, ?language, "no log format for framework and build language");
        return TestResultSummary::default();
    };
    parse_format(format, text)
}

/// Parse a fragment for a framework given by name.
///
/// Names are matched case-insensitively; unknown names yield an empty summary.
pub fn parse_test_results(
    framework: &str,
    text: &str,
    language: Option<BuildLanguage>,
) -> TestResultSummary {
    match framework.parse::<TestFramework>() {
        Ok(framework) => parse_log(framework, text, language),
        Err(_) => {
            debug!(%framework, "unknown test framework");
            TestResultSummary::default()
        }
    }
}

/// Parse a fragment with a concrete format.
pub fn parse_format(format: LogFormat, text: &str) -> TestResultSummary {
    let (Some(regex), Some(spec)) = (format.regex(), format.spec()) else {
        return TestResultSummary::default();
    };

    let text = strip_ansi(text);
    let mut sum = RawCounts::default();
    for caps in regex.captures_iter(&text) {
        let counts = spec.rule.apply(&caps);
        sum.passed = sum.passed.saturating_add(counts.passed);
        sum.failed = sum.failed.saturating_add(counts.failed);
        sum.skipped = sum.skipped.saturating_add(counts.skipped);
        sum.errors = sum.errors.saturating_add(counts.errors);
    }
    TestResultSummary::from_counts(sum.passed, sum.failed, sum.skipped, sum.errors)
}
