//! The log-format table.
//!
//! Each [`LogFormat`] is one regular expression plus an [`Accumulation`]:
//! every result bucket is a weighted sum of capture groups. Adding a format
//! is a new table entry, nothing else.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::error;

use crate::ecosystem::{BuildLanguage, TestFramework};

/// `coefficient * capture group`; an absent group counts as zero.
pub type Term = (i64, usize);

/// How capture groups fold into result buckets.
#[derive(Debug, Clone, Copy)]
pub struct Accumulation {
    /// Passed tests.
    pub passed: &'static [Term],
    /// Failed tests.
    pub failed: &'static [Term],
    /// Skipped or pending tests.
    pub skipped: &'static [Term],
    /// Errored tests, kept apart from failures.
    pub errors: &'static [Term],
}

/// Counts extracted from one regex match, possibly negative before clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCounts {
    /// Passed.
    pub passed: i64,
    /// Failed.
    pub failed: i64,
    /// Skipped.
    pub skipped: i64,
    /// Errors.
    pub errors: i64,
}

impl Accumulation {
    /// Apply the rule to one match.
    pub fn apply(&self, caps: &Captures<'_>) -> RawCounts {
        let eval = |terms: &[Term]| -> i64 {
            terms
                .iter()
                .map(|&(coeff, group)| coeff.saturating_mul(group_value(caps, group)))
                .fold(0, i64::saturating_add)
        };
        RawCounts {
            passed: eval(self.passed),
            failed: eval(self.failed),
            skipped: eval(self.skipped),
            errors: eval(self.errors),
        }
    }
}

fn group_value(caps: &Captures<'_>, group: usize) -> i64 {
    caps.get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// A concrete console summary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogFormat {
    /// `12 passed, 1 failed, 2 skipped`
    Pytest,
    /// `Passed: 5, Failed: 1, Errors: 0, Skipped: 2`
    JunitGradle,
    /// Surefire: `Tests run: 20, Failures: 2, Errors: 1, Skipped: 3`
    JunitMaven,
    /// `10 examples, 2 failures, 1 pending`
    Rspec,
    /// `3 scenarios (1 failed, 2 passed)` followed by a steps line
    CucumberRuby,
    /// Surefire line emitted by cucumber-junit.
    CucumberJava,
    /// `5 tests, 9 assertions, 1 failures, 0 errors, 0 pendings, 0 omissions, 0 notifications`
    Testunit,
    /// `Tests:       1 failed, 2 skipped, 3 passed, 6 total`
    Jest,
    /// `12 passing (2s)` / `2 pending` / `1 failing`
    Mocha,
    /// `Tests: 10, Assertions: 20, Failures: 1, Skipped: 2`
    Phpunit,
    /// `Total tests: 10 - Passed: 8, Failed: 1, Skipped: 1`
    Nunit,
    /// `PASS: 10, FAIL: 1, SKIP: 2`
    GoTest,
    /// `Ran 5 tests in 0.01s` followed by `OK` or `FAILED (...)`
    Unittest,
}

/// One entry of the format table.
#[derive(Debug)]
pub struct FormatSpec {
    /// Format this entry describes.
    pub format: LogFormat,
    /// Regular expression matched against the whole fragment.
    pub pattern: &'static str,
    /// How groups fold into buckets.
    pub rule: Accumulation,
}

const SURE_FIRE: &str = r"Tests run: (\d+), Failures: (\d+), Errors: (\d+), Skipped: (\d+)";

const SURE_FIRE_RULE: Accumulation = Accumulation {
    passed: &[(1, 1), (-1, 2), (-1, 3), (-1, 4)],
    failed: &[(1, 2)],
    skipped: &[(1, 4)],
    errors: &[(1, 3)],
};

/// The format table.
pub const FORMATS: &[FormatSpec] = &[
    FormatSpec {
        format: LogFormat::Pytest,
        pattern: r"(?:(\d+)\s+passed)?(?:, )?(?:(\d+)\s+failed)?(?:, )?(?:(\d+)\s+skipped)?",
        rule: Accumulation {
            passed: &[(1, 1)],
            failed: &[(1, 2)],
            skipped: &[(1, 3)],
            errors: &[],
        },
    },
    FormatSpec {
        format: LogFormat::JunitGradle,
        pattern: r"Passed: (\d+), Failed: (\d+), Errors: (\d+), Skipped: (\d+)",
        rule: Accumulation {
            passed: &[(1, 1)],
            failed: &[(1, 2)],
            skipped: &[(1, 4)],
            errors: &[(1, 3)],
        },
    },
    FormatSpec {
        format: LogFormat::JunitMaven,
        pattern: SURE_FIRE,
        rule: SURE_FIRE_RULE,
    },
    FormatSpec {
        format: LogFormat::Rspec,
        pattern: r"(\d+) examples?, (\d+) failures?(?:, (\d+) pending)?",
        rule: Accumulation {
            passed: &[(1, 1), (-1, 2), (-1, 3)],
            failed: &[(1, 2)],
            skipped: &[(1, 3)],
            errors: &[],
        },
    },
    FormatSpec {
        format: LogFormat::CucumberRuby,
        // Groups 2-5: scenarios failed/skipped/undefined/passed.
        // Groups 7-10: steps failed/skipped/undefined/passed. Undefined is not counted.
        pattern: concat!(
            r"(\d+) scenarios? \((?:(\d+) failed(?:, )?)?(?:(\d+) skipped(?:, )?)?",
            r"(?:(\d+) undefined(?:, )?)?(?:\d+ pending(?:, )?)?(?:(\d+) passed)?\)",
            r"[\s\S]*?",
            r"(\d+) steps? \((?:(\d+) failed(?:, )?)?(?:(\d+) skipped(?:, )?)?",
            r"(?:(\d+) undefined(?:, )?)?(?:\d+ pending(?:, )?)?(?:(\d+) passed)?\)",
        ),
        rule: Accumulation {
            passed: &[(1, 5), (1, 10)],
            failed: &[(1, 2), (1, 7)],
            skipped: &[(1, 3), (1, 8)],
            errors: &[],
        },
    },
    FormatSpec {
        format: LogFormat::CucumberJava,
        pattern: SURE_FIRE,
        rule: SURE_FIRE_RULE,
    },
    FormatSpec {
        format: LogFormat::Testunit,
        pattern: r"(\d+) tests, (\d+) assertions, (\d+) failures, (\d+) errors, (\d+) pendings, (\d+) omissions, (\d+) notifications",
        rule: Accumulation {
            passed: &[(1, 1)],
            failed: &[(1, 3)],
            skipped: &[],
            errors: &[(1, 4)],
        },
    },
    FormatSpec {
        format: LogFormat::Jest,
        pattern: r"Tests:\s+(?:(\d+) failed, )?(?:(\d+) skipped, )?(?:(\d+) todo, )?(?:(\d+) passed, )?(\d+) total",
        rule: Accumulation {
            passed: &[(1, 4)],
            failed: &[(1, 1)],
            skipped: &[(1, 2), (1, 3)],
            errors: &[],
        },
    },
    FormatSpec {
        format: LogFormat::Mocha,
        pattern: r"(\d+) passing(?: \([^)]*\))?(?:\s+(\d+) pending)?(?:\s+(\d+) failing)?",
        rule: Accumulation {
            passed: &[(1, 1)],
            failed: &[(1, 3)],
            skipped: &[(1, 2)],
            errors: &[],
        },
    },
    FormatSpec {
        format: LogFormat::Phpunit,
        pattern: r"Tests: (\d+), Assertions: (\d+), Failures: (\d+), Skipped: (\d+)",
        rule: Accumulation {
            passed: &[(1, 1), (-1, 3), (-1, 4)],
            failed: &[(1, 3)],
            skipped: &[(1, 4)],
            errors: &[],
        },
    },
    FormatSpec {
        format: LogFormat::Nunit,
        pattern: r"Total tests: (\d+) - Passed: (\d+), Failed: (\d+), Skipped: (\d+)",
        rule: Accumulation {
            passed: &[(1, 2)],
            failed: &[(1, 3)],
            skipped: &[(1, 4)],
            errors: &[],
        },
    },
    FormatSpec {
        format: LogFormat::GoTest,
        pattern: r"PASS: (\d+), FAIL: (\d+), SKIP: (\d+)",
        rule: Accumulation {
            passed: &[(1, 1)],
            failed: &[(1, 2)],
            skipped: &[(1, 3)],
            errors: &[],
        },
    },
    FormatSpec {
        format: LogFormat::Unittest,
        pattern: r"Ran (\d+) tests? in [\d.]+s\s+(?:OK|FAILED)(?: \((?:failures=(\d+))?(?:, )?(?:errors=(\d+))?(?:, )?(?:skipped=(\d+))?[^)]*\))?",
        rule: Accumulation {
            passed: &[(1, 1), (-1, 2), (-1, 3), (-1, 4)],
            failed: &[(1, 2)],
            skipped: &[(1, 4)],
            errors: &[(1, 3)],
        },
    },
];

static COMPILED: LazyLock<HashMap<LogFormat, Regex>> = LazyLock::new(|| {
    FORMATS
        .iter()
        .filter_map(|spec| match Regex::new(spec.pattern) {
            Ok(re) => Some((spec.format, re)),
            Err(e) => {
                error!(format = ?spec.format, error = %e, "log pattern does not compile");
                None
            }
        })
        .collect()
});

impl LogFormat {
    /// Pick the format for a framework, given the repository's build language.
    ///
    /// Gradle builds report JUnit with the four-field
    /// `Passed/Failed/Errors/Skipped` summary. Every other JUnit build (Maven,
    /// Ant, or an undetected build language) is read from the Surefire
    /// `Tests run:` line.
    pub const fn resolve(framework: TestFramework, language: Option<BuildLanguage>) -> Option<Self> {
        Some(match framework {
            TestFramework::Junit => match language {
                Some(BuildLanguage::JavaGradle) => Self::JunitGradle,
                _ => Self::JunitMaven,
            },
            TestFramework::Rspec => Self::Rspec,
            TestFramework::Testunit => Self::Testunit,
            TestFramework::CucumberRuby => Self::CucumberRuby,
            TestFramework::CucumberJava => Self::CucumberJava,
            TestFramework::Phpunit => Self::Phpunit,
            TestFramework::Pytest => Self::Pytest,
            TestFramework::Unittest => Self::Unittest,
            TestFramework::Jest => Self::Jest,
            TestFramework::Mocha => Self::Mocha,
            TestFramework::Nunit => Self::Nunit,
            TestFramework::GoTest => Self::GoTest,
        })
    }

    /// The table entry for this format.
    pub fn spec(self) -> Option<&'static FormatSpec> {
        FORMATS.iter().find(|spec| spec.format == self)
    }

    /// The compiled expression for this format.
    pub fn regex(self) -> Option<&'static Regex> {
        COMPILED.get(&self)
    }
}
