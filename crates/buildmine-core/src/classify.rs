//! Changed-file classification.
//!
//! Every path touched by a commit falls into exactly one [`FileCategory`].
//! Checks run in a fixed order: test, production, documentation, other.
//! A path that looks like a test wins even when its extension is a source
//! extension.

use std::fmt;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Substrings that mark a path as test code (matched case-insensitively).
const TEST_INDICATORS: &[&str] = &[
    "test",
    "tests",
    "spec",
    "__tests__",
    "unittest",
    "/tests/",
    "/spec/",
];

/// Source, script, markup and styling extensions counted as production code.
const PRODUCTION_EXTENSIONS: &[&str] = &[
    "py", "java", "cpp", "js", "ts", "c", "h", "cs", "swift", "go", "rb", "php", "kt", "scala",
    "groovy", "rs", "m", "lua", "pl", "sh", "bash", "sql", "ps1", "cls", "trigger", "f", "f90",
    "asm", "s", "vhd", "vhdl", "verilog", "sv", "tml", "json", "xml", "html", "css", "sass",
    "less", "jsp", "asp", "aspx", "erb", "twig", "hbs",
];

const DOC_EXTENSIONS: &[&str] = &["md", "rst", "txt", "pdf"];

const DOC_DIRECTORIES: &[&str] = &[
    "doc",
    "docs",
    "documentation",
    "guide",
    "help",
    "manual",
    "manuals",
    "guides",
];

/// Category of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    /// Test sources and fixtures.
    Test,
    /// Production source or config.
    Production,
    /// Documentation.
    Documentation,
    /// Anything else (assets, lockfiles, binaries, ...).
    Other,
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Production => write!(f, "production"),
            Self::Documentation => write!(f, "documentation"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Classify a repository-relative path.
pub fn classify(path: &str) -> FileCategory {
    if is_test_path(path) {
        FileCategory::Test
    } else if is_production_path(path) {
        FileCategory::Production
    } else if is_documentation_path(path) {
        FileCategory::Documentation
    } else {
        FileCategory::Other
    }
}

/// Whether the path contains any test indicator.
pub fn is_test_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    TEST_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Whether the path is production code: not a test, with a source extension.
pub fn is_production_path(path: &str) -> bool {
    !is_test_path(path)
        && extension(path).is_some_and(|ext| PRODUCTION_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether the path is documentation.
///
/// `.html` pages only count when they live under a documentation directory
/// (as a path segment or anywhere in the path); other files count when any
/// segment is a documentation directory.
pub fn is_documentation_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    let ext = extension(&lower);

    if ext
        .as_deref()
        .is_some_and(|ext| DOC_EXTENSIONS.contains(&ext))
    {
        return true;
    }

    if ext.as_deref() == Some("html") {
        return has_doc_segment(&lower) || DOC_DIRECTORIES.iter().any(|dir| lower.contains(dir));
    }

    has_doc_segment(&lower)
}

/// The file extension with its leading dot (e.g. `".rs"`), as written.
///
/// Empty when the file has none.
pub fn dotted_extension(path: &str) -> String {
    Utf8Path::new(path)
        .extension()
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

fn extension(path: &str) -> Option<String> {
    Utf8Path::new(path).extension().map(str::to_lowercase)
}

fn has_doc_segment(lower: &str) -> bool {
    lower
        .split('/')
        .any(|segment| DOC_DIRECTORIES.contains(&segment))
}
