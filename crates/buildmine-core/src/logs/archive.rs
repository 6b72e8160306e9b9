//! Run log archives.
//!
//! A run's logs arrive as one zip with a `.txt` fragment per job or step.
//! Every fragment is parsed and the results summed. An archive that cannot be
//! read counts as no test results.

use std::io::{Cursor, Read};

use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipResult;

use super::{TestResultSummary, parse_log};
use crate::ecosystem::{BuildLanguage, TestFramework};

/// Decode every `.txt` fragment of an archive, lossily.
pub fn fragments(bytes: &[u8]) -> ZipResult<Vec<(String, String)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut out = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || !entry.name().ends_with(".txt") {
            continue;
        }
        let mut raw = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry.read_to_end(&mut raw)?;
        out.push((
            entry.name().to_string(),
            String::from_utf8_lossy(&raw).into_owned(),
        ));
    }

    Ok(out)
}

/// Sum the test results of every fragment in a run's log archive.
///
/// Without a framework, or when the archive is not a readable zip, the
/// summary is empty.
pub fn summarize_archive(
    bytes: &[u8],
    framework: Option<TestFramework>,
    language: Option<BuildLanguage>,
) -> TestResultSummary {
    let Some(framework) = framework else {
        return TestResultSummary::default();
    };

    let fragments = match fragments(bytes) {
        Ok(fragments) => fragments,
        Err(e) => {
            warn!(error = %e, len = bytes.len(), "unreadable log archive, counting no tests");
            return TestResultSummary::default();
        }
    };

    let mut total = TestResultSummary::default();
    for (name, text) in &fragments {
        if text.is_empty() {
            continue;
        }
        let parsed = parse_log(framework, text, language);
        if !parsed.is_empty() {
            debug!(fragment = %name, ?parsed, "parsed fragment");
        }
        total += parsed;
    }
    total
}
