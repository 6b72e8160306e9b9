//! Append-only CSV output.
//!
//! Records are appended to one file; the header is written only when the
//! file is new or empty. Existing rows are scanned on open so a re-run can
//! skip builds already written.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, instrument, warn};

use crate::error::{SinkError, SinkResult};
use crate::record::BuildRecord;

/// Destination for build records.
pub trait RecordSink {
    /// Build ids already recorded for `repo`.
    fn seen(&self, repo: &str) -> HashSet<u64>;

    /// Record one build.
    fn append(&mut self, record: &BuildRecord) -> SinkResult<()>;
}

/// CSV file that build records are appended to.
pub struct CsvSink {
    path: Utf8PathBuf,
    writer: csv::Writer<File>,
    existing: HashMap<String, HashSet<u64>>,
    written: usize,
}

impl std::fmt::Debug for CsvSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("path", &self.path)
            .field("repos", &self.existing.len())
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

impl CsvSink {
    /// Open `path` for appending, creating it if needed.
    #[instrument(skip(path), fields(path = %path))]
    pub fn open(path: &Utf8Path) -> SinkResult<Self> {
        let has_content = path
            .metadata()
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        let existing = if has_content {
            scan_existing(path)?
        } else {
            HashMap::new()
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.to_string(),
                source,
            })?;
        let writer = csv::WriterBuilder::new()
            .has_headers(!has_content)
            .from_writer(file);

        debug!(
            repos = existing.len(),
            rows = existing.values().map(HashSet::len).sum::<usize>(),
            "output opened"
        );
        Ok(Self {
            path: path.to_owned(),
            writer,
            existing,
            written: 0,
        })
    }

    /// Output file path.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Whether a row for this build is already in the file.
    pub fn contains(&self, repo: &str, id_build: u64) -> bool {
        self.existing
            .get(repo)
            .is_some_and(|ids| ids.contains(&id_build))
    }

    /// Rows appended through this sink.
    pub const fn written(&self) -> usize {
        self.written
    }
}

impl RecordSink for CsvSink {
    fn seen(&self, repo: &str) -> HashSet<u64> {
        self.existing.get(repo).cloned().unwrap_or_default()
    }

    /// Append one record and flush it to disk.
    fn append(&mut self, record: &BuildRecord) -> SinkResult<()> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        self.existing
            .entry(record.repo.clone())
            .or_default()
            .insert(record.id_build);
        self.written += 1;
        Ok(())
    }
}

impl RecordSink for Vec<BuildRecord> {
    fn seen(&self, repo: &str) -> HashSet<u64> {
        self.iter()
            .filter(|r| r.repo == repo)
            .map(|r| r.id_build)
            .collect()
    }

    fn append(&mut self, record: &BuildRecord) -> SinkResult<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Collect `(repo, id_build)` pairs of an existing output file.
///
/// Rows whose id does not parse are ignored. A file without the two
/// columns yields nothing.
fn scan_existing(path: &Utf8Path) -> SinkResult<HashMap<String, HashSet<u64>>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path.as_std_path())?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let (Some(repo_col), Some(id_col)) = (column("repo"), column("id_build")) else {
        warn!("output has no repo/id_build columns, nothing to skip");
        return Ok(HashMap::new());
    };

    let mut existing: HashMap<String, HashSet<u64>> = HashMap::new();
    for row in reader.records() {
        let row = row?;
        let (Some(repo), Some(id)) = (row.get(repo_col), row.get(id_col)) else {
            continue;
        };
        if let Ok(id) = id.trim().parse::<u64>() {
            existing.entry(repo.to_string()).or_default().insert(id);
        }
    }
    Ok(existing)
}
