//! One-pass statistics over record files.
//!
//! Used to sanity-check generated data and the output of a sort: a file is
//! `sorted` when every record is >= the one before it.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::config::TruncationPolicy;
use crate::error::{Error, Result};
use crate::reader::for_each_record;
use crate::record::{ByteOrder, records_in};

/// Statistics for one record file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub path: PathBuf,
    pub bytes: u64,
    pub records: u64,
    /// `None` for an empty file
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Ascending (non-decreasing) order; trivially true for 0 or 1 records
    pub sorted: bool,
    /// Bytes of a partial trailing record that were skipped
    pub truncated_tail_bytes: usize,
}

struct Accumulator {
    records: u64,
    min: Option<i64>,
    max: Option<i64>,
    previous: Option<i64>,
    sorted: bool,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            records: 0,
            min: None,
            max: None,
            previous: None,
            sorted: true,
        }
    }

    fn observe(&mut self, value: i64) {
        self.records += 1;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        if self.previous.is_some_and(|prev| value < prev) {
            self.sorted = false;
        }
        self.previous = Some(value);
    }
}

/// Scan `path` and report its statistics.
pub fn inspect_file(
    path: &Path,
    policy: TruncationPolicy,
    order: ByteOrder,
) -> Result<FileStats> {
    let mut acc = Accumulator::new();
    let dropped = for_each_record(path, policy, order, |value| {
        acc.observe(value);
        Ok(())
    })?
    .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))?;

    let bytes = std::fs::metadata(path)
        .map_err(|e| Error::io_at(path, e))?
        .len();
    let whole = bytes.checked_sub(dropped as u64).and_then(records_in);
    if whole != Some(acc.records) {
        return Err(Error::InvariantViolation(format!(
            "{} is {bytes} bytes but {} records were read",
            path.display(),
            acc.records
        )));
    }

    debug!(
        path = %path.display(),
        records = acc.records,
        sorted = acc.sorted,
        "Inspected file"
    );

    Ok(FileStats {
        path: path.to_path_buf(),
        bytes,
        records: acc.records,
        min: acc.min,
        max: acc.max,
        sorted: acc.sorted,
        truncated_tail_bytes: dropped,
    })
}

/// Inspect every `.bin` file directly inside `dir`, ordered by file name.
pub fn inspect_dir(
    dir: &Path,
    policy: TruncationPolicy,
    order: ByteOrder,
) -> Result<Vec<FileStats>> {
    if !dir.is_dir() {
        return Err(Error::FileNotFound(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io_at(dir, e))? {
        let path = entry.map_err(|e| Error::io_at(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "bin") {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| inspect_file(path, policy, order))
        .collect()
}
