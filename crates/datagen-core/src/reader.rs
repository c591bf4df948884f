//! Record file reader.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::TruncationPolicy;
use crate::error::{Error, Result};
use crate::record::{ByteOrder, Chunk, RecordReader};

/// Result of reading a record file into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The path is not an existing regular file
    NotFound,
    Records(Vec<i64>),
}

/// Result of streaming a record file to a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintOutcome {
    NotFound,
    Printed {
        records: u64,
        /// Bytes of a partial trailing record dropped under `TruncationPolicy::Ignore`
        dropped_bytes: usize,
    },
}

fn open_regular(path: &Path) -> Result<Option<File>> {
    if !path.is_file() {
        debug!(path = %path.display(), "Not a regular file");
        return Ok(None);
    }
    File::open(path).map(Some).map_err(|e| Error::io_at(path, e))
}

/// Visit every record in `path` in file order.
///
/// Returns `Ok(None)` when the path is not a regular file, otherwise the
/// number of bytes dropped from a partial tail (always 0 under
/// `TruncationPolicy::Error`).
pub(crate) fn for_each_record<F>(
    path: &Path,
    policy: TruncationPolicy,
    order: ByteOrder,
    mut visit: F,
) -> Result<Option<usize>>
where
    F: FnMut(i64) -> Result<()>,
{
    let Some(file) = open_regular(path)? else {
        return Ok(None);
    };

    let mut reader = RecordReader::new(file, order);
    for chunk in reader.by_ref() {
        match chunk.map_err(|e| Error::io_at(path, e))? {
            Chunk::Record(value) => visit(value)?,
            Chunk::Partial { offset, len } => match policy {
                TruncationPolicy::Error => {
                    return Err(Error::TruncatedRecord {
                        path: PathBuf::from(path),
                        offset,
                        trailing: len,
                    });
                }
                TruncationPolicy::Ignore => {
                    warn!(
                        path = %path.display(),
                        offset,
                        trailing = len,
                        "Dropping partial trailing record"
                    );
                    return Ok(Some(len));
                }
            },
        }
    }

    debug!(path = %path.display(), bytes = reader.offset(), "Read records");
    Ok(Some(0))
}

/// Decode every record of `path` into memory.
pub fn read_records(
    path: &Path,
    policy: TruncationPolicy,
    order: ByteOrder,
) -> Result<ReadOutcome> {
    let mut values = Vec::new();
    let outcome = for_each_record(path, policy, order, |value| {
        values.push(value);
        Ok(())
    })?;
    Ok(match outcome {
        None => ReadOutcome::NotFound,
        Some(_) => ReadOutcome::Records(values),
    })
}

/// Stream the records of `path` to `out`, space-separated.
pub fn print_records<W: Write>(
    path: &Path,
    policy: TruncationPolicy,
    order: ByteOrder,
    out: &mut W,
) -> Result<PrintOutcome> {
    let mut records = 0u64;
    let outcome = for_each_record(path, policy, order, |value| {
        if records > 0 {
            out.write_all(b" ")?;
        }
        write!(out, "{value}")?;
        records += 1;
        Ok(())
    })?;

    let Some(dropped_bytes) = outcome else {
        return Ok(PrintOutcome::NotFound);
    };
    if records > 0 {
        out.write_all(b"\n")?;
    }
    out.flush()?;

    Ok(PrintOutcome::Printed {
        records,
        dropped_bytes,
    })
}
