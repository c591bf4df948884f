//! Record file generation.
//!
//! Writes one file of uniformly random `i64` records per [`SizePlan`] entry.
//! Files are written one after another and each is flushed before the next
//! starts.

use std::fs::File;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use crate::config::GenerateConfig;
use crate::error::{Error, Result};
use crate::partition::{SizePlan, plan_sizes};
use crate::record::{ByteOrder, RECORD_WIDTH, RecordWriter};

/// One written data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    /// Position in the plan (0-based)
    pub position: usize,
    pub file_name: String,
    pub path: PathBuf,
    pub records: u64,
    /// Size reported by the filesystem after the write
    pub on_disk_bytes: u64,
}

/// Summary of a generation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub files: Vec<GeneratedFile>,
}

impl GenerationReport {
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.on_disk_bytes).sum()
    }

    #[must_use]
    pub fn total_records(&self) -> u64 {
        self.files.iter().map(|f| f.records).sum()
    }
}

/// RNG for a run: seeded when `seed` is set, OS entropy otherwise.
#[must_use]
pub fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Build the size plan a config describes.
pub fn plan_for<R: Rng + ?Sized>(config: &GenerateConfig, rng: &mut R) -> Result<SizePlan> {
    config.validate()?;
    match config.uniform_size {
        Some(size) => SizePlan::uniform(config.file_count, size),
        None => plan_sizes(&config.partition_params(), rng),
    }
}

/// Write `size / 8` random records to `path`, replacing any existing file.
pub fn generate_file<R: Rng + ?Sized>(
    path: &Path,
    size: u64,
    order: ByteOrder,
    rng: &mut R,
) -> Result<u64> {
    if size % RECORD_WIDTH != 0 {
        return Err(Error::InvariantViolation(format!(
            "file size {size} for {} is not a multiple of {RECORD_WIDTH}",
            path.display()
        )));
    }
    let records = size / RECORD_WIDTH;

    let file = File::create(path).map_err(|e| Error::io_at(path, e))?;
    let mut writer = RecordWriter::new(file, order);
    for _ in 0..records {
        writer
            .write_record(rng.random::<i64>())
            .map_err(|e| Error::io_at(path, e))?;
    }
    let file = writer.finish().map_err(|e| Error::io_at(path, e))?;
    file.sync_all().map_err(|e| Error::io_at(path, e))?;

    Ok(records)
}

/// Write every file in `plan` into `config.output_dir`.
///
/// `on_file` runs after each file is complete, in plan order.
pub fn generate_files<R, F>(
    config: &GenerateConfig,
    plan: &SizePlan,
    rng: &mut R,
    mut on_file: F,
) -> Result<GenerationReport>
where
    R: Rng + ?Sized,
    F: FnMut(&GeneratedFile),
{
    let dir = &config.output_dir;
    std::fs::create_dir_all(dir).map_err(|e| Error::io_at(dir, e))?;

    let mut report = GenerationReport {
        files: Vec::with_capacity(plan.len()),
    };

    for (position, &size) in plan.sizes().iter().enumerate() {
        let file_name = config.file_name(position);
        let path = dir.join(&file_name);

        let records = generate_file(&path, size, config.byte_order, rng)?;
        let on_disk_bytes = std::fs::metadata(&path)
            .map_err(|e| Error::io_at(&path, e))?
            .len();

        info!(
            file_name = %file_name,
            bytes = on_disk_bytes,
            records,
            "Generated file"
        );

        let generated = GeneratedFile {
            position,
            file_name,
            path,
            records,
            on_disk_bytes,
        };
        on_file(&generated);
        report.files.push(generated);
    }

    info!(
        files = report.files.len(),
        total_bytes = report.total_bytes(),
        output_dir = %dir.display(),
        "Generation complete"
    );

    Ok(report)
}
