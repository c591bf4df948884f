//! datagen: generate, show, and inspect random i64 record files.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use datagen_core::config::{Config, GenerateConfig, LogFormat, TruncationPolicy, parse_byte_size};
use datagen_core::error::format_error_with_remediation;
use datagen_core::generate::{generate_files, plan_for, rng_for};
use datagen_core::inspect::{FileStats, inspect_dir, inspect_file};
use datagen_core::logging::init_logging;
use datagen_core::reader::{PrintOutcome, print_records};
use datagen_core::record::ByteOrder;

#[derive(Parser)]
#[command(name = "datagen", version, about = "Random i64 record files for sort experiments")]
struct Cli {
    /// Config file (default: ./datagen.toml, then ~/.config/datagen/datagen.toml)
    #[arg(long, global = true, env = "DATAGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DATAGEN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (pretty or json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a directory of random record files
    Generate {
        #[command(flatten)]
        sizing: SizingArgs,
    },
    /// Compute the size plan without writing anything
    Plan {
        #[command(flatten)]
        sizing: SizingArgs,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the records of one file, space-separated
    Show {
        path: PathBuf,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// Report record count, min, max and sort order for a file or directory
    Inspect {
        path: PathBuf,
        #[command(flatten)]
        read: ReadArgs,
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Flags that override `[generate]` in the config file
#[derive(Args, Debug, Default)]
struct SizingArgs {
    /// Output directory, created if absent
    #[arg(long, short = 'o', env = "DATAGEN_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,
    /// Sum of all file sizes (e.g. 4GiB)
    #[arg(long, value_parser = parse_byte_size)]
    total_size: Option<u64>,
    /// Number of files
    #[arg(long, short = 'n')]
    files: Option<usize>,
    /// Starting size of every file (e.g. 16KiB)
    #[arg(long, value_parser = parse_byte_size)]
    base_size: Option<u64>,
    /// Largest single growth step (e.g. 2MiB)
    #[arg(long, value_parser = parse_byte_size)]
    increment_cap: Option<u64>,
    /// Give up after this many water-filling passes
    #[arg(long)]
    max_passes: Option<u64>,
    /// Give every file exactly this size instead of partitioning
    #[arg(long, value_parser = parse_byte_size)]
    uniform_size: Option<u64>,
    /// RNG seed for reproducible output
    #[arg(long, env = "DATAGEN_SEED")]
    seed: Option<u64>,
    /// Number used for the first file name
    #[arg(long)]
    first_index: Option<u64>,
    /// File name prefix
    #[arg(long)]
    file_prefix: Option<String>,
    /// Record byte order (native, little, big)
    #[arg(long)]
    byte_order: Option<ByteOrder>,
}

impl SizingArgs {
    fn apply(self, config: &mut GenerateConfig) {
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(total) = self.total_size {
            config.total_size = total;
        }
        if let Some(files) = self.files {
            config.file_count = files;
        }
        if let Some(base) = self.base_size {
            config.base_size = base;
        }
        if let Some(cap) = self.increment_cap {
            config.increment_cap = cap;
        }
        if let Some(passes) = self.max_passes {
            config.max_passes = passes;
        }
        if self.uniform_size.is_some() {
            config.uniform_size = self.uniform_size;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(index) = self.first_index {
            config.first_index = index;
        }
        if let Some(prefix) = self.file_prefix {
            config.file_prefix = prefix;
        }
        if let Some(order) = self.byte_order {
            config.byte_order = order;
        }
    }
}

/// Flags that override `[read]` in the config file
#[derive(Args, Debug, Default)]
struct ReadArgs {
    /// Drop a partial trailing record instead of failing
    #[arg(long)]
    allow_truncated: bool,
    /// Record byte order (native, little, big)
    #[arg(long)]
    byte_order: Option<ByteOrder>,
}

impl ReadArgs {
    fn resolve(&self, config: &Config) -> (TruncationPolicy, ByteOrder) {
        let policy = if self.allow_truncated {
            TruncationPolicy::Ignore
        } else {
            config.read.truncation
        };
        (policy, self.byte_order.unwrap_or(config.read.byte_order))
    }
}

#[derive(Serialize)]
struct PlanEntry {
    file_name: String,
    bytes: u64,
    records: u64,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    output_dir: &'a Path,
    total_bytes: u64,
    passes: u64,
    files: Vec<PlanEntry>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<datagen_core::Error>() {
                Some(core) => eprintln!("{}", format_error_with_remediation(core)),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Generate { sizing } => {
            sizing.apply(&mut config.generate);
            run_generate(&config.generate)
        }
        Commands::Plan { sizing, json } => {
            sizing.apply(&mut config.generate);
            run_plan(&config.generate, json)
        }
        Commands::Show { path, read } => {
            let (policy, order) = read.resolve(&config);
            run_show(&path, policy, order)
        }
        Commands::Inspect { path, read, json } => {
            let (policy, order) = read.resolve(&config);
            run_inspect(&path, policy, order, json)
        }
    }
}

fn run_generate(config: &GenerateConfig) -> anyhow::Result<()> {
    let mut rng = rng_for(config.seed);
    let plan = plan_for(config, &mut rng)?;

    let stdout = std::io::stdout();
    let mut io_error = None;
    generate_files(config, &plan, &mut rng, |file| {
        if io_error.is_none() {
            let mut out = stdout.lock();
            if let Err(e) = writeln!(
                out,
                "generated {}, size: {} bytes",
                file.file_name, file.on_disk_bytes
            ) {
                io_error = Some(e);
            }
        }
    })?;

    match io_error {
        Some(e) => Err(datagen_core::Error::Io(e).into()),
        None => Ok(()),
    }
}

fn run_plan(config: &GenerateConfig, json: bool) -> anyhow::Result<()> {
    let mut rng = rng_for(config.seed);
    let plan = plan_for(config, &mut rng)?;

    let output = PlanOutput {
        output_dir: &config.output_dir,
        total_bytes: plan.total_bytes(),
        passes: plan.passes(),
        files: plan
            .sizes()
            .iter()
            .zip(plan.record_counts())
            .enumerate()
            .map(|(position, (&bytes, records))| PlanEntry {
                file_name: config.file_name(position),
                bytes,
                records,
            })
            .collect(),
    };

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &output)?;
        writeln!(out)?;
    } else {
        for entry in &output.files {
            writeln!(out, "{} {}", entry.file_name, entry.bytes)?;
        }
        writeln!(
            out,
            "total: {} bytes in {} files ({} passes)",
            output.total_bytes,
            output.files.len(),
            output.passes
        )?;
    }
    Ok(())
}

fn run_show(path: &Path, policy: TruncationPolicy, order: ByteOrder) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    match print_records(path, policy, order, &mut out)? {
        PrintOutcome::NotFound => {
            eprintln!("file not found, check the path: {}", path.display());
        }
        PrintOutcome::Printed { records, .. } => {
            tracing::debug!(path = %path.display(), records, "Printed records");
        }
    }
    Ok(())
}

fn run_inspect(
    path: &Path,
    policy: TruncationPolicy,
    order: ByteOrder,
    json: bool,
) -> anyhow::Result<()> {
    let stats = if path.is_dir() {
        inspect_dir(path, policy, order)?
    } else {
        vec![inspect_file(path, policy, order)?]
    };

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &stats)?;
        writeln!(out)?;
        return Ok(());
    }

    for s in &stats {
        writeln!(out, "{}", render_stats(s))?;
    }
    if stats.len() > 1 {
        let unsorted = stats.iter().filter(|s| !s.sorted).count();
        writeln!(
            out,
            "{} files, {} records, {} unsorted",
            stats.len(),
            stats.iter().map(|s| s.records).sum::<u64>(),
            unsorted
        )?;
    }
    Ok(())
}

fn render_stats(stats: &FileStats) -> String {
    let bound = |v: Option<i64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
    format!(
        "{}: records={} bytes={} min={} max={} sorted={}",
        stats.path.display(),
        stats.records,
        stats.bytes,
        bound(stats.min),
        bound(stats.max),
        stats.sorted
    )
}
