//! datagen-core: Core library for datagen
//!
//! Generates directories of binary files filled with random 64-bit signed
//! integers, used as input for external-sort experiments, and reads them back.
//!
//! # Architecture
//!
//! ```text
//! GenerateConfig → partition (SizePlan) → generate (data_file_<n>.bin)
//!
//! data file → reader (decoded i64 stream) / inspect (count, min, max, sorted)
//! ```
//!
//! # Modules
//!
//! - `config`: Configuration management (datagen.toml)
//! - `error`: Error types with remediation hints
//! - `generate`: Record file generation
//! - `inspect`: Per-file statistics and sortedness checks
//! - `logging`: `tracing` subscriber setup
//! - `partition`: Randomized size partitioning
//! - `reader`: Record file decoding
//! - `record`: Fixed-width record codec
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod generate;
pub mod inspect;
pub mod logging;
pub mod partition;
pub mod reader;
pub mod record;

pub use error::{Error, Result};

/// Version of the datagen-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
