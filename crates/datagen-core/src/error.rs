//! Error types for datagen-core

use std::fmt::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Remediation command for resolving an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RemediationCommand {
    /// Short label describing the command purpose
    pub label: String,
    /// Command to run
    pub command: String,
}

/// Actionable remediation guidance for an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Remediation {
    /// One-line summary of how to fix the issue
    pub summary: String,
    /// Suggested commands to resolve or diagnose the issue
    pub commands: Vec<RemediationCommand>,
    /// Additional alternative guidance
    pub alternatives: Vec<String>,
}

impl Remediation {
    /// Create a new remediation with a summary
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            commands: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    /// Add a suggested command
    #[must_use]
    pub fn command(mut self, label: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.push(RemediationCommand {
            label: label.into(),
            command: command.into(),
        });
        self
    }

    /// Add an alternative suggestion
    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Render remediation text for human-readable output
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "To fix:");
        let _ = writeln!(output, "  {}", self.summary);

        if !self.commands.is_empty() {
            let _ = writeln!(output, "  Commands:");
            for cmd in &self.commands {
                let _ = writeln!(output, "    - {}: {}", cmd.label, cmd.command);
            }
        }

        if !self.alternatives.is_empty() {
            let _ = writeln!(output, "  Alternatives:");
            for alt in &self.alternatives {
                let _ = writeln!(output, "    - {alt}");
            }
        }

        output
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for datagen-core
#[derive(Error, Debug)]
pub enum Error {
    /// Impossible sizing parameters or an unusable config file
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Filesystem failure tied to a specific path
    #[error("I/O error on {}: {source}", .path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O errors without path context (stdout, in-memory writers)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal size bookkeeping went wrong
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Path does not resolve to an existing regular file
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// File ends with a partial record
    #[error(
        "Truncated record in {}: {trailing} trailing byte(s) at offset {offset}",
        .path.display()
    )]
    TruncatedRecord {
        path: PathBuf,
        offset: u64,
        trailing: usize,
    },
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Return remediation guidance when available.
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::Config(err) => Some(err.remediation()),
            Self::IoAt { path, .. } => Some(
                Remediation::new(format!(
                    "Check that {} is reachable and writable, then retry.",
                    path.display()
                ))
                .command("Check permissions", format!("ls -ld \"{}\"", path.display()))
                .alternative("Pick a different --output-dir."),
            ),
            Self::Io(_) => Some(
                Remediation::new("Check filesystem permissions and paths, then retry.")
                    .alternative("Verify the output directory exists and is writable."),
            ),
            Self::InvariantViolation(_) => Some(
                Remediation::new(
                    "Internal size bookkeeping failed. Rerun with --seed to reproduce.",
                )
                .command("Dry run", "datagen plan --json")
                .alternative("Report the issue with the seed and sizing flags used."),
            ),
            Self::FileNotFound(path) => Some(
                Remediation::new(format!("Verify the path exists: {}", path.display()))
                    .command("List data files", "ls -l ./data"),
            ),
            Self::TruncatedRecord { path, .. } => Some(
                Remediation::new(format!(
                    "{} is not a whole number of 8-byte records.",
                    path.display()
                ))
                .command(
                    "Read anyway",
                    format!("datagen show --allow-truncated \"{}\"", path.display()),
                )
                .alternative("Regenerate the file with datagen generate."),
            ),
        }
    }
}

/// Configuration and sizing errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file {0}: {1}")]
    ReadFailed(String, String),

    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    #[error("Invalid byte size {0:?}: {1}")]
    InvalidSize(String, String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Partition did not converge after {passes} passes ({remaining} bytes left)")]
    NoConvergence { passes: u64, remaining: u64 },
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::FileNotFound(path) => Remediation::new(format!(
                "Config file not found: {path}. Verify the path and retry."
            ))
            .command("Check path", format!("ls -l \"{path}\""))
            .alternative("Pass --config with the correct path."),
            Self::ReadFailed(path, _) => Remediation::new(format!(
                "Failed to read config file: {path}. Check permissions."
            ))
            .command("Check permissions", format!("ls -l \"{path}\""))
            .alternative("Ensure the file is readable by the current user."),
            Self::ParseFailed(_) => {
                Remediation::new("Config parse failed. Fix the syntax and retry.")
                    .alternative("Validate the TOML syntax of datagen.toml.")
            }
            Self::InvalidSize(_, _) => {
                Remediation::new("Use a plain byte count or a binary suffix such as 64KiB or 4GiB.")
                    .command("Example", "datagen generate --total-size 1GiB --files 10")
            }
            Self::ValidationError(_) => Remediation::new(
                "Sizing parameters are inconsistent. Fix the invalid fields and retry.",
            )
            .command("Dry run", "datagen plan")
            .alternative("Ensure total size >= files * base size."),
            Self::NoConvergence { .. } => Remediation::new(
                "The size partition ran out of passes. Raise the increment cap or max passes.",
            )
            .command("Dry run", "datagen plan --increment-cap 32MiB")
            .alternative("Set generate.max_passes higher in datagen.toml."),
        }
    }
}

/// Format an error with remediation guidance for display.
#[must_use]
pub fn format_error_with_remediation(error: &Error) -> String {
    let mut output = format!("Error: {error}");
    if let Some(remediation) = error.remediation() {
        output.push('\n');
        output.push('\n');
        output.push_str(&remediation.render_plain());
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remediation_available_for_error_variants() {
        let errors = vec![
            Error::Config(ConfigError::FileNotFound("datagen.toml".to_string())),
            Error::Config(ConfigError::ReadFailed(
                "datagen.toml".to_string(),
                "denied".to_string(),
            )),
            Error::Config(ConfigError::ParseFailed("bad toml".to_string())),
            Error::Config(ConfigError::InvalidSize("4XB".to_string(), "suffix".to_string())),
            Error::Config(ConfigError::ValidationError("too small".to_string())),
            Error::Config(ConfigError::NoConvergence {
                passes: 10,
                remaining: 8,
            }),
            Error::io_at("/tmp/out", std::io::Error::other("denied")),
            Error::Io(std::io::Error::other("broken pipe")),
            Error::InvariantViolation("sum mismatch".to_string()),
            Error::FileNotFound(PathBuf::from("/nope.bin")),
            Error::TruncatedRecord {
                path: PathBuf::from("/tmp/a.bin"),
                offset: 16,
                trailing: 3,
            },
        ];

        for err in errors {
            let remediation = err.remediation().expect("remediation");
            assert!(!remediation.summary.is_empty(), "{err}");
        }
    }

    #[test]
    fn render_plain_includes_commands() {
        let r = Remediation::new("Fix it").command("Run", "datagen plan");
        let output = r.render_plain();
        assert!(output.contains("To fix:"));
        assert!(output.contains("Run: datagen plan"));
    }

    #[test]
    fn render_plain_omits_empty_sections() {
        let r = Remediation::new("Fix it");
        let output = r.render_plain();
        assert!(!output.contains("Commands:"));
        assert!(!output.contains("Alternatives:"));
    }

    #[test]
    fn truncated_record_display_includes_offset() {
        let err = Error::TruncatedRecord {
            path: PathBuf::from("x.bin"),
            offset: 24,
            trailing: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("x.bin"));
        assert!(msg.contains("24"));
        assert!(msg.contains('5'));
    }

    #[test]
    fn io_at_keeps_path_and_source() {
        let err = Error::io_at("/data/out.bin", std::io::Error::other("disk full"));
        let msg = err.to_string();
        assert!(msg.contains("/data/out.bin"));
        assert!(msg.contains("disk full"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn from_config_error() {
        let err: Error = ConfigError::ValidationError("x".to_string()).into();
        assert!(matches!(
            err,
            Error::Config(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn format_error_appends_remediation() {
        let err = Error::InvariantViolation("sum mismatch".to_string());
        let text = format_error_with_remediation(&err);
        assert!(text.starts_with("Error: Invariant violation: sum mismatch"));
        assert!(text.contains("To fix:"));
    }
}
