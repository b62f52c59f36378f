//! Error types for the akaperf harness

use thiserror::Error;

/// Error types shared across the harness crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// External command returned a non-zero exit status.
    #[error("Command failed: {0}")]
    Command(String),

    /// External command exceeded its timeout budget.
    #[error("Command timed out after {seconds}s: {command}")]
    CommandTimeout {
        /// Timeout budget that was exceeded
        seconds: u64,
        /// The command that was running
        command: String,
    },

    /// UE template manipulation errors.
    #[error("Template error: {0}")]
    Template(String),

    /// Metrics collection or result parsing errors.
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Chart rendering errors.
    #[error("Plot error: {0}")]
    Plot(String),

    /// Filesystem and process I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// CSV read/write errors.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
