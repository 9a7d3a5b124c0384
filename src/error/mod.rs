//! Error handling for scenario loading, aggregation and publication.

use std::io;
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Errors that can occur while producing scenario summaries
#[derive(Debug, thiserror::Error)]
pub enum RollupError {
    /// Error opening, reading or writing a file
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error reading Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error parsing JSON configuration or credentials
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error converting between Rust records and Arrow batches
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_arrow::Error),

    /// A worker pool could not be started
    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Misconfigured deployment; always fatal
    #[error("Configuration error: {0}")]
    Config(String),

    /// A column the pipeline depends on is absent from a data source
    #[error("DataError: could not find needed column: {column} in data retrieved from {source_name}, please check!")]
    MissingColumn { column: String, source_name: String },

    /// Values present but not usable
    #[error("Invalid data in {source_name}: {message}")]
    InvalidData { source_name: String, message: String },

    /// A scenario reached aggregation without any rows
    #[error("Scenario '{0}' has no data to aggregate")]
    EmptyScenario(String),

    /// Nothing was loaded for any configured scenario
    #[error("no scenarios found - do input files line up with scenarios? configured: {0:?}")]
    NoScenarios(Vec<String>),

    /// One or more scenarios failed to load or aggregate
    #[error("{} scenario(s) failed: {}", .0.len(), .0.join(", "))]
    ScenarioFailures(Vec<String>),

    /// Object store upload failure
    #[error("Publish error for key {key}: {message}")]
    Publish { key: String, message: String },
}

impl RollupError {
    /// Wrap an IO error with the path it occurred on
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build a missing-column error for a named source
    pub fn missing_column(column: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Self::MissingColumn {
            column: column.into(),
            source_name: source.to_string(),
        }
    }

    /// Build an invalid-data error for a named source
    pub fn invalid_data(source: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::InvalidData {
            source_name: source.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error indicates a misconfigured deployment
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::NoScenarios(_))
    }
}

/// Result type for scenario rollup operations
pub type Result<T> = std::result::Result<T, RollupError>;
