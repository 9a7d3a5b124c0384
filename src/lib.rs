//! Aggregation of epidemic simulation scenarios into published summary tables.
//!
//! Each scenario's simulation output files are region-filtered and combined,
//! summed per simulation run, and reduced to mean, median and quartiles per
//! timestamp (and optionally per county). The resulting CSVs are uploaded to an
//! object store under `latest/` and a dated namespace.

pub mod actuals;
pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod reader;
pub mod schema;
pub mod utils;

// Re-export the most common types for easier use
// Configuration
pub use config::{ConfigOverlay, PipelineConfig, PublishConfig, RegionRange, ScenarioConfig};
pub use error::{Result, RollupError};

// Loading and aggregation
pub use aggregate::{ScenarioSummary, SummaryTable, aggregate_scenario};
pub use dataset::{CombinedDataset, SimulationRecord};
pub use loader::{LoadReport, ScenarioLoad, ScenarioLoader, SkipReason, load_scenarios};

// Output and publication
pub use output::write_scenario_outputs;
pub use pipeline::{Pipeline, RunReport};
pub use publish::{JsonCredentialStore, LocalObjectStore, Publisher};

// Arrow types
pub use arrow::record_batch::RecordBatch;
