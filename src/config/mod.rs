//! Configuration for a rollup run.
//!
//! A [`PipelineConfig`] is built once at startup (defaults, optionally overlaid
//! with a JSON file, then command line flags) and passed by reference to every
//! stage. Nothing mutates it afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RollupError};

/// Default filename prefix for simulation output files
pub const DEFAULT_FILE_PREFIX: &str = "high_death";

/// A named scenario and the directory (relative to the input root) holding its files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub path: PathBuf,
}

impl ScenarioConfig {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// File stem used for this scenario's outputs
    #[must_use]
    pub fn file_stem(&self) -> String {
        scenario_file_stem(&self.name)
    }
}

/// Output file stem for a scenario name (spaces become underscores)
#[must_use]
pub fn scenario_file_stem(name: &str) -> String {
    name.replace(' ', "_")
}

/// Closed-open range of geographic identifiers to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRange {
    pub begin: i64,
    pub end: i64,
}

impl RegionRange {
    #[must_use]
    pub const fn new(begin: i64, end: i64) -> Self {
        Self { begin, end }
    }

    #[must_use]
    pub fn contains(&self, geoid: i64) -> bool {
        self.begin <= geoid && geoid < self.end
    }
}

impl Default for RegionRange {
    /// California county FIPS codes
    fn default() -> Self {
        Self::new(6000, 7000)
    }
}

/// Object store destination and the identity expected in the credential record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    pub username: String,
    pub region: String,
    pub bucket: String,
    pub credential_bucket: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            username: "rstudio".to_string(),
            region: "us-east-2".to_string(),
            bucket: "jhumodelaggregates".to_string(),
            credential_bucket: "ca-covid-credentials".to_string(),
        }
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolConfig {
    /// Upper bound on threads for any pool; `None` uses the CPU count
    pub max_threads: Option<usize>,
}

impl PoolConfig {
    fn available(&self) -> usize {
        self.max_threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Threads for reading files: half of the available parallelism, rounded up
    #[must_use]
    pub fn loader_threads(&self) -> usize {
        self.available().div_ceil(2)
    }

    /// Threads for aggregating scenarios
    #[must_use]
    pub fn aggregator_threads(&self, scenarios: usize) -> usize {
        self.available().min(scenarios).max(1)
    }
}

/// Configuration for a rollup run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory that scenario paths are relative to
    pub input_dir: PathBuf,
    /// Base output directory; CSVs land in `<output_dir>/data`
    pub output_dir: PathBuf,
    /// Scenarios in the order they should be processed
    pub scenarios: Vec<ScenarioConfig>,
    /// Only files whose names start with this prefix are simulation output
    pub file_prefix: String,
    /// Geographic identifiers to keep
    pub region: RegionRange,
    /// Also produce per-geography `.county.csv` tables
    pub include_counties: bool,
    /// Skip loading and republish CSVs already in the data directory
    pub start_from_csvs: bool,
    /// Where and as whom to publish
    pub publish: PublishConfig,
    /// Worker pool sizing
    pub pools: PoolConfig,
    /// Date used for the dated output directory and object store namespace
    pub run_date: NaiveDate,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            scenarios: default_scenarios(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            region: RegionRange::default(),
            include_counties: false,
            start_from_csvs: false,
            publish: PublishConfig::default(),
            pools: PoolConfig::default(),
            run_date: chrono::Local::now().date_naive(),
        }
    }
}

/// Scenario table of the California deployment
#[must_use]
pub fn default_scenarios() -> Vec<ScenarioConfig> {
    vec![
        ScenarioConfig::new(
            "No Intervention",
            "nonpi-hospitalization/model_output/unifiedNPI/",
        ),
        ScenarioConfig::new(
            "Statewide KC 1918",
            "kclong-hospitalization/model_output/mid-west-coast-AZ-NV_SocialDistancingLong/",
        ),
        ScenarioConfig::new(
            "Statewide Lockdown 8 weeks",
            "wuhan-hospitalization/model_output/unifiedWuhan/",
        ),
        ScenarioConfig::new(
            "UK-Fixed-8w-FolMild",
            "hospitalization/model_output/mid-west-coast-AZ-NV_UKFixed_Mild",
        ),
        ScenarioConfig::new(
            "UK-Fatigue-8w-FolMild",
            "hospitalization/model_output/mid-west-coast-AZ-NV_UKFatigue_Mild",
        ),
        ScenarioConfig::new(
            "UK-Fixed-8w-FolPulse",
            "hospitalization/model_output/mid-west-coast-AZ-NV_UKFixed_Pulse",
        ),
        ScenarioConfig::new(
            "UK-Fatigue-8w-FolPulse",
            "hospitalization/model_output/mid-west-coast-AZ-NV_UKFatigue_Pulse",
        ),
    ]
}

/// Partial configuration read from a JSON file. Absent fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverlay {
    pub scenarios: Option<Vec<ScenarioConfig>>,
    pub file_prefix: Option<String>,
    pub region: Option<RegionRange>,
    pub publish: Option<PublishConfig>,
}

impl ConfigOverlay {
    /// Read an overlay from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RollupError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl PipelineConfig {
    /// Config with the default scenario table rooted at the given directories
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Apply an overlay, then check the result
    pub fn with_overlay(mut self, overlay: ConfigOverlay) -> Result<Self> {
        if let Some(scenarios) = overlay.scenarios {
            self.scenarios = scenarios;
        }
        if let Some(prefix) = overlay.file_prefix {
            self.file_prefix = prefix;
        }
        if let Some(region) = overlay.region {
            self.region = region;
        }
        if let Some(publish) = overlay.publish {
            self.publish = publish;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject configurations that cannot produce meaningful output
    pub fn validate(&self) -> Result<()> {
        if self.region.begin >= self.region.end {
            return Err(RollupError::Config(format!(
                "empty region range [{}, {})",
                self.region.begin, self.region.end
            )));
        }
        if self.file_prefix.is_empty() {
            return Err(RollupError::Config("file prefix must not be empty".into()));
        }
        let mut stems = std::collections::HashSet::new();
        for scenario in &self.scenarios {
            if !stems.insert(scenario.file_stem()) {
                return Err(RollupError::Config(format!(
                    "scenario '{}' collides with another scenario's output file name",
                    scenario.name
                )));
            }
        }
        Ok(())
    }

    /// Directory the CSV outputs are written to
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.output_dir.join("data")
    }

    /// Directory reserved for rendered graphs
    #[must_use]
    pub fn graphs_dir(&self) -> PathBuf {
        self.output_dir.join("graphs")
    }

    /// Run date as `YYYYMMDD`
    #[must_use]
    pub fn date_slug(&self) -> String {
        self.run_date.format("%Y%m%d").to_string()
    }

    /// Names of all configured scenarios
    #[must_use]
    pub fn scenario_names(&self) -> Vec<String> {
        self.scenarios.iter().map(|s| s.name.clone()).collect()
    }
}
