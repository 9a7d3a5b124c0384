//! Scenario loading: discover each scenario's simulation files, read and
//! region-filter them in parallel, and concatenate them per scenario.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::array::{Array, RecordBatch};
use rayon::prelude::*;

use crate::config::{PipelineConfig, ScenarioConfig};
use crate::dataset::CombinedDataset;
use crate::error::{Result, RollupError};
use crate::filter::{Expr, apply_filter, region_filter};
use crate::reader::read_simulation_file;
use crate::schema::{GEOID_COLUMN, check_required_columns, normalize_batch, required_columns};
use crate::utils::{create_main_progress_bar, find_prefixed_files, finish_progress_bar, log_skip};

/// Why a scenario contributed no dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The configured input directory is absent
    MissingDirectory(PathBuf),
    /// The directory exists but holds no file with the configured prefix
    NoMatchingFiles { dir: PathBuf, prefix: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDirectory(dir) => {
                write!(f, "input directory {} does not exist", dir.display())
            }
            Self::NoMatchingFiles { dir, prefix } => {
                write!(f, "no files starting with '{prefix}' in {}", dir.display())
            }
        }
    }
}

/// Outcome of loading one scenario
#[derive(Debug)]
pub enum ScenarioLoad {
    Loaded(CombinedDataset),
    Skipped(SkipReason),
    Failed(RollupError),
}

/// Per-scenario outcomes of a load, in configuration order
#[derive(Debug, Default)]
pub struct LoadReport {
    outcomes: Vec<(String, ScenarioLoad)>,
}

impl LoadReport {
    #[must_use]
    pub fn outcomes(&self) -> &[(String, ScenarioLoad)] {
        &self.outcomes
    }

    /// Datasets of the scenarios that loaded
    pub fn datasets(&self) -> impl Iterator<Item = &CombinedDataset> {
        self.outcomes.iter().filter_map(|(_, outcome)| match outcome {
            ScenarioLoad::Loaded(dataset) => Some(dataset),
            _ => None,
        })
    }

    /// Names and reasons of skipped scenarios
    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            ScenarioLoad::Skipped(reason) => Some((name.as_str(), reason)),
            _ => None,
        })
    }

    /// Names and errors of failed scenarios
    pub fn failures(&self) -> impl Iterator<Item = (&str, &RollupError)> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            ScenarioLoad::Failed(err) => Some((name.as_str(), err)),
            _ => None,
        })
    }

    /// Look up one scenario's dataset
    #[must_use]
    pub fn dataset(&self, scenario: &str) -> Option<&CombinedDataset> {
        self.datasets().find(|d| d.scenario() == scenario)
    }

    /// Consume the report, keeping only loaded datasets
    ///
    /// # Errors
    /// Returns `ScenarioFailures` naming every scenario that failed to load
    pub fn into_datasets(self) -> Result<Vec<CombinedDataset>> {
        let failed: Vec<String> = self.failures().map(|(name, _)| name.to_string()).collect();
        if !failed.is_empty() {
            return Err(RollupError::ScenarioFailures(failed));
        }
        Ok(self
            .outcomes
            .into_iter()
            .filter_map(|(_, outcome)| match outcome {
                ScenarioLoad::Loaded(dataset) => Some(dataset),
                _ => None,
            })
            .collect())
    }
}

/// Read one simulation file, normalise it and keep only rows in the region
///
/// # Arguments
/// * `path` - Path to the simulation output file
/// * `filter` - Row filter to apply after normalisation
///
/// # Returns
/// The matching rows in the canonical schema; empty batches are dropped
///
/// # Errors
/// Returns an error if the file cannot be read, lacks a required column, or
/// holds values that cannot be interpreted
pub fn load_scenario_file(path: &Path, filter: &Expr) -> Result<Vec<RecordBatch>> {
    let source = path.display().to_string();
    let table = read_simulation_file(path)?;
    check_required_columns(&table.schema, &required_columns(), &source)?;

    let mut kept = Vec::with_capacity(table.batches.len());
    let mut unparsed_geoids = 0;
    for batch in &table.batches {
        let normalized = normalize_batch(batch, &source)?;
        if let Some(geoid) = normalized.column_by_name(GEOID_COLUMN) {
            unparsed_geoids += geoid.null_count();
        }
        let filtered = apply_filter(&normalized, filter)?;
        if filtered.num_rows() > 0 {
            kept.push(filtered);
        }
    }

    if unparsed_geoids > 0 {
        log::debug!("{unparsed_geoids} row(s) in {source} have a non-integer {GEOID_COLUMN} and were dropped");
    }
    log::debug!(
        "Kept {} of {} rows from {source}",
        kept.iter().map(RecordBatch::num_rows).sum::<usize>(),
        table.num_rows()
    );
    Ok(kept)
}

/// Loads every configured scenario using a fixed-size worker pool
pub struct ScenarioLoader<'a> {
    config: &'a PipelineConfig,
    filter: Expr,
    pool: rayon::ThreadPool,
}

/// A scenario with its discovered files
struct ScenarioFiles<'a> {
    scenario: &'a ScenarioConfig,
    files: Vec<PathBuf>,
}

impl<'a> ScenarioLoader<'a> {
    /// Create a loader whose pool uses half of the available parallelism
    ///
    /// # Errors
    /// Returns an error if the worker pool cannot be built
    pub fn new(config: &'a PipelineConfig) -> Result<Self> {
        let threads = config.pools.loader_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("loader-{i}"))
            .build()?;
        log::debug!("Loader pool started with {threads} thread(s)");
        Ok(Self {
            config,
            filter: region_filter(&config.region),
            pool,
        })
    }

    /// Load all scenarios
    ///
    /// Files of all scenarios are read concurrently. Missing or empty scenario
    /// directories are skipped and logged; a file that fails marks its scenario
    /// as failed without affecting the others.
    pub fn load_all(&self) -> LoadReport {
        let start = Instant::now();
        log::info!(
            "Reading model output for {} scenario(s) from {}",
            self.config.scenarios.len(),
            self.config.input_dir.display()
        );

        let mut outcomes: Vec<(String, Option<ScenarioLoad>)> = Vec::new();
        let mut staged: Vec<(usize, ScenarioFiles<'_>)> = Vec::new();
        for scenario in &self.config.scenarios {
            let slot = outcomes.len();
            match self.discover(scenario) {
                Ok(files) => {
                    outcomes.push((scenario.name.clone(), None));
                    staged.push((slot, ScenarioFiles { scenario, files }));
                }
                Err(outcome) => outcomes.push((scenario.name.clone(), Some(outcome))),
            }
        }

        let tasks: Vec<(usize, &Path)> = staged
            .iter()
            .enumerate()
            .flat_map(|(i, s)| s.1.files.iter().map(move |f| (i, f.as_path())))
            .collect();

        let pb = create_main_progress_bar(tasks.len() as u64, Some("reading scenario files"));
        let filter = &self.filter;
        let results: Vec<(usize, Result<Vec<RecordBatch>>)> = self.pool.install(|| {
            tasks
                .par_iter()
                .map(|&(i, path)| {
                    let result = load_scenario_file(path, filter);
                    if let Err(e) = &result {
                        log::error!("Failed to load {}: {e}", path.display());
                    }
                    pb.inc(1);
                    (i, result)
                })
                .collect()
        });
        finish_progress_bar(&pb, Some("done"));

        let mut per_scenario: Vec<Result<Vec<RecordBatch>>> =
            staged.iter().map(|_| Ok(Vec::new())).collect();
        for (i, result) in results {
            match result {
                Ok(mut more) => {
                    if let Ok(batches) = &mut per_scenario[i] {
                        batches.append(&mut more);
                    }
                }
                // The first failing file decides the scenario's error
                Err(e) => {
                    if per_scenario[i].is_ok() {
                        per_scenario[i] = Err(e);
                    }
                }
            }
        }

        for ((slot, files), batches) in staged.into_iter().zip(per_scenario) {
            let name = &files.scenario.name;
            let outcome = batches
                .and_then(|b| CombinedDataset::from_batches(name.clone(), &b, files.files.len()));
            outcomes[slot].1 = Some(match outcome {
                Ok(dataset) => {
                    log::info!(
                        "Loaded scenario '{name}': {} row(s) from {} file(s)",
                        dataset.num_rows(),
                        dataset.source_files()
                    );
                    ScenarioLoad::Loaded(dataset)
                }
                Err(e) => {
                    log::error!("Scenario '{name}' failed to load: {e}");
                    ScenarioLoad::Failed(e)
                }
            });
        }

        log::info!("Read model output in {:?}", start.elapsed());
        LoadReport {
            outcomes: outcomes
                .into_iter()
                .filter_map(|(name, outcome)| outcome.map(|o| (name, o)))
                .collect(),
        }
    }

    /// Find a scenario's files, or the outcome that replaces loading it
    fn discover(&self, scenario: &ScenarioConfig) -> std::result::Result<Vec<PathBuf>, ScenarioLoad> {
        let dir = self.config.input_dir.join(&scenario.path);
        if !dir.is_dir() {
            let reason = SkipReason::MissingDirectory(dir);
            log_skip(&scenario.name, &reason);
            return Err(ScenarioLoad::Skipped(reason));
        }

        let files = find_prefixed_files(&dir, &self.config.file_prefix).map_err(|e| {
            log::error!("Cannot list files for scenario '{}': {e}", scenario.name);
            ScenarioLoad::Failed(e)
        })?;

        if files.is_empty() {
            let reason = SkipReason::NoMatchingFiles {
                dir,
                prefix: self.config.file_prefix.clone(),
            };
            log_skip(&scenario.name, &reason);
            return Err(ScenarioLoad::Skipped(reason));
        }

        log::debug!(
            "Scenario '{}': {} file(s) in {}",
            scenario.name,
            files.len(),
            dir.display()
        );
        Ok(files)
    }
}

/// Load every configured scenario with a freshly built pool
///
/// # Errors
/// Returns an error if the worker pool cannot be built
pub fn load_scenarios(config: &PipelineConfig) -> Result<LoadReport> {
    Ok(ScenarioLoader::new(config)?.load_all())
}
