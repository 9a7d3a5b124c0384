//! End-to-end run: load scenarios, aggregate and write them, publish the results.

use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;

use crate::actuals::{load_actuals, write_actuals};
use crate::aggregate::aggregate_scenario;
use crate::config::PipelineConfig;
use crate::dataset::CombinedDataset;
use crate::error::{Result, RollupError};
use crate::loader::{LoadReport, SkipReason, load_scenarios};
use crate::output::write_scenario_outputs;
use crate::publish::Publisher;
use crate::utils::{
    RunLayout, create_main_progress_bar, find_csv_files, finish_progress_bar, log_path_warning,
    setup_output_dirs,
};

/// What a run produced
#[derive(Debug, Default)]
pub struct RunReport {
    /// Scenarios that were loaded and aggregated
    pub loaded: Vec<String>,
    /// Scenarios that were skipped, with the reason
    pub skipped: Vec<(String, SkipReason)>,
    /// Files written (or, when republishing, found) in the data directory
    pub written: Vec<PathBuf>,
    /// Object keys uploaded
    pub published: Vec<String>,
}

/// One rollup run over an immutable configuration
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    actuals: Option<PathBuf>,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            actuals: None,
        }
    }

    /// Also publish observed hospital data read from `path`
    #[must_use]
    pub fn with_actuals(mut self, path: impl Into<PathBuf>) -> Self {
        self.actuals = Some(path.into());
        self
    }

    /// Execute the run
    ///
    /// # Arguments
    /// * `publisher` - Connected publisher; obtained before calling so that a
    ///   credential problem stops the run before anything is written
    ///
    /// # Errors
    /// * `ScenarioFailures` if any scenario failed to load or aggregate; nothing is published
    /// * `NoScenarios` if no scenario had input
    /// * any IO or publish error
    pub fn run(&self, publisher: &Publisher) -> Result<RunReport> {
        let start = Instant::now();
        log::info!("Starting model output conversion");
        let layout = setup_output_dirs(self.config)?;

        if self.config.start_from_csvs {
            return self.republish(&layout, publisher);
        }

        let load = load_scenarios(self.config)?;
        let skipped: Vec<(String, SkipReason)> = load
            .skipped()
            .map(|(name, reason)| (name.to_string(), reason.clone()))
            .collect();
        let datasets = self.loaded_datasets(load)?;

        let mut report = RunReport {
            loaded: datasets.iter().map(|d| d.scenario().to_string()).collect(),
            skipped,
            ..RunReport::default()
        };
        report.written = self.write_summaries(&datasets, &layout)?;
        drop(datasets);

        if let Some(path) = &self.actuals {
            let rows = load_actuals(path)?;
            report.written.push(write_actuals(&rows, &layout.data_dir)?);
        }

        report.published = publisher.publish_files(&report.written)?;
        log::info!(
            "Finished: {} scenario(s), {} file(s), {} upload(s) in {:?}",
            report.loaded.len(),
            report.written.len(),
            report.published.len(),
            start.elapsed()
        );
        Ok(report)
    }

    fn loaded_datasets(&self, load: LoadReport) -> Result<Vec<CombinedDataset>> {
        for (name, err) in load.failures() {
            log::error!("Scenario '{name}' could not be loaded: {err}");
        }
        let datasets = load.into_datasets()?;
        if datasets.is_empty() {
            return Err(RollupError::NoScenarios(self.config.scenario_names()));
        }
        Ok(datasets)
    }

    /// Aggregate and write every scenario on a pool sized to the scenario count
    fn write_summaries(
        &self,
        datasets: &[CombinedDataset],
        layout: &RunLayout,
    ) -> Result<Vec<PathBuf>> {
        let names: Vec<&str> = datasets.iter().map(CombinedDataset::scenario).collect();
        log::info!(
            "Writing scenario data to csv for {} scenario(s): {names:?}",
            datasets.len()
        );

        let threads = self.config.pools.aggregator_threads(datasets.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("aggregator-{i}"))
            .build()?;

        let include_counties = self.config.include_counties;
        let data_dir = &layout.data_dir;
        let pb = create_main_progress_bar(datasets.len() as u64, Some("aggregating scenarios"));
        let outcomes: Vec<(&str, Result<Vec<PathBuf>>)> = pool.install(|| {
            datasets
                .par_iter()
                .map(|dataset| {
                    let result = aggregate_scenario(dataset, include_counties)
                        .and_then(|summary| write_scenario_outputs(&summary, data_dir));
                    pb.inc(1);
                    (dataset.scenario(), result)
                })
                .collect()
        });
        finish_progress_bar(&pb, Some("done"));

        let mut files = Vec::new();
        let mut failed = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(written) => {
                    log::info!("File list from {name}: {written:?}");
                    files.extend(written);
                }
                Err(e) => {
                    log::error!("Scenario '{name}' failed to aggregate: {e}");
                    failed.push(name.to_string());
                }
            }
        }

        if failed.is_empty() {
            Ok(files)
        } else {
            Err(RollupError::ScenarioFailures(failed))
        }
    }

    /// Publish CSVs left in the data directory by an earlier run
    fn republish(&self, layout: &RunLayout, publisher: &Publisher) -> Result<RunReport> {
        let files = find_csv_files(&layout.data_dir)?;
        if files.is_empty() {
            log_path_warning("No CSV files to republish in", &layout.data_dir);
        }
        log::info!(
            "Republishing {} existing file(s) from {}",
            files.len(),
            layout.data_dir.display()
        );
        let published = publisher.publish_files(&files)?;
        Ok(RunReport {
            written: files,
            published,
            ..RunReport::default()
        })
    }
}
