//! Aggregation of a scenario's simulation rows into summary tables.
//!
//! For every tracked metric the rows are first summed per simulation run at each
//! timestamp (collapsing geography for the statewide table), then the per-run
//! totals are reduced to mean, median and quartiles. The per-metric tables are
//! finally inner-joined on their group keys into one wide table.

pub mod statistics;

use std::collections::{BTreeMap, BTreeSet};

use arrow::array::Array;
use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;

use crate::dataset::{CombinedDataset, DatasetColumns};
use crate::error::{Result, RollupError};
use crate::schema::adapt::from_epoch_seconds;
use crate::schema::{Statistic, TrackedMetric, summary_column_name};

pub use statistics::{Summary, mean, quantile_sorted};

/// Level of geographic detail in a summary table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// One row per timestamp, summed over all geographic units
    Statewide,
    /// One row per timestamp and geographic unit
    County,
}

/// Key of a summary row: epoch seconds, plus the geographic unit for county tables.
///
/// Ordering is by time first, then geography.
pub type GroupKey = (i64, Option<i64>);

/// Summary of one metric for every group
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub metric: TrackedMetric,
    pub granularity: Granularity,
    pub groups: BTreeMap<GroupKey, Summary>,
}

impl MetricSummary {
    /// Published column names of this metric's four statistics
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        Statistic::ALL
            .iter()
            .map(|&s| summary_column_name(self.metric, s))
            .collect()
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub time: NaiveDateTime,
    /// Geographic unit; only set in county tables
    pub geoid: Option<i64>,
    /// Statistic values in the table's column order
    pub values: Vec<f64>,
}

/// Wide summary table of one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub granularity: Granularity,
    /// Statistic column names, excluding the key columns
    pub columns: Vec<String>,
    /// Rows sorted by time, then geography
    pub rows: Vec<SummaryRow>,
    /// Group keys dropped by the inner merge because some metric had no summary for them
    pub dropped_groups: usize,
}

impl SummaryTable {
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Value of a named statistic column in row `row`
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r.values[idx])
    }

    /// Index of the row for a timestamp (and geography, for county tables)
    #[must_use]
    pub fn find_row(&self, time: NaiveDateTime, geoid: Option<i64>) -> Option<usize> {
        self.rows
            .iter()
            .position(|r| r.time == time && r.geoid == geoid)
    }
}

/// Statewide table and optional county table of one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub statewide: SummaryTable,
    pub county: Option<SummaryTable>,
}

/// Per-run totals of all metrics, keyed by (time, sim_num, geoid)
type RunTotals = FxHashMap<(i64, i64, Option<i64>), [f64; 6]>;

/// Sum metric values within each (time, run[, geography]) group.
///
/// Null and NaN values contribute nothing; a group whose values are all missing
/// sums to 0.
fn run_totals(cols: &DatasetColumns<'_>, granularity: Granularity) -> RunTotals {
    let mut totals = RunTotals::default();
    for i in 0..cols.time.len() {
        let geoid = match granularity {
            Granularity::Statewide => None,
            Granularity::County => cols.geoid.is_valid(i).then(|| cols.geoid.value(i)),
        };
        let key = (cols.time.value(i), cols.sim_num.value(i), geoid);
        let entry = totals.entry(key).or_insert([0.0; 6]);
        for (slot, values) in entry.iter_mut().zip(cols.metrics.iter()) {
            if values.is_valid(i) && !values.value(i).is_nan() {
                *slot += values.value(i);
            }
        }
    }
    totals
}

/// Reduce per-run totals of one metric to summary statistics per group.
///
/// A group whose run totals are all NaN (opposite infinities summed) gets no summary.
fn summarize_totals(
    totals: &RunTotals,
    metric: TrackedMetric,
    granularity: Granularity,
) -> MetricSummary {
    let mut samples: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    for (&(time, _sim, geoid), values) in totals {
        samples
            .entry((time, geoid))
            .or_default()
            .push(values[metric.index()]);
    }

    let groups = samples
        .into_iter()
        .filter_map(|(key, mut values)| Summary::from_values(&mut values).map(|s| (key, s)))
        .collect();

    MetricSummary {
        metric,
        granularity,
        groups,
    }
}

/// Summarise every tracked metric of a dataset at one granularity
///
/// # Errors
/// Returns an error if the dataset is not in the canonical schema
pub fn summarize_metrics(
    dataset: &CombinedDataset,
    granularity: Granularity,
) -> Result<Vec<MetricSummary>> {
    let cols = dataset.columns()?;
    let totals = run_totals(&cols, granularity);
    Ok(TrackedMetric::ALL
        .iter()
        .map(|&metric| summarize_totals(&totals, metric, granularity))
        .collect())
}

/// Inner-join per-metric summaries on their group keys.
///
/// Only keys present in every table survive. Dropped keys are logged as a
/// warning: they mean the metrics disagree on which timestamps they cover.
///
/// # Errors
/// Returns `InvalidData` if no tables are given or their granularities differ
pub fn merge_inner(scenario: &str, tables: &[MetricSummary]) -> Result<SummaryTable> {
    let Some(first) = tables.first() else {
        return Err(RollupError::invalid_data(scenario, "no metric tables to merge"));
    };
    let granularity = first.granularity;
    if tables.iter().any(|t| t.granularity != granularity) {
        return Err(RollupError::invalid_data(
            scenario,
            "cannot merge statewide and county metric tables",
        ));
    }

    let all_keys: BTreeSet<GroupKey> = tables
        .iter()
        .flat_map(|t| t.groups.keys().copied())
        .collect();
    let shared: Vec<GroupKey> = all_keys
        .iter()
        .copied()
        .filter(|key| tables.iter().all(|t| t.groups.contains_key(key)))
        .collect();

    let dropped = all_keys.len() - shared.len();
    if dropped > 0 {
        log::warn!(
            "Scenario '{scenario}': {dropped} group(s) missing from at least one metric were dropped by the merge"
        );
    }

    let columns = tables.iter().flat_map(MetricSummary::column_names).collect();
    let mut rows = Vec::with_capacity(shared.len());
    for key in shared {
        let (secs, geoid) = key;
        let time = from_epoch_seconds(secs).ok_or_else(|| {
            RollupError::invalid_data(scenario, format!("timestamp {secs} out of range"))
        })?;
        let values = tables
            .iter()
            .flat_map(|t| t.groups[&key].values())
            .collect();
        rows.push(SummaryRow {
            time,
            geoid,
            values,
        });
    }

    Ok(SummaryTable {
        granularity,
        columns,
        rows,
        dropped_groups: dropped,
    })
}

/// Aggregate one scenario into its summary table(s)
///
/// # Arguments
/// * `dataset` - The scenario's combined rows
/// * `include_counties` - Also build the per-geography table
///
/// # Errors
/// * `EmptyScenario` if the dataset has no rows
/// * `MissingColumn`/`InvalidData` if the dataset is malformed
pub fn aggregate_scenario(
    dataset: &CombinedDataset,
    include_counties: bool,
) -> Result<ScenarioSummary> {
    let scenario = dataset.scenario();
    if dataset.is_empty() {
        return Err(RollupError::EmptyScenario(scenario.to_string()));
    }

    let statewide = merge_inner(
        scenario,
        &summarize_metrics(dataset, Granularity::Statewide)?,
    )?;
    let county = if include_counties {
        Some(merge_inner(
            scenario,
            &summarize_metrics(dataset, Granularity::County)?,
        )?)
    } else {
        None
    };

    log::debug!(
        "Aggregated scenario '{scenario}': {} statewide row(s){}",
        statewide.num_rows(),
        county
            .as_ref()
            .map(|c| format!(", {} county row(s)", c.num_rows()))
            .unwrap_or_default()
    );

    Ok(ScenarioSummary {
        scenario: scenario.to_string(),
        statewide,
        county,
    })
}
