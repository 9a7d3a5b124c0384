//! Writing summary tables as CSV files into the run's data directory.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::csv::WriterBuilder;
use arrow_schema::{DataType, Field, Schema};
use chrono::NaiveTime;

use crate::aggregate::{Granularity, ScenarioSummary, SummaryTable};
use crate::config::scenario_file_stem;
use crate::error::{Result, RollupError};
use crate::schema::adapt::format_timestamp;
use crate::schema::{GEOID_COLUMN, TIME_COLUMN};
use crate::utils::{log_file_finished, log_file_started};

/// Suffix distinguishing the per-geography table from the statewide one
pub const COUNTY_SUFFIX: &str = ".county";

impl SummaryTable {
    /// Convert to an Arrow batch in output column order.
    ///
    /// The time column is rendered as text: plain dates when every timestamp is
    /// at midnight, full date-times otherwise.
    ///
    /// # Errors
    /// Returns an error if the columns cannot form a batch
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let dates_only = self.rows.iter().all(|r| r.time.time() == NaiveTime::MIN);
        let times = self.rows.iter().map(|r| {
            if dates_only {
                format_timestamp(&r.time)
            } else {
                r.time.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        });

        let mut fields = vec![Field::new(TIME_COLUMN, DataType::Utf8, false)];
        let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from_iter_values(times))];

        if self.granularity == Granularity::County {
            fields.push(Field::new(GEOID_COLUMN, DataType::Int64, true));
            columns.push(Arc::new(Int64Array::from_iter(
                self.rows.iter().map(|r| r.geoid),
            )));
        }

        for (idx, name) in self.columns.iter().enumerate() {
            fields.push(Field::new(name, DataType::Float64, false));
            columns.push(Arc::new(Float64Array::from_iter_values(
                self.rows.iter().map(|r| r.values[idx]),
            )));
        }

        Ok(RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            columns,
        )?)
    }
}

/// Write a record batch as CSV with a header row
///
/// # Errors
/// Returns an error if the file cannot be created or written
pub fn write_batch_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| RollupError::io(path, e))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    Ok(())
}

/// Write one summary table to `path`
///
/// # Errors
/// Returns an error if the table cannot be converted or the file written
pub fn write_summary_csv(table: &SummaryTable, path: &Path) -> Result<()> {
    log_file_started("Writing summary", path);
    let batch = table.to_record_batch()?;
    write_batch_csv(&batch, path)?;
    log_file_finished("wrote", path, batch.num_rows(), None);
    Ok(())
}

/// Output path of a scenario's statewide table
#[must_use]
pub fn statewide_path(data_dir: &Path, scenario: &str) -> PathBuf {
    data_dir.join(format!("{}.csv", scenario_file_stem(scenario)))
}

/// Output path of a scenario's county table
#[must_use]
pub fn county_path(data_dir: &Path, scenario: &str) -> PathBuf {
    data_dir.join(format!("{}{COUNTY_SUFFIX}.csv", scenario_file_stem(scenario)))
}

/// Write a scenario's tables into `data_dir`
///
/// # Returns
/// The written files, statewide first
///
/// # Errors
/// Returns an error if any file cannot be written
pub fn write_scenario_outputs(summary: &ScenarioSummary, data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::with_capacity(2);

    let path = statewide_path(data_dir, &summary.scenario);
    write_summary_csv(&summary.statewide, &path)?;
    log::info!(
        "Writing statewide file for scenario '{}' ({} rows) to {}",
        summary.scenario,
        summary.statewide.num_rows(),
        path.display()
    );
    files.push(path);

    if let Some(county) = &summary.county {
        let path = county_path(data_dir, &summary.scenario);
        write_summary_csv(county, &path)?;
        log::info!(
            "Writing county file for scenario '{}' ({} rows) to {}",
            summary.scenario,
            county.num_rows(),
            path.display()
        );
        files.push(path);
    }

    Ok(files)
}
