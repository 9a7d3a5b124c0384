//! In-memory scenario data: the concatenated, region-filtered simulation rows.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, Float64Array, Int64Array, RecordBatch, TimestampSecondArray,
};
use arrow::compute::concat_batches;
use arrow::datatypes::{Float64Type, Int64Type, TimestampSecondType};
use chrono::NaiveDateTime;

use crate::error::{Result, RollupError};
use crate::schema::{
    GEOID_COLUMN, SIM_NUM_COLUMN, TIME_COLUMN, TrackedMetric, canonical_schema,
};

/// One row of simulation output
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRecord {
    pub geoid: i64,
    pub sim_num: i64,
    pub time: NaiveDateTime,
    /// Metric values in [`TrackedMetric::ALL`] order
    pub metrics: [Option<f64>; 6],
}

impl SimulationRecord {
    /// Record with every metric set to `value`
    #[must_use]
    pub fn uniform(geoid: i64, sim_num: i64, time: NaiveDateTime, value: f64) -> Self {
        Self {
            geoid,
            sim_num,
            time,
            metrics: [Some(value); 6],
        }
    }

    #[must_use]
    pub fn metric(&self, metric: TrackedMetric) -> Option<f64> {
        self.metrics[metric.index()]
    }

    #[must_use]
    pub fn with_metric(mut self, metric: TrackedMetric, value: Option<f64>) -> Self {
        self.metrics[metric.index()] = value;
        self
    }
}

/// All rows of one scenario after region filtering, in the canonical schema
#[derive(Debug, Clone)]
pub struct CombinedDataset {
    scenario: String,
    batch: RecordBatch,
    source_files: usize,
}

/// Borrowed, typed views of a dataset's columns
#[derive(Debug, Clone, Copy)]
pub struct DatasetColumns<'a> {
    pub geoid: &'a Int64Array,
    pub sim_num: &'a Int64Array,
    pub time: &'a TimestampSecondArray,
    pub metrics: [&'a Float64Array; 6],
}

impl CombinedDataset {
    /// Concatenate normalised batches from `source_files` files
    ///
    /// # Errors
    /// Returns an error if a batch does not match the canonical schema
    pub fn from_batches(
        scenario: impl Into<String>,
        batches: &[RecordBatch],
        source_files: usize,
    ) -> Result<Self> {
        let schema = canonical_schema();
        let batch = concat_batches(&schema, batches)?;
        Ok(Self {
            scenario: scenario.into(),
            batch,
            source_files,
        })
    }

    /// Build a dataset directly from records
    ///
    /// # Errors
    /// Returns an error if the arrays cannot form a batch
    pub fn from_records(scenario: impl Into<String>, records: &[SimulationRecord]) -> Result<Self> {
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.geoid))),
            Arc::new(Int64Array::from_iter_values(
                records.iter().map(|r| r.sim_num),
            )),
            Arc::new(TimestampSecondArray::from_iter_values(
                records.iter().map(|r| r.time.and_utc().timestamp()),
            )),
        ];
        for metric in TrackedMetric::ALL {
            columns.push(Arc::new(Float64Array::from_iter(
                records.iter().map(|r| r.metric(metric)),
            )));
        }
        let batch = RecordBatch::try_new(canonical_schema(), columns)?;
        Ok(Self {
            scenario: scenario.into(),
            batch,
            source_files: 0,
        })
    }

    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Number of files that contributed to this dataset
    #[must_use]
    pub fn source_files(&self) -> usize {
        self.source_files
    }

    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Typed access to the canonical columns
    ///
    /// # Errors
    /// Returns `MissingColumn` or `InvalidData` if the batch is not in the canonical schema
    pub fn columns(&self) -> Result<DatasetColumns<'_>> {
        let geoid = self.typed_column(GEOID_COLUMN, |a| a.as_primitive_opt::<Int64Type>())?;
        let sim_num = self.typed_column(SIM_NUM_COLUMN, |a| a.as_primitive_opt::<Int64Type>())?;
        let time = self.typed_column(TIME_COLUMN, |a| {
            a.as_primitive_opt::<TimestampSecondType>()
        })?;

        let mut metrics = Vec::with_capacity(TrackedMetric::ALL.len());
        for metric in TrackedMetric::ALL {
            metrics.push(self.typed_column(metric.source_column(), |a| {
                a.as_primitive_opt::<Float64Type>()
            })?);
        }
        let metrics: [&Float64Array; 6] = metrics.try_into().map_err(|_| {
            RollupError::invalid_data(&self.scenario, "unexpected number of metric columns")
        })?;

        Ok(DatasetColumns {
            geoid,
            sim_num,
            time,
            metrics,
        })
    }

    fn typed_column<'a, T: Array>(
        &'a self,
        name: &str,
        downcast: impl Fn(&'a dyn Array) -> Option<&'a T>,
    ) -> Result<&'a T> {
        let column = self
            .batch
            .column_by_name(name)
            .ok_or_else(|| RollupError::missing_column(name, &self.scenario))?;
        downcast(column.as_ref()).ok_or_else(|| {
            RollupError::invalid_data(
                &self.scenario,
                format!("column {name} has type {}", column.data_type()),
            )
        })
    }
}
