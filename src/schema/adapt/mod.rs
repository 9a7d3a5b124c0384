//! Adaptation of raw simulation batches into the canonical schema.
//!
//! Source files differ in how their columns are typed (text from CSV, assorted
//! numeric and temporal types from Parquet). Every batch is cast into
//! [`canonical_schema`](super::canonical_schema) so that batches from different
//! files of one scenario can always be concatenated.

pub mod date_utils;

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, RecordBatch, StringArray, TimestampSecondArray};
use arrow::compute::cast;
use arrow_schema::{DataType, TimeUnit};

use crate::error::{Result, RollupError};

pub use date_utils::{format_timestamp, from_epoch_seconds, parse_timestamp};

use super::{
    GEOID_COLUMN, SIM_NUM_COLUMN, TIME_COLUMN, TrackedMetric, canonical_schema,
    check_required_columns, required_columns,
};

/// Cast a raw batch into the canonical schema, dropping any extra columns
///
/// # Arguments
/// * `batch` - Batch as read from a source file
/// * `source` - Description of the source (file path), used in errors
///
/// # Returns
/// A batch with exactly the canonical columns
///
/// # Errors
/// * `MissingColumn` if a required column is absent
/// * `InvalidData` if a timestamp or simulation run id cannot be interpreted
///
/// Geographic identifiers and metric values that cannot be parsed become null.
pub fn normalize_batch(batch: &RecordBatch, source: &str) -> Result<RecordBatch> {
    let schema = batch.schema();
    check_required_columns(&schema, &required_columns(), source)?;

    let column = |name: &str| -> Result<&ArrayRef> {
        let idx = schema
            .index_of(name)
            .map_err(|_| RollupError::missing_column(name, source))?;
        Ok(batch.column(idx))
    };

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(3 + TrackedMetric::ALL.len());
    columns.push(cast(column(GEOID_COLUMN)?, &DataType::Int64)?);

    let sim_num = cast(column(SIM_NUM_COLUMN)?, &DataType::Int64)?;
    if sim_num.null_count() > 0 {
        return Err(RollupError::invalid_data(
            source,
            format!(
                "{} row(s) have a missing or non-integer {SIM_NUM_COLUMN}",
                sim_num.null_count()
            ),
        ));
    }
    columns.push(sim_num);

    columns.push(adapt_time_column(column(TIME_COLUMN)?, source)?);

    for metric in TrackedMetric::ALL {
        columns.push(cast(column(metric.source_column())?, &DataType::Float64)?);
    }

    Ok(RecordBatch::try_new(canonical_schema(), columns)?)
}

/// Convert a time column of any supported type to `Timestamp(Second)`
fn adapt_time_column(array: &ArrayRef, source: &str) -> Result<ArrayRef> {
    let target = DataType::Timestamp(TimeUnit::Second, None);
    let adapted: ArrayRef = match array.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let strings = cast(array, &DataType::Utf8)?;
            let strings = strings
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| RollupError::invalid_data(source, "time column is not text"))?;
            let mut values = Vec::with_capacity(strings.len());
            for i in 0..strings.len() {
                if strings.is_null(i) {
                    values.push(None);
                    continue;
                }
                let raw = strings.value(i);
                let ts = parse_timestamp(raw).ok_or_else(|| {
                    RollupError::invalid_data(source, format!("unparseable {TIME_COLUMN} '{raw}'"))
                })?;
                values.push(Some(ts.and_utc().timestamp()));
            }
            Arc::new(TimestampSecondArray::from(values))
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => cast(array, &target)?,
        other => {
            return Err(RollupError::invalid_data(
                source,
                format!("unsupported {TIME_COLUMN} column type {other}"),
            ));
        }
    };

    if adapted.null_count() > 0 {
        return Err(RollupError::invalid_data(
            source,
            format!("{} row(s) have no {TIME_COLUMN}", adapted.null_count()),
        ));
    }
    Ok(adapted)
}
