//! Observed hospital and ICU census, published next to the scenario summaries.
//!
//! The source is the state's per-facility-county daily census CSV. It is reduced
//! to one statewide row per date, with suspected cases folded into the
//! "including suspected" series.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arrow::array::{Array, RecordBatch, StringArray};
use arrow::datatypes::FieldRef;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::{Result, RollupError};
use crate::output::write_batch_csv;
use crate::reader::read_csv_as_text;
use crate::schema::{check_required_columns, parse_timestamp};

/// File name of the written actuals table
pub const ACTUALS_FILE_NAME: &str = "actual_hosp_data.csv";

/// Date column of the source data
pub const DATE_COLUMN: &str = "Most Recent Date";

/// Confirmed hospitalised patients
pub const HOSP_COLUMN: &str = "COVID-19 Positive Patients";
/// Suspected (not confirmed) hospitalised patients
pub const SUSPECTED_HOSP_COLUMN: &str = "Suspected COVID-19 Positive Patients";
/// Confirmed ICU patients
pub const ICU_COLUMN: &str = "ICU COVID-19 Positive Patients";
/// Suspected (not confirmed) ICU patients
pub const SUSPECTED_ICU_COLUMN: &str = "ICU COVID-19 Suspected Patients";

/// Count columns in the order they are accumulated
const COUNT_COLUMNS: [&str; 4] = [
    HOSP_COLUMN,
    SUSPECTED_HOSP_COLUMN,
    ICU_COLUMN,
    SUSPECTED_ICU_COLUMN,
];

/// Statewide observed census for one date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActualsRow {
    pub date: NaiveDate,
    pub actual_hosp: Option<f64>,
    pub actual_icu: Option<f64>,
    /// Confirmed plus suspected hospitalised patients
    pub actual_susp_hosp: Option<f64>,
    /// Confirmed plus suspected ICU patients
    pub actual_susp_icu: Option<f64>,
}

/// Output layout of [`ActualsRow`]
#[derive(Debug, Serialize, Deserialize)]
struct ActualsRecord {
    time: String,
    actual_hosp: Option<f64>,
    actual_icu: Option<f64>,
    actual_susp_hosp: Option<f64>,
    actual_susp_icu: Option<f64>,
}

impl From<&ActualsRow> for ActualsRecord {
    fn from(row: &ActualsRow) -> Self {
        Self {
            time: row.date.format("%Y-%m-%d").to_string(),
            actual_hosp: row.actual_hosp,
            actual_icu: row.actual_icu,
            actual_susp_hosp: row.actual_susp_hosp,
            actual_susp_icu: row.actual_susp_icu,
        }
    }
}

const fn march_2020(day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(2020, 3, day) {
        Some(date) => date,
        None => panic!("invalid March 2020 day"),
    }
}

/// Report dates of the hand-entered rows, evaluated at compile time
const PATCHED_DATES: [NaiveDate; 5] = [
    march_2020(27),
    march_2020(28),
    march_2020(29),
    march_2020(30),
    march_2020(31),
];

/// Days missing from the source feed, entered by hand
#[must_use]
pub fn patched_days() -> Vec<ActualsRow> {
    let hosp = [1034.0, 1253.0, 1432.0, 1675.0, 1855.0];
    let susp_hosp = [
        Some(5027.0),
        Some(4362.0),
        Some(3494.0 + 1432.0),
        Some(3604.0 + 1675.0),
        None,
    ];
    let icu = [Some(410.0), Some(498.0), Some(597.0), Some(629.0), None];
    let susp_icu = [
        Some(410.0 + 587.0),
        Some(498.0 + 657.0),
        Some(597.0 + 602.0),
        Some(629.0 + 604.0),
        None,
    ];

    PATCHED_DATES
        .iter()
        .enumerate()
        .map(|(i, &date)| ActualsRow {
            date,
            actual_hosp: Some(hosp[i]),
            actual_icu: icu[i],
            actual_susp_hosp: susp_hosp[i],
            actual_susp_icu: susp_icu[i],
        })
        .collect()
}

fn parse_report_date(value: &str) -> Option<NaiveDate> {
    parse_timestamp(value)
        .map(|ts| ts.date())
        .or_else(|| NaiveDate::parse_from_str(value.trim(), "%m/%d/%Y").ok())
}

/// Load the observed census and reduce it to statewide daily totals
///
/// Counts that are blank or not numeric contribute nothing to a day's total.
///
/// # Arguments
/// * `path` - Per-county census CSV
///
/// # Returns
/// One row per reported date plus the patched days, sorted by date
///
/// # Errors
/// * `MissingColumn` if a needed column is absent
/// * `InvalidData` if a date cannot be parsed
pub fn load_actuals(path: &Path) -> Result<Vec<ActualsRow>> {
    log::info!("Loading actual hospital data from {}", path.display());
    let source = path.display();
    let table = read_csv_as_text(path)?;

    let mut required = COUNT_COLUMNS.to_vec();
    required.push(DATE_COLUMN);
    check_required_columns(&table.schema, &required, &source)?;

    let mut totals: BTreeMap<NaiveDate, [f64; 4]> = BTreeMap::new();
    for batch in &table.batches {
        let dates = text_column(batch, DATE_COLUMN, &source)?;
        let counts = COUNT_COLUMNS
            .iter()
            .map(|name| text_column(batch, name, &source))
            .collect::<Result<Vec<_>>>()?;

        for i in 0..batch.num_rows() {
            let date = dates
                .is_valid(i)
                .then(|| parse_report_date(dates.value(i)))
                .flatten()
                .ok_or_else(|| {
                    RollupError::invalid_data(
                        &source,
                        format!("unparseable date in row {}", i + 1),
                    )
                })?;
            let entry = totals.entry(date).or_insert([0.0; 4]);
            for (slot, column) in entry.iter_mut().zip(&counts) {
                if column.is_valid(i) {
                    if let Ok(v) = column.value(i).trim().parse::<f64>() {
                        if !v.is_nan() {
                            *slot += v;
                        }
                    }
                }
            }
        }
    }

    let mut rows: Vec<ActualsRow> = totals
        .into_iter()
        .map(|(date, [hosp, just_susp_hosp, icu, just_susp_icu])| ActualsRow {
            date,
            actual_hosp: Some(hosp),
            actual_icu: Some(icu),
            actual_susp_hosp: Some(hosp + just_susp_hosp),
            actual_susp_icu: Some(icu + just_susp_icu),
        })
        .collect();
    rows.extend(patched_days());
    // stable, so a patched day follows a reported row for the same date
    rows.sort_by_key(|r| r.date);

    log::info!("Loaded {} days of actual hospital data", rows.len());
    Ok(rows)
}

fn text_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    source: &impl std::fmt::Display,
) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| RollupError::missing_column(name, source))
}

/// Convert actuals rows to an Arrow batch using `serde_arrow`
///
/// # Errors
/// Returns an error if the rows cannot be serialized
pub fn actuals_to_record_batch(rows: &[ActualsRow]) -> Result<RecordBatch> {
    let records: Vec<ActualsRecord> = rows.iter().map(ActualsRecord::from).collect();
    let fields = Vec::<FieldRef>::from_type::<ActualsRecord>(
        TracingOptions::default().allow_null_fields(true),
    )?;
    Ok(serde_arrow::to_record_batch(&fields, &records)?)
}

/// Write the actuals table into `data_dir`
///
/// # Returns
/// Path of the written file
///
/// # Errors
/// Returns an error if the rows cannot be converted or the file written
pub fn write_actuals(rows: &[ActualsRow], data_dir: &Path) -> Result<PathBuf> {
    let path = data_dir.join(ACTUALS_FILE_NAME);
    let batch = actuals_to_record_batch(rows)?;
    write_batch_csv(&batch, &path)?;
    log::info!(
        "Writing actual hospital data ({} rows) to {}",
        rows.len(),
        path.display()
    );
    Ok(path)
}
