//! Column layout of simulation output and of the published summaries.

use std::sync::{Arc, LazyLock};

use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};

use crate::error::{Result, RollupError};

pub mod adapt;

pub use adapt::{normalize_batch, parse_timestamp};

/// Geographic identifier column
pub const GEOID_COLUMN: &str = "geoid";
/// Simulation run identifier column
pub const SIM_NUM_COLUMN: &str = "sim_num";
/// Timestamp column
pub const TIME_COLUMN: &str = "time";

/// The six metrics carried from simulation output into the summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackedMetric {
    HospitalOccupancy,
    HospitalAdmissions,
    IcuOccupancy,
    IcuAdmissions,
    NewInfections,
    NewDeaths,
}

impl TrackedMetric {
    /// All metrics, in output column order
    pub const ALL: [Self; 6] = [
        Self::HospitalOccupancy,
        Self::HospitalAdmissions,
        Self::IcuOccupancy,
        Self::IcuAdmissions,
        Self::NewInfections,
        Self::NewDeaths,
    ];

    /// Column name in simulation output
    #[must_use]
    pub const fn source_column(self) -> &'static str {
        match self {
            Self::HospitalOccupancy => "hosp_curr",
            Self::HospitalAdmissions => "incidH",
            Self::IcuOccupancy => "icu_curr",
            Self::IcuAdmissions => "incidICU",
            Self::NewInfections => "incidI",
            Self::NewDeaths => "incidD",
        }
    }

    /// Name used in published column headers
    #[must_use]
    pub const fn published_name(self) -> &'static str {
        match self {
            Self::HospitalOccupancy => "hosp_occup",
            Self::HospitalAdmissions => "hosp_admit",
            Self::IcuOccupancy => "icu_occup",
            Self::IcuAdmissions => "icu_admit",
            Self::NewInfections => "new_infect",
            Self::NewDeaths => "new_deaths",
        }
    }

    /// Position of this metric in [`Self::ALL`]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Summary statistics computed across simulation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Mean,
    Median,
    Q25,
    Q75,
}

impl Statistic {
    /// All statistics, in output column order
    pub const ALL: [Self; 4] = [Self::Mean, Self::Median, Self::Q25, Self::Q75];

    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Mean => "_mean",
            Self::Median => "_median",
            Self::Q25 => "_q25",
            Self::Q75 => "_q75",
        }
    }
}

/// Published header for one metric statistic, e.g. `new_infect_q25`
#[must_use]
pub fn summary_column_name(metric: TrackedMetric, stat: Statistic) -> String {
    format!("{}{}", metric.published_name(), stat.suffix())
}

/// All 24 statistic headers in metric-then-statistic order
#[must_use]
pub fn summary_column_names() -> Vec<String> {
    TrackedMetric::ALL
        .iter()
        .flat_map(|&m| Statistic::ALL.iter().map(move |&s| summary_column_name(m, s)))
        .collect()
}

/// Columns every simulation output file must provide
#[must_use]
pub fn required_columns() -> Vec<&'static str> {
    let mut columns = vec![GEOID_COLUMN, SIM_NUM_COLUMN, TIME_COLUMN];
    columns.extend(TrackedMetric::ALL.iter().map(|m| m.source_column()));
    columns
}

static CANONICAL_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    let mut fields = vec![
        Field::new(GEOID_COLUMN, DataType::Int64, true),
        Field::new(SIM_NUM_COLUMN, DataType::Int64, false),
        Field::new(
            TIME_COLUMN,
            DataType::Timestamp(TimeUnit::Second, None),
            false,
        ),
    ];
    fields.extend(
        TrackedMetric::ALL
            .iter()
            .map(|m| Field::new(m.source_column(), DataType::Float64, true)),
    );
    Arc::new(Schema::new(fields))
});

/// Schema every loaded batch is normalised into before concatenation
#[must_use]
pub fn canonical_schema() -> SchemaRef {
    CANONICAL_SCHEMA.clone()
}

/// Check that all `required` columns are present in `schema`
///
/// # Arguments
/// * `schema` - Schema of the data source
/// * `required` - Column names that must be present
/// * `source` - Description of the data source, used in the error
///
/// # Errors
/// Returns `MissingColumn` for the first absent column
pub fn check_required_columns(
    schema: &Schema,
    required: &[&str],
    source: impl std::fmt::Display,
) -> Result<()> {
    for column in required {
        if schema.index_of(column).is_err() {
            return Err(RollupError::missing_column(*column, source));
        }
    }
    Ok(())
}
