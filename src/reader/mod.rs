//! Module for reading simulation output files into Arrow record batches.
//!
//! CSV files are read with every column as text and normalised afterwards, so a
//! column that happens to look numeric in one file and textual in another cannot
//! produce batches with diverging schemas. Parquet files keep their physical types
//! until normalisation.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::record_batch::RecordBatch;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{Result, RollupError};
use crate::utils::{batch_size, log_file_finished, log_file_started};

/// Supported on-disk formats of simulation output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Parquet,
}

impl InputFormat {
    /// Detect the format from a file extension; anything not `.parquet` is CSV
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Self::Parquet,
            _ => Self::Csv,
        }
    }
}

/// Batches read from one file together with the file's own schema.
///
/// The schema is kept separately so that a file without data rows can still be
/// checked for its columns.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl RawTable {
    #[must_use]
    pub fn num_rows(&self) -> usize {
        rows(&self.batches)
    }
}

/// Read a simulation output file in whichever format its extension indicates
///
/// # Errors
/// Returns an error if the file cannot be opened or is not valid for its format
pub fn read_simulation_file(path: &Path) -> Result<RawTable> {
    match InputFormat::from_path(path) {
        InputFormat::Csv => read_csv_as_text(path),
        InputFormat::Parquet => read_parquet(path),
    }
}

/// Read a delimited file with a header row, every column typed as nullable text
///
/// # Arguments
/// * `path` - Path to the CSV file
///
/// # Returns
/// The file's text schema and its batches; no batches if the file has only a header
///
/// # Errors
/// Returns an error if the file cannot be opened or the CSV is malformed
pub fn read_csv_as_text(path: &Path) -> Result<RawTable> {
    let start = std::time::Instant::now();
    log_file_started("Reading csv file", path);

    let format = Format::default().with_header(true);
    let header_file = File::open(path).map_err(|e| RollupError::io(path, e))?;
    // Only the header names are used; types are forced to text below.
    let (inferred, _) = format.infer_schema(header_file, Some(1))?;
    let schema: SchemaRef = Arc::new(Schema::new(
        inferred
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    let file = File::open(path).map_err(|e| RollupError::io(path, e))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(batch_size())
        .build(file)?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    log_file_finished("read", path, rows(&batches), Some(start.elapsed()));
    Ok(RawTable { schema, batches })
}

/// Read a parquet file into Arrow record batches
///
/// # Errors
/// Returns an error if the file cannot be opened or if the Parquet file is invalid
pub fn read_parquet(path: &Path) -> Result<RawTable> {
    let start = std::time::Instant::now();
    log_file_started("Reading parquet file", path);

    let file = File::open(path).map_err(|e| RollupError::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.with_batch_size(batch_size()).build()?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    log_file_finished("read", path, rows(&batches), Some(start.elapsed()));
    Ok(RawTable { schema, batches })
}

fn rows(batches: &[RecordBatch]) -> usize {
    batches.iter().map(RecordBatch::num_rows).sum()
}
