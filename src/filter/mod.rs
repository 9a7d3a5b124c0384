//! Row filtering for simulation batches
//!
//! This module provides a small expression-based filtering system for Arrow
//! record batches. The loader uses it to restrict rows to the configured
//! geographic range.

use arrow::array::{Array, ArrayRef, BooleanArray, Datum, Int64Array};
use arrow::compute::filter as arrow_filter;
use arrow::compute::kernels::cmp;
use arrow::record_batch::RecordBatch;

use crate::config::RegionRange;
use crate::error::{Result, RollupError};
use crate::schema::GEOID_COLUMN;

/// Represents a filter expression over batch columns
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column is greater than or equal to a literal value
    GtEq(String, LiteralValue),

    /// Column is less than a literal value
    Lt(String, LiteralValue),

    /// Logical AND of expressions
    And(Vec<Expr>),

    /// Always evaluates to true
    AlwaysTrue,
}

/// Represents a literal value that can be used in filter expressions
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Integer value
    Int(i64),
}

#[derive(Debug, Clone, Copy)]
enum Comparison {
    GtEq,
    Lt,
}

/// Closed-open range test on the geographic identifier: `begin <= geoid < end`
#[must_use]
pub fn region_filter(range: &RegionRange) -> Expr {
    Expr::And(vec![
        Expr::GtEq(GEOID_COLUMN.to_string(), LiteralValue::Int(range.begin)),
        Expr::Lt(GEOID_COLUMN.to_string(), LiteralValue::Int(range.end)),
    ])
}

/// Evaluates a filter expression against a record batch
///
/// # Arguments
/// * `batch` - The record batch to filter
/// * `expr` - The filter expression to apply
///
/// # Returns
/// A boolean array indicating which rows match the filter. Comparisons against
/// null values yield null, which [`filter_record_batch`] treats as false.
///
/// # Errors
/// Returns an error if a referenced column is missing or has an unsupported type
pub fn evaluate_expr(batch: &RecordBatch, expr: &Expr) -> Result<BooleanArray> {
    match expr {
        Expr::AlwaysTrue => Ok(BooleanArray::from(vec![true; batch.num_rows()])),
        Expr::And(exprs) => evaluate_and_expression(batch, exprs),
        Expr::GtEq(col, value) => evaluate_comparison(batch, col, value, Comparison::GtEq),
        Expr::Lt(col, value) => evaluate_comparison(batch, col, value, Comparison::Lt),
    }
}

/// Evaluates a logical AND expression
fn evaluate_and_expression(batch: &RecordBatch, exprs: &[Expr]) -> Result<BooleanArray> {
    let Some((first, rest)) = exprs.split_first() else {
        return Ok(BooleanArray::from(vec![true; batch.num_rows()]));
    };

    let mut result = evaluate_expr(batch, first)?;
    for expr in rest {
        let mask = evaluate_expr(batch, expr)?;
        result = arrow::compute::and(&result, &mask)?;
    }
    Ok(result)
}

/// Evaluates a comparison between an integer column and a literal
fn evaluate_comparison(
    batch: &RecordBatch,
    col_name: &str,
    literal_value: &LiteralValue,
    op: Comparison,
) -> Result<BooleanArray> {
    let column = batch
        .column_by_name(col_name)
        .ok_or_else(|| RollupError::missing_column(col_name, "filter input"))?;
    let LiteralValue::Int(n) = *literal_value;

    let Some(int_array) = column.as_any().downcast_ref::<Int64Array>() else {
        return Err(RollupError::invalid_data(
            "filter input",
            format!(
                "column {col_name} is not an Int64 array ({})",
                column.data_type()
            ),
        ));
    };
    compare(int_array, &Int64Array::new_scalar(n), op)
}

fn compare(array: &dyn Datum, scalar: &dyn Datum, op: Comparison) -> Result<BooleanArray> {
    Ok(match op {
        Comparison::GtEq => cmp::gt_eq(array, scalar)?,
        Comparison::Lt => cmp::lt(array, scalar)?,
    })
}

/// Filters a record batch based on a boolean mask
///
/// # Arguments
/// * `batch` - The record batch to filter
/// * `mask` - The boolean mask indicating which rows to keep
///
/// # Returns
/// A new record batch with only rows where mask is true
///
/// # Errors
/// Returns an error if the mask length differs from the batch or filtering fails
pub fn filter_record_batch(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(RollupError::invalid_data(
            "filter input",
            format!(
                "mask length ({}) doesn't match batch row count ({})",
                mask.len(),
                batch.num_rows()
            ),
        ));
    }

    let filtered_columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|col| arrow_filter(col, mask))
        .collect::<std::result::Result<_, _>>()?;

    Ok(RecordBatch::try_new(batch.schema(), filtered_columns)?)
}

/// Evaluate `expr` on `batch` and keep the matching rows
///
/// # Errors
/// Returns an error if evaluation or filtering fails
pub fn apply_filter(batch: &RecordBatch, expr: &Expr) -> Result<RecordBatch> {
    let mask = evaluate_expr(batch, expr)?;
    filter_record_batch(batch, &mask)
}
