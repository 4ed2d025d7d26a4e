//! Row-wise column extraction.
//!
//! Harmonization stages read whole columns into plain vectors, work on
//! records, and rebuild columns afterwards. These helpers do the reading with
//! the same coercions as [`crate::anyvalue`].

use polars::prelude::{DataFrame, PolarsResult};

use crate::anyvalue::{any_to_f64, any_to_i64, any_to_string_non_empty};

/// Returns true when the frame has a column with exactly this name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Read a column as trimmed strings; null and blank cells become `None`.
pub fn column_strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_string_non_empty(column.get(idx)?));
    }
    Ok(values)
}

/// Read a column as integers; unparseable cells become `None`.
pub fn column_i64s(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let column = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_i64(column.get(idx)?));
    }
    Ok(values)
}

/// Read a column as floats; unparseable cells become `None`.
pub fn column_f64s(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_f64(column.get(idx)?));
    }
    Ok(values)
}
