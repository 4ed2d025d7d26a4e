//! Unit conversion of numeric fields.

use anyhow::Result;
use polars::prelude::{DataFrame, NamedFrom, Series};
use serde::Serialize;
use hts_common::column_f64s;

/// Per-column scaling counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScaleSummary {
    pub scaled: usize,
    /// Null, blank or non-numeric cells, left null.
    pub missing: usize,
}

/// Multiply every value of `column` by `factor`, in place, as floats.
///
/// Used for unit changes such as miles to kilometres. Cells that are null or
/// do not parse as a number come out null.
pub fn scale_column(df: &mut DataFrame, column: &str, factor: f64) -> Result<ScaleSummary> {
    let mut summary = ScaleSummary::default();
    let values: Vec<Option<f64>> = column_f64s(df, column)?
        .into_iter()
        .map(|value| {
            match value {
                Some(_) => summary.scaled += 1,
                None => summary.missing += 1,
            }
            value.map(|v| v * factor)
        })
        .collect();
    df.with_column(Series::new(column.into(), values))?;
    Ok(summary)
}
