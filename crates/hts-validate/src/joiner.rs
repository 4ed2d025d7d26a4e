//! Joins with key-coverage and column-collision diagnostics.
//!
//! An inner join silently drops unmatched rows and a name clash silently
//! gets a suffix. Both are measured and logged before the join runs; the join
//! itself goes ahead with whatever semantics the caller asked for.

use std::collections::BTreeSet;
use std::fmt;

use anyhow::Result;
use polars::prelude::{
    DataFrame, IntoLazy, JoinArgs, JoinType, MaintainOrderJoin, NamedFrom, Series, col,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use hts_common::column_strings;
use hts_model::{DEFAULT_SAMPLE_SIZE, HarmonizeError, JoinReport, KeyCoverage, format_sample};

/// Join semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinHow {
    #[default]
    Inner,
    Left,
    /// Left rows with no match on the right.
    Anti,
}

impl fmt::Display for JoinHow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "inner"),
            Self::Left => write!(f, "left"),
            Self::Anti => write!(f, "anti"),
        }
    }
}

impl From<JoinHow> for JoinType {
    fn from(how: JoinHow) -> Self {
        match how {
            JoinHow::Inner => JoinType::Inner,
            JoinHow::Left => JoinType::Left,
            JoinHow::Anti => JoinType::Anti,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinOptions {
    pub how: JoinHow,
    /// Keep left-table row order in the output.
    pub maintain_order: bool,
}

impl JoinOptions {
    pub fn inner() -> Self {
        Self::default()
    }

    pub fn left() -> Self {
        Self {
            how: JoinHow::Left,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ordered(mut self) -> Self {
        self.maintain_order = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub frame: DataFrame,
    pub report: JoinReport,
}

/// Distinct keys present on one side only.
///
/// Keys are compared in their string form, so an integer key on one side and
/// a float or string key on the other still meet. Gaps are logged as
/// warnings with a sample of the missing keys.
pub fn check_overlap(left: &DataFrame, right: &DataFrame, on: &str) -> Result<KeyCoverage> {
    let left_keys = key_set(left, on, "left")?;
    let right_keys = key_set(right, on, "right")?;
    let coverage = KeyCoverage {
        key: on.to_string(),
        left_keys: left_keys.len(),
        right_keys: right_keys.len(),
        missing_in_left: right_keys.difference(&left_keys).cloned().collect(),
        missing_in_right: left_keys.difference(&right_keys).cloned().collect(),
    };
    if !coverage.missing_in_left.is_empty() {
        warn!(
            key = on,
            missing = coverage.missing_in_left.len(),
            percent = %format!("{:.2}", coverage.percent_missing_in_left()),
            keys = %format_sample(&coverage.missing_in_left, DEFAULT_SAMPLE_SIZE),
            "keys missing in left table"
        );
    }
    if !coverage.missing_in_right.is_empty() {
        warn!(
            key = on,
            missing = coverage.missing_in_right.len(),
            percent = %format!("{:.2}", coverage.percent_missing_in_right()),
            keys = %format_sample(&coverage.missing_in_right, DEFAULT_SAMPLE_SIZE),
            "keys missing in right table"
        );
    }
    Ok(coverage)
}

/// Non-key column names present in both tables.
pub fn column_collisions(left: &DataFrame, right: &DataFrame, on: &str) -> BTreeSet<String> {
    let left_names: BTreeSet<String> = left
        .get_column_names()
        .into_iter()
        .map(ToString::to_string)
        .collect();
    let collisions: BTreeSet<String> = right
        .get_column_names()
        .into_iter()
        .map(ToString::to_string)
        .filter(|name| name != on && left_names.contains(name))
        .collect();
    if !collisions.is_empty() {
        warn!(
            columns = %format_sample(&collisions, DEFAULT_SAMPLE_SIZE),
            "duplicate columns other than the join key"
        );
    }
    collisions
}

/// Join `left` and `right` on `on` after reporting coverage and collisions.
///
/// When the key columns differ in type both are rewritten to their string
/// form first, matching how [`check_overlap`] compares them.
pub fn join_tables(
    left: &DataFrame,
    right: &DataFrame,
    on: &str,
    options: JoinOptions,
) -> Result<JoinOutcome> {
    let coverage = check_overlap(left, right, on)?;
    let collisions = column_collisions(left, right, on);

    let (left_frame, right_frame) = if left.column(on)?.dtype() == right.column(on)?.dtype() {
        (left.clone(), right.clone())
    } else {
        (string_key(left, on)?, string_key(right, on)?)
    };

    let mut args = JoinArgs::new(options.how.into());
    if options.maintain_order {
        args.maintain_order = MaintainOrderJoin::Left;
    }
    let frame = left_frame
        .lazy()
        .join(right_frame.lazy(), [col(on)], [col(on)], args)
        .collect()?;

    let report = JoinReport {
        how: options.how.to_string(),
        coverage,
        collisions,
        left_rows: left.height(),
        right_rows: right.height(),
        output_rows: frame.height(),
    };
    info!(
        key = on,
        how = %options.how,
        left_rows = report.left_rows,
        right_rows = report.right_rows,
        output_rows = report.output_rows,
        "joined tables"
    );
    Ok(JoinOutcome { frame, report })
}

fn key_set(df: &DataFrame, on: &str, side: &str) -> Result<BTreeSet<String>> {
    if df.column(on).is_err() {
        return Err(HarmonizeError::missing_column(side, on).into());
    }
    Ok(column_strings(df, on)?.into_iter().flatten().collect())
}

fn string_key(df: &DataFrame, on: &str) -> Result<DataFrame> {
    let mut out = df.clone();
    out.with_column(Series::new(on.into(), column_strings(df, on)?))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_how_maps_to_polars() {
        assert_eq!(JoinType::from(JoinHow::Inner), JoinType::Inner);
        assert_eq!(JoinType::from(JoinHow::Anti), JoinType::Anti);
        assert_eq!(JoinHow::Left.to_string(), "left");
    }

    #[test]
    fn options_builders() {
        let options = JoinOptions::left().ordered();
        assert_eq!(options.how, JoinHow::Left);
        assert!(options.maintain_order);
        assert!(!JoinOptions::inner().maintain_order);
    }
}
