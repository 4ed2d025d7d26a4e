//! Person-plan integrity filter.
//!
//! A person-plan is every trip of one person. Plans are accepted or rejected
//! whole: one computed set of excluded keys is removed from the trips table
//! and from the attributes table alike, so the two never disagree on which
//! persons exist.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::Result;
use polars::prelude::{BooleanChunked, DataFrame, NewChunkedArray};
use tracing::{info, warn};
use hts_common::{column_i64s, column_strings, has_column, parse_f64};
use hts_model::columns::SEQ;
use hts_model::{
    DEFAULT_SAMPLE_SIZE, ExclusionReason, HarmonizeError, IntegrityOptions, IntegrityReport,
};

/// Filtered tables and what was removed from them.
#[derive(Debug, Clone)]
pub struct IntegrityOutcome {
    pub trips: DataFrame,
    pub attributes: DataFrame,
    pub report: IntegrityReport,
}

/// Drop every person-plan that violates a temporal or completeness rule.
///
/// A plan is excluded when any of its trips
///
/// - ends before it starts (`tst > tet`),
/// - starts before the previous trip in sequence ended,
/// - has a missing value in one of `trip_columns`,
///
/// or when the person's attribute row has a missing value in one of
/// `attribute_columns`. With `negative_is_missing`, negative numbers in the
/// checked columns count as missing.
pub fn filter_plans(
    trips: &DataFrame,
    attributes: &DataFrame,
    options: &IntegrityOptions,
) -> Result<IntegrityOutcome> {
    require(trips, "trips", &options.key)?;
    require(trips, "trips", &options.start)?;
    require(trips, "trips", &options.end)?;
    require(attributes, "attributes", &options.key)?;
    for column in &options.trip_columns {
        require(trips, "trips", column)?;
    }
    for column in &options.attribute_columns {
        require(attributes, "attributes", column)?;
    }

    let trip_keys = key_strings(trips, &options.key)?;
    let starts = column_i64s(trips, &options.start)?;
    let ends = column_i64s(trips, &options.end)?;
    let seqs = if has_column(trips, SEQ) {
        Some(column_i64s(trips, SEQ)?)
    } else {
        None
    };

    let mut flagged: BTreeMap<String, BTreeSet<ExclusionReason>> = BTreeMap::new();
    let mut flag = |key: &str, reason: ExclusionReason| {
        flagged.entry(key.to_string()).or_default().insert(reason);
    };

    let mut plans: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, key) in trip_keys.iter().enumerate() {
        plans.entry(key.as_str()).or_default().push(row);
    }
    if let Some(seqs) = &seqs {
        for rows in plans.values_mut() {
            rows.sort_by_key(|&row| seqs[row]);
        }
    }
    for (key, rows) in &plans {
        if rows
            .iter()
            .any(|&row| matches!((starts[row], ends[row]), (Some(tst), Some(tet)) if tst > tet))
        {
            flag(*key, ExclusionReason::NegativeDuration);
        }
        if has_overlap(rows, &starts, &ends) {
            flag(*key, ExclusionReason::Overlap);
        }
    }

    for row in missing_rows(trips, &options.trip_columns, options.negative_is_missing)? {
        flag(trip_keys[row].as_str(), ExclusionReason::MissingTripValue);
    }
    let attribute_keys = key_strings(attributes, &options.key)?;
    for row in missing_rows(attributes, &options.attribute_columns, options.negative_is_missing)? {
        flag(attribute_keys[row].as_str(), ExclusionReason::MissingAttributeValue);
    }

    let excluded: BTreeSet<String> = flagged.keys().cloned().collect();
    let trips_out = retain_keys(trips, &trip_keys, &excluded)?;
    let attributes_out = retain_keys(attributes, &attribute_keys, &excluded)?;

    let mut plans_by_reason: BTreeMap<ExclusionReason, usize> = BTreeMap::new();
    for reasons in flagged.values() {
        for reason in reasons {
            *plans_by_reason.entry(*reason).or_default() += 1;
        }
    }
    let report = IntegrityReport {
        checked_plans: plans.len(),
        removed_trips: trips.height() - trips_out.height(),
        removed_plans: excluded.len(),
        removed_attribute_rows: attributes.height() - attributes_out.height(),
        plans_by_reason,
        excluded_keys: excluded,
    };

    if report.is_clean() {
        info!(plans = report.checked_plans, "all person-plans passed integrity checks");
    } else {
        for (reason, count) in &report.plans_by_reason {
            warn!(%reason, plans = count, "person-plans excluded");
        }
        warn!(
            removed_plans = report.removed_plans,
            removed_trips = report.removed_trips,
            removed_attribute_rows = report.removed_attribute_rows,
            keys = %report.sample(DEFAULT_SAMPLE_SIZE),
            "integrity filter removed records"
        );
    }

    Ok(IntegrityOutcome {
        trips: trips_out,
        attributes: attributes_out,
        report,
    })
}

/// Drop every plan with a null (or negative sentinel) value in `columns`.
///
/// Applied to raw trip extracts before recoding, where any refused or
/// unknown answer in a plan makes the whole plan unusable. An empty `columns`
/// checks every column. Returns the filtered frame and the dropped keys.
pub fn drop_flagged_plans(
    df: &DataFrame,
    key: &str,
    columns: &[String],
    negative_is_missing: bool,
) -> Result<(DataFrame, BTreeSet<String>)> {
    require(df, "trips", key)?;
    let columns: Vec<String> = if columns.is_empty() {
        df.get_column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    } else {
        columns.to_vec()
    };
    for column in &columns {
        require(df, "trips", column)?;
    }
    let keys = key_strings(df, key)?;
    let dropped: BTreeSet<String> = missing_rows(df, &columns, negative_is_missing)?
        .into_iter()
        .map(|row| keys[row].clone())
        .collect();
    let out = retain_keys(df, &keys, &dropped)?;
    if !dropped.is_empty() {
        info!(
            plans = dropped.len(),
            rows = df.height() - out.height(),
            "dropped plans with flagged values"
        );
    }
    Ok((out, dropped))
}

fn require(df: &DataFrame, table: &str, column: &str) -> Result<()> {
    if df.column(column).is_err() {
        return Err(HarmonizeError::missing_column(table, column).into());
    }
    Ok(())
}

/// Key column as strings; a null key is the empty string.
fn key_strings(df: &DataFrame, key: &str) -> Result<Vec<String>> {
    Ok(column_strings(df, key)?
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

/// A trip starting before the previous trip of the plan ended.
///
/// `rows` are in sequence order; untimed trips are skipped.
fn has_overlap(rows: &[usize], starts: &[Option<i64>], ends: &[Option<i64>]) -> bool {
    let timed: Vec<(i64, i64)> = rows
        .iter()
        .filter_map(|&row| Some((starts[row]?, ends[row]?)))
        .collect();
    timed.windows(2).any(|pair| pair[1].0 < pair[0].1)
}

fn missing_rows(df: &DataFrame, columns: &[String], negative_is_missing: bool) -> Result<Vec<usize>> {
    let mut flagged = vec![false; df.height()];
    for column in columns {
        for (row, value) in column_strings(df, column)?.iter().enumerate() {
            let missing = match value {
                None => true,
                Some(raw) => negative_is_missing && parse_f64(raw).is_some_and(|v| v < 0.0),
            };
            flagged[row] |= missing;
        }
    }
    Ok(flagged
        .iter()
        .enumerate()
        .filter_map(|(row, missing)| missing.then_some(row))
        .collect())
}

fn retain_keys(df: &DataFrame, keys: &[String], excluded: &BTreeSet<String>) -> Result<DataFrame> {
    if excluded.is_empty() {
        return Ok(df.clone());
    }
    let mask: Vec<bool> = keys.iter().map(|key| !excluded.contains(key)).collect();
    let mask = BooleanChunked::from_slice("keep".into(), &mask);
    Ok(df.filter(&mask)?)
}
