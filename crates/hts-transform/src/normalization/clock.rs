//! Clock time conversion to minutes after midnight.

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use polars::prelude::{DataFrame, NamedFrom, Series};
use serde::{Deserialize, Serialize};
use hts_common::{column_i64s, column_strings, parse_f64, parse_i64};

/// How a survey spells trip clock times.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockFormat {
    /// Already minutes after midnight.
    #[default]
    Minutes,
    /// `HHMM` integers, e.g. `1730`.
    Hhmm,
    /// Whole or fractional hours, e.g. `17` or `17.5`.
    Hours,
    /// A `chrono` format string, e.g. `"%Y-%m-%d %H:%M:%S"` or `"%H:%M"`.
    DateTime(String),
}

/// Convert an `HHMM` clock integer to minutes after midnight.
///
/// ```
/// use hts_transform::normalization::clock::hhmm_to_minutes;
///
/// assert_eq!(hhmm_to_minutes(0), 0);
/// assert_eq!(hhmm_to_minutes(830), 510);
/// assert_eq!(hhmm_to_minutes(2359), 1439);
/// ```
pub fn hhmm_to_minutes(value: i64) -> i64 {
    (value / 100) * 60 + value % 100
}

/// Parse one raw clock value.
pub fn parse_clock(raw: &str, format: &ClockFormat) -> Option<i64> {
    let raw = raw.trim();
    match format {
        ClockFormat::Minutes => parse_i64(raw),
        ClockFormat::Hhmm => parse_i64(raw).map(hhmm_to_minutes),
        ClockFormat::Hours => parse_f64(raw)
            .filter(|hours| hours.is_finite())
            .map(|hours| (hours * 60.0).trunc() as i64),
        ClockFormat::DateTime(pattern) => NaiveDateTime::parse_from_str(raw, pattern)
            .map(|dt| dt.time())
            .or_else(|_| NaiveTime::parse_from_str(raw, pattern))
            .ok()
            .map(|time| i64::from(time.hour()) * 60 + i64::from(time.minute())),
    }
}

/// Rewrite `column` as integer minutes after midnight.
///
/// Returns the number of cells converted; unparseable cells become null.
pub fn to_clock_minutes(df: &mut DataFrame, column: &str, format: &ClockFormat) -> Result<usize> {
    let values: Vec<Option<i64>> = column_strings(df, column)?
        .iter()
        .map(|cell| cell.as_deref().and_then(|raw| parse_clock(raw, format)))
        .collect();
    let converted = values.iter().filter(|value| value.is_some()).count();
    let unparsed = df.height() - converted;
    if unparsed > 0 {
        tracing::debug!(column, unparsed, "clock values left missing");
    }
    df.with_column(Series::new(column.into(), values))?;
    Ok(converted)
}

/// Write `end = start + duration` for surveys that report durations.
pub fn derive_end_from_duration(
    df: &mut DataFrame,
    start: &str,
    duration: &str,
    end: &str,
) -> Result<usize> {
    let starts = column_i64s(df, start)?;
    let durations = column_i64s(df, duration)?;
    let ends: Vec<Option<i64>> = starts
        .iter()
        .zip(&durations)
        .map(|(tst, minutes)| Some((*tst)? + (*minutes)?))
        .collect();
    let derived = ends.iter().filter(|value| value.is_some()).count();
    df.with_column(Series::new(end.into(), ends))?;
    Ok(derived)
}

/// Derive a coarse per-person `day` as the dense rank of `day_source`.
///
/// The first distinct day identifier of each person is day 1. Identifiers
/// are ordered numerically when every value parses as a number, as text
/// otherwise.
pub fn rank_days(df: &mut DataFrame, person: &str, day_source: &str, target: &str) -> Result<()> {
    let persons = column_strings(df, person)?;
    let days = column_strings(df, day_source)?;
    let numeric = days.iter().flatten().all(|day| parse_f64(day).is_some());

    let mut per_person: HashMap<&str, BTreeSet<DayKey>> = HashMap::new();
    for (pid, day) in persons.iter().zip(&days) {
        if let (Some(pid), Some(day)) = (pid, day) {
            per_person
                .entry(pid.as_str())
                .or_default()
                .insert(DayKey::new(day, numeric));
        }
    }

    let ranks: Vec<Option<i64>> = persons
        .iter()
        .zip(&days)
        .map(|(pid, day)| {
            let set = per_person.get(pid.as_deref()?)?;
            let key = DayKey::new(day.as_deref()?, numeric);
            let position = set.iter().position(|candidate| *candidate == key)?;
            Some(position as i64 + 1)
        })
        .collect();
    df.with_column(Series::new(target.into(), ranks))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum DayKey {
    Number(i64),
    Text(String),
}

impl DayKey {
    fn new(raw: &str, numeric: bool) -> Self {
        if numeric {
            // milli-units: "1.5" and "1.50" are one day
            let value = parse_f64(raw).map_or(0, |v| (v * 1_000.0).round() as i64);
            Self::Number(value)
        } else {
            Self::Text(raw.to_string())
        }
    }
}
