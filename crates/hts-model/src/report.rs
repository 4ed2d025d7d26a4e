//! Diagnostic report values.
//!
//! Integrity violations and key-coverage gaps never abort a run. They are
//! collected here, logged, and written to the diagnostics file so that every
//! excluded record can be audited afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

/// Number of keys shown when a diagnostic lists offending keys.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Render at most `max` values as `[a, b, c] (+N more)`.
pub fn format_sample<I, S>(values: I, max: usize) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let values: Vec<String> = values
        .into_iter()
        .map(|value| value.as_ref().to_string())
        .collect();
    let shown = values
        .iter()
        .take(max)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if values.len() > max {
        format!("[{shown}] (+{} more)", values.len() - max)
    } else {
        format!("[{shown}]")
    }
}

/// Why a person-plan was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// A trip ends before it starts.
    NegativeDuration,
    /// A trip starts before the previous trip has ended.
    Overlap,
    /// A material trip column is null or carries the missing sentinel.
    MissingTripValue,
    /// A material attribute column is null or carries the missing sentinel.
    MissingAttributeValue,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDuration => write!(f, "negative duration"),
            Self::Overlap => write!(f, "overlapping trips"),
            Self::MissingTripValue => write!(f, "missing trip value"),
            Self::MissingAttributeValue => write!(f, "missing attribute value"),
        }
    }
}

/// Outcome counts of the person-plan integrity filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Distinct person keys seen in the trips table.
    pub checked_plans: usize,
    pub removed_trips: usize,
    pub removed_plans: usize,
    pub removed_attribute_rows: usize,
    /// Plans per violation; a plan with several violations counts once per reason.
    pub plans_by_reason: BTreeMap<ExclusionReason, usize>,
    /// The single excluded key set applied to both tables.
    pub excluded_keys: BTreeSet<String>,
}

impl IntegrityReport {
    /// True when nothing was removed.
    pub fn is_clean(&self) -> bool {
        self.excluded_keys.is_empty()
    }

    /// Sampled list of excluded keys for log messages.
    pub fn sample(&self, max: usize) -> String {
        format_sample(&self.excluded_keys, max)
    }
}

/// Key coverage between two tables sharing a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyCoverage {
    pub key: String,
    /// Distinct non-null keys in the left table.
    pub left_keys: usize,
    /// Distinct non-null keys in the right table.
    pub right_keys: usize,
    /// Keys present on the right but absent on the left.
    pub missing_in_left: BTreeSet<String>,
    /// Keys present on the left but absent on the right.
    pub missing_in_right: BTreeSet<String>,
}

impl KeyCoverage {
    /// True when both tables carry exactly the same key set.
    pub fn is_complete(&self) -> bool {
        self.missing_in_left.is_empty() && self.missing_in_right.is_empty()
    }

    /// Share of right-hand keys the left table lacks, in percent.
    pub fn percent_missing_in_left(&self) -> f64 {
        percent(self.missing_in_left.len(), self.right_keys)
    }

    /// Share of left-hand keys the right table lacks, in percent.
    pub fn percent_missing_in_right(&self) -> f64 {
        percent(self.missing_in_right.len(), self.left_keys)
    }

    /// Keys present in exactly one of the two tables.
    pub fn symmetric_difference(&self) -> BTreeSet<&String> {
        self.missing_in_left
            .iter()
            .chain(self.missing_in_right.iter())
            .collect()
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Diagnostics collected for one join.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinReport {
    pub how: String,
    pub coverage: KeyCoverage,
    /// Non-key column names present in both tables.
    pub collisions: BTreeSet<String>,
    pub left_rows: usize,
    pub right_rows: usize,
    pub output_rows: usize,
}

/// Required columns missing from the harmonized output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateCheck {
    pub missing_attribute_columns: BTreeSet<String>,
    pub missing_trip_columns: BTreeSet<String>,
}

impl TemplateCheck {
    pub fn is_complete(&self) -> bool {
        self.missing_attribute_columns.is_empty() && self.missing_trip_columns.is_empty()
    }
}
