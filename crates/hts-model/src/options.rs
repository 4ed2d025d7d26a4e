//! Configuration options for harmonization stages.

use serde::{Deserialize, Serialize};

use crate::columns::{DISTANCE, DACT, MODE, OACT, PID, TET, TST};

/// What the recoder does with a raw value that has no codebook entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecodePolicy {
    /// Every observed value must be mapped; anything else is fatal.
    #[default]
    Strict,
    /// Unmapped values become this literal (e.g. `"unknown"`).
    Default(String),
    /// Unmapped values are kept as they are.
    PassThrough,
}

impl RecodePolicy {
    /// Fallback policy using the given literal.
    pub fn default_to(value: impl Into<String>) -> Self {
        Self::Default(value.into())
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// Options for per-person chain reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainOptions {
    /// Copy each trip's origin activity/zone from the previous trip's
    /// destination and drop the leading "start from home" record.
    pub derive_origins: bool,

    /// A later trip is only treated as starting on the next day when its start
    /// falls more than this many minutes before the previous trip's end.
    /// Smaller overlaps are left in place for the integrity filter.
    pub wrap_tolerance: i64,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            derive_origins: false,
            wrap_tolerance: 0,
        }
    }
}

impl ChainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_derived_origins(mut self, enable: bool) -> Self {
        self.derive_origins = enable;
        self
    }

    #[must_use]
    pub fn with_wrap_tolerance(mut self, minutes: i64) -> Self {
        self.wrap_tolerance = minutes;
        self
    }
}

/// Options for the person-plan integrity filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityOptions {
    /// Person key shared by the trips and attributes tables.
    pub key: String,
    /// Trip start column (minutes on the continuous timeline).
    pub start: String,
    /// Trip end column.
    pub end: String,
    /// Trip columns that must never be missing.
    pub trip_columns: Vec<String>,
    /// Attribute columns that must never be missing.
    pub attribute_columns: Vec<String>,
    /// Treat negative numbers in the checked columns as the survey's
    /// "missing/refused" sentinel.
    pub negative_is_missing: bool,
}

impl Default for IntegrityOptions {
    fn default() -> Self {
        Self {
            key: PID.to_string(),
            start: TST.to_string(),
            end: TET.to_string(),
            trip_columns: [MODE, OACT, DACT, TST, TET, DISTANCE]
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            attribute_columns: Vec::new(),
            negative_is_missing: false,
        }
    }
}

impl IntegrityOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_trip_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trip_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_attribute_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_negative_is_missing(mut self, enable: bool) -> Self {
        self.negative_is_missing = enable;
        self
    }
}
