//! Run configuration for one survey wave.
//!
//! A run is described by a TOML file:
//!
//! ```toml
//! survey = "nts"
//! year = "2017"
//! seed = 42
//! output_dir = "out"
//!
//! [persons]
//! path = "persons.csv"
//! codebook = "persons.yaml"
//!
//! [persons.fields.age]
//! action = "debucket"
//!
//! [trips]
//! path = "trips.csv"
//! codebook = "trips.yaml"
//! stage = "stage"
//! clock = "hhmm"
//!
//! [trips.fields.mode]
//! policy = { default = "other" }
//! ```
//!
//! Relative paths resolve against the directory holding the file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use hts_model::{ChainOptions, IntegrityOptions, RecodePolicy};
use hts_model::columns::HID;
use hts_transform::ClockFormat;
use hts_transform::normalization::debucket::DEFAULT_OPEN_UPPER;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Survey name, used for the output directory and logs.
    pub survey: String,
    /// Survey year; selects year-keyed codebook entries.
    pub year: String,
    /// Seed for de-bucketing; unseeded runs draw from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Output directory (default: `<config dir>/output/<survey>_<year>`).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Schema template checked against the harmonized tables.
    #[serde(default)]
    pub template: Option<PathBuf>,
    #[serde(default)]
    pub households: Option<TableConfig>,
    pub persons: TableConfig,
    pub trips: TripTableConfig,
    #[serde(default)]
    pub chain: ChainOptions,
    #[serde(default)]
    pub integrity: IntegrityOptions,
    /// Household key joining persons to households.
    #[serde(default = "default_household_key")]
    pub household_key: String,
}

fn default_household_key() -> String {
    HID.to_string()
}

/// One raw input table and how its values are harmonized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableConfig {
    pub path: PathBuf,
    /// Codebook file; without one the table's columns are used as they are.
    #[serde(default)]
    pub codebook: Option<PathBuf>,
    /// Field name -> harmonization settings, applied in name order.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripTableConfig {
    #[serde(flatten)]
    pub table: TableConfig,
    /// Column grouping the legs of one trip; legs are merged when set.
    #[serde(default)]
    pub stage: Option<String>,
    /// How `tst` and `tet` are written in the raw extract.
    #[serde(default)]
    pub clock: ClockFormat,
    /// Duration column used to derive `tet` when the survey lacks end times.
    #[serde(default)]
    pub duration: Option<String>,
    /// Day identifier column ranked per person into `day`.
    #[serde(default)]
    pub day_source: Option<String>,
    /// Raw trip plans holding a null in these columns are dropped before
    /// recoding. `["*"]` checks every column.
    #[serde(default)]
    pub drop_flagged: Vec<String>,
}

/// What to do with one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldAction {
    /// Translate codes to canonical categories.
    #[default]
    Recode,
    /// Translate codes to bound pairs and sample a value.
    Debucket,
    /// Sample from textual bracket labels found in the column itself.
    DebucketLabels,
    /// Multiply a numeric column by `scale` (unit conversion).
    Scale,
}

impl fmt::Display for FieldAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recode => write!(f, "recode"),
            Self::Debucket => write!(f, "debucket"),
            Self::DebucketLabels => write!(f, "debucket_labels"),
            Self::Scale => write!(f, "scale"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    #[serde(default)]
    pub action: FieldAction,
    #[serde(default)]
    pub policy: RecodePolicy,
    /// Codebook field to use when it differs from the column name.
    #[serde(default)]
    pub codebook_field: Option<String>,
    /// Column to read from; defaults to the field name.
    #[serde(default)]
    pub source: Option<String>,
    /// Multiplier applied to sampled values (e.g. currency conversion), or
    /// the conversion factor of a `scale` field.
    #[serde(default)]
    pub scale: Option<f64>,
    /// Value written where no bracket applies.
    #[serde(default)]
    pub missing_value: Option<i64>,
    /// Upper bound of open-ended labels such as `"65+"`.
    #[serde(default)]
    pub open_upper: Option<i64>,
    /// Literal written into null cells after recoding.
    #[serde(default)]
    pub fill_null: Option<String>,
}

impl FieldConfig {
    pub fn open_upper(&self) -> i64 {
        self.open_upper.unwrap_or(DEFAULT_OPEN_UPPER)
    }
}

impl RunConfig {
    /// Load a run configuration and resolve its paths.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read run config {}", path.display()))?;
        let mut config = Self::parse(&text)
            .with_context(|| format!("parse run config {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Make every relative path relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        if let Some(households) = self.households.as_mut() {
            households.resolve_paths(base);
        }
        self.persons.resolve_paths(base);
        self.trips.table.resolve_paths(base);
        self.template = self.template.take().map(|path| relative_to(base, path));
        self.output_dir = Some(relative_to(base, self.output_dir()));
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            PathBuf::from("output").join(format!("{}_{}", self.survey, self.year))
        })
    }
}

fn relative_to(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}

impl TableConfig {
    fn resolve_paths(&mut self, base: &Path) {
        self.path = relative_to(base, std::mem::take(&mut self.path));
        self.codebook = self.codebook.take().map(|path| relative_to(base, path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
survey = "nts"
year = "2017"
seed = 7

[persons]
path = "persons.csv"
codebook = "persons.yaml"

[persons.fields.age]
action = "debucket"
scale = 1.0

[trips]
path = "trips.csv"
stage = "stage"
clock = "hhmm"
drop_flagged = ["*"]

[trips.fields.mode]
policy = { default = "other" }
fill_null = "unknown"

[chain]
derive_origins = true

[integrity]
trip_columns = ["mode"]
negative_is_missing = true
"#;

    #[test]
    fn parses_nested_tables() {
        let config = RunConfig::parse(CONFIG).unwrap();
        assert_eq!(config.seed, Some(7));
        assert!(config.households.is_none());
        assert_eq!(config.persons.fields["age"].action, FieldAction::Debucket);
        assert_eq!(config.trips.stage.as_deref(), Some("stage"));
        assert_eq!(config.trips.clock, ClockFormat::Hhmm);
        assert_eq!(
            config.trips.table.fields["mode"].policy,
            RecodePolicy::default_to("other")
        );
        assert!(config.chain.derive_origins);
        assert_eq!(config.chain.wrap_tolerance, 0);
        assert_eq!(config.integrity.key, "pid");
        assert_eq!(config.integrity.trip_columns, vec!["mode".to_string()]);
        assert_eq!(config.household_key, "hid");
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let mut config = RunConfig::parse(CONFIG).unwrap();
        config.resolve_paths(Path::new("/data/nts"));
        assert_eq!(config.persons.path, PathBuf::from("/data/nts/persons.csv"));
        assert_eq!(
            config.persons.codebook,
            Some(PathBuf::from("/data/nts/persons.yaml"))
        );
        assert_eq!(config.trips.table.path, PathBuf::from("/data/nts/trips.csv"));
        assert_eq!(
            config.output_dir(),
            PathBuf::from("/data/nts/output/nts_2017")
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = CONFIG.replace("seed = 7", "seed = 7\nsede = 8");
        assert!(RunConfig::parse(&text).is_err());
    }
}
