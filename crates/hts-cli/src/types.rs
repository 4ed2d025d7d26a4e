use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use hts_model::{IntegrityReport, JoinReport, KeyCoverage, TemplateCheck};

use crate::config::FieldAction;

/// Outcome of one `harmonize` run.
#[derive(Debug, Serialize)]
pub struct RunResult {
    pub survey: String,
    pub year: String,
    pub seed: Option<u64>,
    #[serde(skip)]
    pub output_dir: PathBuf,
    /// False for a dry run.
    #[serde(skip)]
    pub written: bool,
    pub tables: Vec<TableSummary>,
    pub fields: Vec<FieldSummary>,
    /// Raw trip plans dropped for flagged values before recoding.
    pub dropped_raw_plans: BTreeSet<String>,
    pub merged_legs: Option<LegSummary>,
    pub household_join: Option<JoinReport>,
    /// Person keys of the chained trips (left) against the attributes (right),
    /// before the integrity filter.
    pub trip_coverage: KeyCoverage,
    pub integrity: IntegrityReport,
    pub template: Option<TemplateCheck>,
}

impl RunResult {
    pub fn template_complete(&self) -> bool {
        self.template.as_ref().is_none_or(TemplateCheck::is_complete)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub source: PathBuf,
    pub input_rows: usize,
    pub output_rows: usize,
    pub output: Option<PathBuf>,
}

/// Counts for one harmonized field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSummary {
    pub table: String,
    pub field: String,
    pub action: FieldAction,
    /// Rows translated or sampled.
    pub converted: usize,
    /// Rows left missing (null input, missing code, or sentinel).
    pub missing: usize,
    /// Rows handled by the default or pass-through policy.
    pub fallback: usize,
    /// Null cells filled with a literal afterwards.
    pub filled: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LegSummary {
    pub legs: usize,
    pub trips: usize,
}
