//! Cross-survey comparison of harmonized tables.
//!
//! Each harmonized survey is compared to a reference table: column sets,
//! column kinds, categorical value sets and numeric summaries. Differences
//! are findings for a human to read, not failures.

use std::collections::BTreeSet;
use std::fmt;

use anyhow::Result;
use polars::prelude::{DataFrame, DataType};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use hts_common::{column_f64s, column_strings};
use hts_model::format_sample;

/// A named table taking part in a comparison.
#[derive(Debug, Clone)]
pub struct TableRef {
    pub name: String,
    pub frame: DataFrame,
}

impl TableRef {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }
}

/// Coarse column type used for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Other,
}

impl ColumnKind {
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64 => Self::Numeric,
            DataType::String | DataType::Boolean => Self::Categorical,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Categorical => write!(f, "categorical"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Values listed per categorical difference before `(+N more)`.
    pub max_values: usize,
    /// Relative drift above which a numeric statistic is reported.
    pub numeric_rel_tol: f64,
    /// Absolute drift below which a numeric statistic is never reported.
    pub numeric_abs_tol: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            max_values: 10,
            numeric_rel_tol: 0.05,
            numeric_abs_tol: 1e-6,
        }
    }
}

/// One numeric statistic that drifted beyond tolerance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericDrift {
    pub column: String,
    pub statistic: &'static str,
    pub reference: f64,
    pub other: f64,
}

/// Value-set difference of one categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDiff {
    pub column: String,
    pub missing: BTreeSet<String>,
    pub extra: BTreeSet<String>,
}

/// Kind disagreement of one shared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindMismatch {
    pub column: String,
    pub reference: ColumnKind,
    pub other: ColumnKind,
}

/// Everything that differs between one table and the reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableComparison {
    pub name: String,
    pub reference: String,
    pub missing_columns: BTreeSet<String>,
    pub extra_columns: BTreeSet<String>,
    pub kind_mismatches: Vec<KindMismatch>,
    pub category_diffs: Vec<CategoryDiff>,
    pub numeric_drift: Vec<NumericDrift>,
}

impl TableComparison {
    pub fn is_match(&self) -> bool {
        self.missing_columns.is_empty()
            && self.extra_columns.is_empty()
            && self.kind_mismatches.is_empty()
            && self.category_diffs.is_empty()
            && self.numeric_drift.is_empty()
    }

    /// Human-readable lines, one per finding.
    pub fn lines(&self, max_values: usize) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.missing_columns.is_empty() {
            lines.push(format!(
                "missing columns: {}",
                format_sample(&self.missing_columns, max_values)
            ));
        }
        if !self.extra_columns.is_empty() {
            lines.push(format!(
                "extra columns: {}",
                format_sample(&self.extra_columns, max_values)
            ));
        }
        for mismatch in &self.kind_mismatches {
            lines.push(format!(
                "kind mismatch: {} ({} vs {})",
                mismatch.column, mismatch.reference, mismatch.other
            ));
        }
        for diff in &self.category_diffs {
            let mut parts = Vec::new();
            if !diff.missing.is_empty() {
                parts.push(format!("missing={}", format_sample(&diff.missing, max_values)));
            }
            if !diff.extra.is_empty() {
                parts.push(format!("extra={}", format_sample(&diff.extra, max_values)));
            }
            lines.push(format!("categorical diff: {} ({})", diff.column, parts.join(", ")));
        }
        for drift in &self.numeric_drift {
            lines.push(format!(
                "numeric diff: {}.{} ({} vs {})",
                drift.column, drift.statistic, drift.reference, drift.other
            ));
        }
        lines
    }
}

/// Compare every table in `others` to `reference`.
pub fn compare_tables(
    reference: &TableRef,
    others: &[TableRef],
    options: &CompareOptions,
) -> Result<Vec<TableComparison>> {
    let mut comparisons = Vec::with_capacity(others.len());
    for other in others {
        let comparison = compare_pair(reference, other, options)?;
        if comparison.is_match() {
            info!(table = %other.name, reference = %reference.name, "tables match");
        } else {
            for line in comparison.lines(options.max_values) {
                warn!(table = %other.name, reference = %reference.name, "{line}");
            }
        }
        comparisons.push(comparison);
    }
    Ok(comparisons)
}

fn compare_pair(
    reference: &TableRef,
    other: &TableRef,
    options: &CompareOptions,
) -> Result<TableComparison> {
    let names = |df: &DataFrame| -> BTreeSet<String> {
        df.get_column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    };
    let reference_columns = names(&reference.frame);
    let other_columns = names(&other.frame);

    let mut comparison = TableComparison {
        name: other.name.clone(),
        reference: reference.name.clone(),
        missing_columns: reference_columns.difference(&other_columns).cloned().collect(),
        extra_columns: other_columns.difference(&reference_columns).cloned().collect(),
        ..TableComparison::default()
    };

    for column in reference_columns.intersection(&other_columns) {
        let reference_kind = ColumnKind::of(reference.frame.column(column)?.dtype());
        let other_kind = ColumnKind::of(other.frame.column(column)?.dtype());
        if reference_kind != other_kind {
            comparison.kind_mismatches.push(KindMismatch {
                column: column.clone(),
                reference: reference_kind,
                other: other_kind,
            });
            continue;
        }
        match reference_kind {
            ColumnKind::Categorical => {
                let expected = value_set(&reference.frame, column)?;
                let found = value_set(&other.frame, column)?;
                let missing: BTreeSet<String> = expected.difference(&found).cloned().collect();
                let extra: BTreeSet<String> = found.difference(&expected).cloned().collect();
                if !missing.is_empty() || !extra.is_empty() {
                    comparison.category_diffs.push(CategoryDiff {
                        column: column.clone(),
                        missing,
                        extra,
                    });
                }
            }
            ColumnKind::Numeric => {
                if let Some(drift) = numeric_drift(reference, other, column, options)? {
                    comparison.numeric_drift.push(drift);
                }
            }
            ColumnKind::Other => {}
        }
    }
    Ok(comparison)
}

fn value_set(df: &DataFrame, column: &str) -> Result<BTreeSet<String>> {
    Ok(column_strings(df, column)?.into_iter().flatten().collect())
}

/// First of min, max, mean, std that drifted, if any.
fn numeric_drift(
    reference: &TableRef,
    other: &TableRef,
    column: &str,
    options: &CompareOptions,
) -> Result<Option<NumericDrift>> {
    let (Some(expected), Some(found)) = (
        Summary::of(&column_f64s(&reference.frame, column)?),
        Summary::of(&column_f64s(&other.frame, column)?),
    ) else {
        return Ok(None);
    };
    let pairs = [
        ("min", expected.min, found.min),
        ("max", expected.max, found.max),
        ("mean", expected.mean, found.mean),
        ("std", expected.std, found.std),
    ];
    for (statistic, a, b) in pairs {
        let (Some(a), Some(b)) = (a, b) else {
            continue;
        };
        let diff = (a - b).abs();
        let rel = diff / a.abs().max(b.abs()).max(options.numeric_abs_tol);
        if diff > options.numeric_abs_tol && rel > options.numeric_rel_tol {
            return Ok(Some(NumericDrift {
                column: column.to_string(),
                statistic,
                reference: a,
                other: b,
            }));
        }
    }
    Ok(None)
}

struct Summary {
    min: Option<f64>,
    max: Option<f64>,
    mean: Option<f64>,
    /// Sample standard deviation; undefined for a single value.
    std: Option<f64>,
}

impl Summary {
    fn of(values: &[Option<f64>]) -> Option<Self> {
        let values: Vec<f64> = values.iter().flatten().copied().collect();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.len() > 1).then(|| {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        });
        Some(Self {
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
            mean: Some(mean),
            std,
        })
    }
}
