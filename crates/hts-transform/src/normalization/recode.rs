//! Codebook recoding of categorical fields.

use anyhow::Result;
use polars::prelude::{DataFrame, NamedFrom, Series};
use serde::Serialize;
use hts_codebook::{CodeValue, Codebook};
use hts_common::column_strings;
use hts_model::{HarmonizeError, RecodePolicy};

/// Per-column recoding counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecodeSummary {
    /// Rows translated through a codebook entry.
    pub mapped: usize,
    /// Rows whose codebook entry says "missing".
    pub mapped_missing: usize,
    /// Unmapped rows given the policy's default literal.
    pub defaulted: usize,
    /// Unmapped rows kept as they were.
    pub passed_through: usize,
    /// Rows that were null or blank to begin with.
    pub nulls: usize,
}

impl RecodeSummary {
    pub fn rows(&self) -> usize {
        self.mapped + self.mapped_missing + self.defaulted + self.passed_through + self.nulls
    }
}

enum Outcome {
    Mapped(Option<String>),
    Defaulted(String),
    PassedThrough(String),
    Null,
}

fn resolve(
    field: &str,
    raw: &str,
    codebook: &Codebook,
    policy: &RecodePolicy,
) -> Result<Outcome, HarmonizeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Outcome::Null);
    }
    match codebook.lookup(trimmed) {
        Some(CodeValue::Category(value)) => Ok(Outcome::Mapped(Some(value.clone()))),
        Some(CodeValue::Missing) => Ok(Outcome::Mapped(None)),
        Some(bounds @ CodeValue::Bounds(..)) => Err(HarmonizeError::configuration(
            field,
            format!("code '{trimmed}' maps to bounds {bounds}, expected a category"),
        )),
        None => match policy {
            RecodePolicy::Strict => Err(HarmonizeError::unmapped(field, trimmed)),
            RecodePolicy::Default(value) => Ok(Outcome::Defaulted(value.clone())),
            RecodePolicy::PassThrough => Ok(Outcome::PassedThrough(trimmed.to_string())),
        },
    }
}

/// Translate one raw value.
///
/// Blank input stays missing without consulting the codebook. A codebook
/// entry of null also yields `None`. Unmapped values follow `policy`; under
/// [`RecodePolicy::Strict`] they are [`HarmonizeError::UnmappedCategory`].
///
/// ```
/// use hts_codebook::Codebook;
/// use hts_model::RecodePolicy;
/// use hts_transform::recode_value;
///
/// let modes = Codebook::from_categories("mode", [("1", "walk"), ("2", "bike")]);
/// assert_eq!(
///     recode_value("mode", "2", &modes, &RecodePolicy::Strict).unwrap(),
///     Some("bike".to_string())
/// );
/// assert!(recode_value("mode", "9", &modes, &RecodePolicy::Strict).is_err());
/// assert_eq!(
///     recode_value("mode", "9", &modes, &RecodePolicy::default_to("unknown")).unwrap(),
///     Some("unknown".to_string())
/// );
/// ```
pub fn recode_value(
    field: &str,
    raw: &str,
    codebook: &Codebook,
    policy: &RecodePolicy,
) -> Result<Option<String>, HarmonizeError> {
    Ok(match resolve(field, raw, codebook, policy)? {
        Outcome::Mapped(value) => value,
        Outcome::Defaulted(value) | Outcome::PassedThrough(value) => Some(value),
        Outcome::Null => None,
    })
}

/// Recode `column` in place into a string column.
pub fn recode_column(
    df: &mut DataFrame,
    column: &str,
    codebook: &Codebook,
    policy: &RecodePolicy,
) -> Result<RecodeSummary> {
    recode_into(df, column, column, codebook, policy)
}

/// Recode `source` and write the result to `target`.
///
/// Used for derived fields, e.g. a `race` column built from a raw race code
/// column that is itself kept. The first unmapped value under a strict policy
/// aborts without touching the frame.
pub fn recode_into(
    df: &mut DataFrame,
    source: &str,
    target: &str,
    codebook: &Codebook,
    policy: &RecodePolicy,
) -> Result<RecodeSummary> {
    let field = codebook.field();
    let raw = column_strings(df, source)?;
    let mut summary = RecodeSummary::default();
    let mut values: Vec<Option<String>> = Vec::with_capacity(raw.len());
    for cell in &raw {
        let outcome = match cell {
            Some(value) => resolve(field, value, codebook, policy)?,
            None => Outcome::Null,
        };
        values.push(match outcome {
            Outcome::Mapped(Some(value)) => {
                summary.mapped += 1;
                Some(value)
            }
            Outcome::Mapped(None) => {
                summary.mapped_missing += 1;
                None
            }
            Outcome::Defaulted(value) => {
                summary.defaulted += 1;
                Some(value)
            }
            Outcome::PassedThrough(value) => {
                summary.passed_through += 1;
                Some(value)
            }
            Outcome::Null => {
                summary.nulls += 1;
                None
            }
        });
    }

    df.with_column(Series::new(target.into(), values))?;
    if summary.defaulted + summary.passed_through > 0 {
        tracing::debug!(
            field,
            column = target,
            defaulted = summary.defaulted,
            passed_through = summary.passed_through,
            "unmapped codes handled by fallback policy"
        );
    }
    Ok(summary)
}

/// Replace null and blank cells of a string column with `literal`.
///
/// Returns the number of cells filled.
pub fn fill_null_literal(df: &mut DataFrame, column: &str, literal: &str) -> Result<usize> {
    let values = column_strings(df, column)?;
    let filled = values.iter().filter(|value| value.is_none()).count();
    if filled == 0 {
        return Ok(0);
    }
    let values: Vec<String> = values
        .into_iter()
        .map(|value| value.unwrap_or_else(|| literal.to_string()))
        .collect();
    df.with_column(Series::new(column.into(), values))?;
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modes() -> Codebook {
        let mut codebook = Codebook::from_categories("mode", [("1", "walk"), ("2", "car")]);
        codebook.insert("-9", CodeValue::Missing);
        codebook
    }

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("mode".into(), vec![Some(1i64), Some(2), None, Some(-9), Some(7)]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn strict_policy_rejects_first_unmapped_value() {
        let mut df = frame();
        let err = recode_column(&mut df, "mode", &modes(), &RecodePolicy::Strict).unwrap_err();
        assert_eq!(
            err.downcast_ref::<HarmonizeError>(),
            Some(&HarmonizeError::unmapped("mode", "7"))
        );
        // untouched on failure
        assert!(df.column("mode").unwrap().i64().is_ok());
    }

    #[test]
    fn default_policy_counts_each_outcome() {
        let mut df = frame();
        let summary =
            recode_column(&mut df, "mode", &modes(), &RecodePolicy::default_to("other")).unwrap();
        assert_eq!(summary.mapped, 2);
        assert_eq!(summary.mapped_missing, 1);
        assert_eq!(summary.defaulted, 1);
        assert_eq!(summary.nulls, 1);
        assert_eq!(summary.rows(), 5);

        let mode = df.column("mode").unwrap().str().unwrap();
        assert_eq!(mode.get(0), Some("walk"));
        assert_eq!(mode.get(3), None);
        assert_eq!(mode.get(4), Some("other"));
    }

    #[test]
    fn pass_through_keeps_raw_code() {
        assert_eq!(
            recode_value("mode", " 7 ", &modes(), &RecodePolicy::PassThrough).unwrap(),
            Some("7".to_string())
        );
        assert_eq!(
            recode_value("mode", "", &modes(), &RecodePolicy::Strict).unwrap(),
            None
        );
    }

    #[test]
    fn bounds_entry_is_not_a_category() {
        let income = Codebook::from_bounds("income", [("1", (0, 9999))]);
        let err = recode_value("income", "1", &income, &RecodePolicy::Strict).unwrap_err();
        assert!(matches!(err, HarmonizeError::Configuration { .. }));
    }

    #[test]
    fn recode_into_keeps_source_column() {
        let mut df = frame();
        recode_into(&mut df, "mode", "mode_label", &modes(), &RecodePolicy::PassThrough).unwrap();
        assert!(df.column("mode").unwrap().i64().is_ok());
        let labels = df.column("mode_label").unwrap().str().unwrap();
        assert_eq!(labels.get(1), Some("car"));
    }

    #[test]
    fn fill_null_literal_fills_blanks() {
        let mut df = DataFrame::new(vec![
            Series::new("sex".into(), vec![Some("male"), None, Some(" ")]).into(),
        ])
        .unwrap();
        assert_eq!(fill_null_literal(&mut df, "sex", "unknown").unwrap(), 2);
        let sex = df.column("sex").unwrap().str().unwrap();
        assert_eq!(sex.get(2), Some("unknown"));
    }
}
