//! Column selection and renaming for raw survey extracts.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use polars::prelude::DataFrame;
use hts_model::{CaseInsensitiveSet, HarmonizeError};

/// Keep only the mapped raw columns and rename them to canonical names.
///
/// Raw names are matched case-insensitively since survey waves disagree on
/// spelling. Columns keep their order in the source frame. A mapped raw
/// column absent from the frame is [`HarmonizeError::MissingColumn`]; two raw
/// columns mapped onto one canonical name is a configuration error.
pub fn apply_column_mappings(
    df: &DataFrame,
    table: &str,
    mappings: &BTreeMap<String, String>,
) -> Result<DataFrame> {
    let lookup = CaseInsensitiveSet::new(df.get_column_names_owned());
    let mut targets = BTreeSet::new();
    let mut renames: BTreeMap<String, String> = BTreeMap::new();
    for (raw, canonical) in mappings {
        let Some(actual) = lookup.get(raw) else {
            return Err(HarmonizeError::missing_column(table, raw.as_str()).into());
        };
        if !targets.insert(canonical.as_str()) {
            return Err(HarmonizeError::configuration(
                canonical.as_str(),
                format!("several {table} columns map onto '{canonical}'"),
            )
            .into());
        }
        renames.insert(actual.to_string(), canonical.clone());
    }

    // built in one pass so swapped names never collide midway
    let mut columns = Vec::with_capacity(renames.len());
    for name in df.get_column_names() {
        if let Some(canonical) = renames.get(name.as_str()) {
            columns.push(df.column(name.as_str())?.clone().with_name(canonical.as_str().into()));
        }
    }
    Ok(DataFrame::new(columns)?)
}

/// Fail with [`HarmonizeError::MissingColumn`] unless every column exists.
pub fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<()> {
    for column in columns {
        if df.column(column).is_err() {
            return Err(HarmonizeError::missing_column(table, *column).into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{NamedFrom, Series};

    fn raw_persons() -> DataFrame {
        DataFrame::new(vec![
            Series::new("HOUSEID".into(), vec![1i64, 1, 2]).into(),
            Series::new("personid".into(), vec![1i64, 2, 1]).into(),
            Series::new("R_AGE".into(), vec![34i64, 36, 71]).into(),
            Series::new("UNUSED".into(), vec!["a", "b", "c"]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn selects_and_renames_case_insensitively() {
        let mappings: BTreeMap<String, String> = [
            ("HOUSEID", "hid"),
            ("PERSONID", "pid"),
            ("R_AGE", "age"),
        ]
        .into_iter()
        .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
        .collect();

        let out = apply_column_mappings(&raw_persons(), "persons", &mappings).unwrap();

        let names: Vec<String> = out
            .get_column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec!["hid", "pid", "age"]);
    }

    #[test]
    fn swapped_names_exchange_columns() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), vec![1i64, 2]).into(),
            Series::new("b".into(), vec!["x", "y"]).into(),
        ])
        .unwrap();
        let mappings = BTreeMap::from([
            ("a".to_string(), "b".to_string()),
            ("b".to_string(), "a".to_string()),
        ]);

        let out = apply_column_mappings(&df, "trips", &mappings).unwrap();

        let b = out.column("b").unwrap().i64().unwrap();
        assert_eq!(b.get(1), Some(2));
        let a = out.column("a").unwrap().str().unwrap();
        assert_eq!(a.get(0), Some("x"));
        assert_eq!(out.get_column_names()[0].as_str(), "b");
    }

    #[test]
    fn missing_raw_column_is_reported() {
        let mappings = BTreeMap::from([("SEX".to_string(), "sex".to_string())]);
        let err = apply_column_mappings(&raw_persons(), "persons", &mappings).unwrap_err();
        let err = err.downcast_ref::<HarmonizeError>().unwrap();
        assert_eq!(err, &HarmonizeError::missing_column("persons", "SEX"));
    }

    #[test]
    fn require_columns_names_the_table() {
        let err = require_columns(&raw_persons(), "persons", &["HOUSEID", "pid"]).unwrap_err();
        assert!(err.to_string().contains("persons"));
    }
}
