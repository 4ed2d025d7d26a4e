//! Joins, key coverage and cross-survey comparison.

use polars::prelude::{DataFrame, NamedFrom, Series};
use hts_model::HarmonizeError;
use hts_validate::{
    ColumnKind, CompareOptions, JoinHow, JoinOptions, TableRef, check_overlap, column_collisions,
    compare_tables, join_tables,
};

fn persons() -> DataFrame {
    DataFrame::new(vec![
        Series::new("hid".into(), vec![3i64, 1, 2, 1]).into(),
        Series::new("pid".into(), vec!["3-1", "1-1", "2-1", "1-2"]).into(),
        Series::new("weight".into(), vec![1.0f64, 1.5, 0.5, 1.5]).into(),
    ])
    .unwrap()
}

fn households() -> DataFrame {
    DataFrame::new(vec![
        Series::new("hid".into(), vec!["1", "2", "4"]).into(),
        Series::new("zone".into(), vec!["A", "B", "C"]).into(),
        Series::new("weight".into(), vec![2.0f64, 2.0, 2.0]).into(),
    ])
    .unwrap()
}

fn strings(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    df.column(column)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

#[test]
fn test_overlap_compares_keys_as_strings() {
    let coverage = check_overlap(&persons(), &households(), "hid").unwrap();
    assert_eq!(coverage.left_keys, 3);
    assert_eq!(coverage.right_keys, 3);
    assert_eq!(
        coverage.missing_in_right.iter().collect::<Vec<_>>(),
        vec!["3"]
    );
    assert_eq!(coverage.missing_in_left.iter().collect::<Vec<_>>(), vec!["4"]);
    assert!(!coverage.is_complete());
}

#[test]
fn test_missing_key_column_is_an_error() {
    let err = check_overlap(&persons(), &households(), "pid").unwrap_err();
    assert_eq!(
        err.downcast_ref::<HarmonizeError>(),
        Some(&HarmonizeError::missing_column("right", "pid"))
    );
}

#[test]
fn test_collisions_exclude_the_key() {
    let collisions = column_collisions(&persons(), &households(), "hid");
    assert_eq!(collisions.into_iter().collect::<Vec<_>>(), vec!["weight"]);
}

#[test]
fn test_inner_join_keeps_left_order() {
    let outcome = join_tables(
        &persons(),
        &households(),
        "hid",
        JoinOptions::inner().ordered(),
    )
    .unwrap();
    let frame = &outcome.frame;
    assert_eq!(frame.height(), 3);
    assert_eq!(
        strings(frame, "pid"),
        vec![
            Some("1-1".to_string()),
            Some("2-1".to_string()),
            Some("1-2".to_string())
        ]
    );
    assert_eq!(
        strings(frame, "zone"),
        vec![Some("A".to_string()), Some("B".to_string()), Some("A".to_string())]
    );
    // the clashing column is suffixed, not dropped
    assert!(frame.column("weight_right").is_ok());

    let report = &outcome.report;
    assert_eq!(report.how, "inner");
    assert_eq!(report.left_rows, 4);
    assert_eq!(report.output_rows, 3);
    assert!(report.collisions.contains("weight"));
}

#[test]
fn test_left_join_keeps_unmatched_rows() {
    let outcome = join_tables(
        &persons(),
        &households(),
        "hid",
        JoinOptions::left().ordered(),
    )
    .unwrap();
    assert_eq!(outcome.frame.height(), 4);
    assert_eq!(strings(&outcome.frame, "zone")[0], None);
}

#[test]
fn test_anti_join_lists_orphans() {
    let options = JoinOptions {
        how: JoinHow::Anti,
        maintain_order: true,
    };
    let outcome = join_tables(&persons(), &households(), "hid", options).unwrap();
    assert_eq!(outcome.frame.height(), 1);
    assert_eq!(strings(&outcome.frame, "pid"), vec![Some("3-1".to_string())]);
}

#[test]
fn test_compare_reports_every_difference() {
    let reference = TableRef::new(
        "2017",
        DataFrame::new(vec![
            Series::new("mode".into(), vec!["car", "bus", "walk"]).into(),
            Series::new("distance".into(), vec![1.0f64, 2.0, 3.0]).into(),
            Series::new("tst".into(), vec![480i64, 500, 520]).into(),
            Series::new("hid".into(), vec![1i64, 2, 3]).into(),
        ])
        .unwrap(),
    );
    let other = TableRef::new(
        "2009",
        DataFrame::new(vec![
            Series::new("mode".into(), vec!["car", "bus", "ferry"]).into(),
            Series::new("distance".into(), vec![10.0f64, 20.0, 30.0]).into(),
            Series::new("tst".into(), vec![480i64, 500, 520]).into(),
            Series::new("hid".into(), vec!["1", "2", "3"]).into(),
            Series::new("stage".into(), vec![1i64, 1, 2]).into(),
        ])
        .unwrap(),
    );

    let comparisons =
        compare_tables(&reference, &[other], &CompareOptions::default()).unwrap();
    assert_eq!(comparisons.len(), 1);
    let comparison = &comparisons[0];

    assert!(!comparison.is_match());
    assert!(comparison.missing_columns.is_empty());
    assert_eq!(
        comparison.extra_columns.iter().collect::<Vec<_>>(),
        vec!["stage"]
    );
    assert_eq!(comparison.kind_mismatches.len(), 1);
    assert_eq!(comparison.kind_mismatches[0].column, "hid");
    assert_eq!(comparison.kind_mismatches[0].other, ColumnKind::Categorical);

    let mode = &comparison.category_diffs[0];
    assert_eq!(mode.column, "mode");
    assert!(mode.missing.contains("walk"));
    assert!(mode.extra.contains("ferry"));

    assert_eq!(comparison.numeric_drift.len(), 1);
    assert_eq!(comparison.numeric_drift[0].column, "distance");
    assert_eq!(comparison.numeric_drift[0].statistic, "min");

    let lines = comparison.lines(10);
    insta::assert_snapshot!(lines.join("\n"), @r"
    extra columns: [stage]
    kind mismatch: hid (numeric vs categorical)
    categorical diff: mode (missing=[walk], extra=[ferry])
    numeric diff: distance.min (1 vs 10)
    ");
}

#[test]
fn test_identical_tables_match() {
    let table = TableRef::new("a", persons());
    let same = TableRef::new("b", persons());
    let comparisons = compare_tables(&table, &[same], &CompareOptions::default()).unwrap();
    assert!(comparisons[0].is_match());
    assert!(comparisons[0].lines(10).is_empty());
}
