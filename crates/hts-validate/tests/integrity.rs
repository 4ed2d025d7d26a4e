//! Person-plan integrity filter across the trips and attributes tables.

use polars::prelude::{DataFrame, NamedFrom, Series};
use hts_model::{ExclusionReason, HarmonizeError, IntegrityOptions};
use hts_validate::{drop_flagged_plans, filter_plans};

fn trips() -> DataFrame {
    DataFrame::new(vec![
        Series::new("pid".into(), vec!["1", "1", "1", "2", "2", "3"]).into(),
        Series::new("seq".into(), vec![1i64, 2, 3, 1, 2, 1]).into(),
        Series::new("mode".into(), vec!["car", "car", "walk", "bus", "bus", "bike"]).into(),
        Series::new("tst".into(), vec![480i64, 500, 700, 600, 700, 900]).into(),
        // person 1 trip 2 starts before trip 1 ends
        Series::new("tet".into(), vec![520i64, 530, 720, 620, 720, 930]).into(),
    ])
    .unwrap()
}

fn attributes() -> DataFrame {
    DataFrame::new(vec![
        Series::new("pid".into(), vec!["1", "2", "3", "4"]).into(),
        Series::new("age".into(), vec![Some(34i64), Some(41), Some(-8), None]).into(),
    ])
    .unwrap()
}

fn options() -> IntegrityOptions {
    IntegrityOptions::new().with_trip_columns(["mode", "tst", "tet"])
}

fn pids(df: &DataFrame) -> Vec<String> {
    df.column("pid")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_violating_plan_is_removed_from_both_tables() {
    let outcome = filter_plans(&trips(), &attributes(), &options()).unwrap();

    assert_eq!(pids(&outcome.trips), vec!["2", "2", "3"]);
    assert_eq!(pids(&outcome.attributes), vec!["2", "3", "4"]);

    let report = &outcome.report;
    assert_eq!(report.checked_plans, 3);
    assert_eq!(report.removed_plans, 1);
    assert_eq!(report.removed_trips, 3);
    assert_eq!(report.removed_attribute_rows, 1);
    assert_eq!(report.plans_by_reason.get(&ExclusionReason::Overlap), Some(&1));
    assert!(report.excluded_keys.contains("1"));
}

#[test]
fn test_plan_running_backwards_in_sequence_is_removed() {
    // P's second trip starts before the first ended without the two intersecting
    let trips = DataFrame::new(vec![
        Series::new("pid".into(), vec!["P", "P", "P", "Q"]).into(),
        Series::new("seq".into(), vec![1i64, 2, 3, 1]).into(),
        Series::new("mode".into(), vec!["car", "car", "car", "bus"]).into(),
        Series::new("tst".into(), vec![600i64, 500, 620, 700]).into(),
        Series::new("tet".into(), vec![610i64, 505, 630, 720]).into(),
    ])
    .unwrap();
    let attributes = DataFrame::new(vec![
        Series::new("pid".into(), vec!["P", "Q"]).into(),
        Series::new("age".into(), vec![52i64, 19]).into(),
    ])
    .unwrap();

    let outcome = filter_plans(&trips, &attributes, &options()).unwrap();
    assert_eq!(pids(&outcome.trips), vec!["Q"]);
    assert_eq!(pids(&outcome.attributes), vec!["Q"]);
    assert_eq!(outcome.report.removed_trips, 3);
    assert_eq!(
        outcome.report.plans_by_reason.get(&ExclusionReason::Overlap),
        Some(&1)
    );
}

#[test]
fn test_sequence_column_orders_the_plan() {
    // rows arrive shuffled; in seq order the plan is consistent
    let trips = DataFrame::new(vec![
        Series::new("pid".into(), vec!["P", "P", "P"]).into(),
        Series::new("seq".into(), vec![3i64, 1, 2]).into(),
        Series::new("mode".into(), vec!["car", "car", "car"]).into(),
        Series::new("tst".into(), vec![620i64, 500, 600]).into(),
        Series::new("tet".into(), vec![630i64, 505, 610]).into(),
    ])
    .unwrap();
    let attributes =
        DataFrame::new(vec![Series::new("pid".into(), vec!["P"]).into()]).unwrap();

    let outcome = filter_plans(&trips, &attributes, &options()).unwrap();
    assert!(outcome.report.is_clean());
    assert_eq!(outcome.trips.height(), 3);
}

#[test]
fn test_negative_duration_drops_plan() {
    let mut df = trips();
    df.with_column(Series::new(
        "tet".into(),
        vec![500i64, 530, 720, 620, 690, 930],
    ))
    .unwrap();
    let outcome = filter_plans(&df, &attributes(), &options()).unwrap();
    assert!(outcome.report.excluded_keys.contains("2"));
    assert_eq!(
        outcome.report.plans_by_reason.get(&ExclusionReason::NegativeDuration),
        Some(&1)
    );
    assert_eq!(pids(&outcome.trips), vec!["1", "1", "1", "3"]);
}

#[test]
fn test_attribute_sentinel_drops_trips_too() {
    let options = options()
        .with_attribute_columns(["age"])
        .with_negative_is_missing(true);
    let outcome = filter_plans(&trips(), &attributes(), &options).unwrap();

    // 1: overlap, 3: age -8, 4: age null (no trips)
    assert_eq!(pids(&outcome.trips), vec!["2", "2"]);
    assert_eq!(pids(&outcome.attributes), vec!["2"]);
    assert_eq!(outcome.report.removed_plans, 3);
    assert_eq!(
        outcome
            .report
            .plans_by_reason
            .get(&ExclusionReason::MissingAttributeValue),
        Some(&2)
    );
}

#[test]
fn test_clean_input_is_untouched() {
    let clean = trips().slice(3, 3);
    let outcome = filter_plans(&clean, &attributes(), &options()).unwrap();
    assert!(outcome.report.is_clean());
    assert_eq!(outcome.trips.height(), 3);
    assert_eq!(outcome.attributes.height(), 4);
}

#[test]
fn test_missing_checked_column_is_an_error() {
    let options = options().with_trip_columns(["distance"]);
    let err = filter_plans(&trips(), &attributes(), &options).unwrap_err();
    assert_eq!(
        err.downcast_ref::<HarmonizeError>(),
        Some(&HarmonizeError::missing_column("trips", "distance"))
    );
}

#[test]
fn test_raw_plans_with_refusals_are_dropped() {
    let raw = DataFrame::new(vec![
        Series::new("pid".into(), vec![10i64, 10, 11, 12]).into(),
        Series::new("mode".into(), vec![Some(1i64), Some(-9), Some(2), None]).into(),
        Series::new("dist".into(), vec![1.5f64, 2.0, 0.4, 3.0]).into(),
    ])
    .unwrap();
    let (kept, dropped) = drop_flagged_plans(&raw, "pid", &[], true).unwrap();
    assert_eq!(kept.height(), 1);
    assert_eq!(
        dropped.into_iter().collect::<Vec<_>>(),
        vec!["10".to_string(), "12".to_string()]
    );
}
