//! Recoding and de-bucketing against resolved codebooks.

use polars::prelude::{DataFrame, NamedFrom, Series};
use proptest::prelude::*;
use hts_codebook::CodebookSet;
use hts_model::{HarmonizeError, RecodePolicy};
use hts_transform::normalization::debucket::parse_bounds;
use hts_transform::{DebucketOptions, Debucketer, recode_column, recode_value};

const PERSONS: &str = r#"
sex:
  default:
    1: male
    2: female
    -8: ~
  2001:
    1: male
    2: female
age:
  1: "0-4"
  2: "5-15"
  3: "65+"
"#;

#[test]
fn test_recoder_totality_after_year_resolution() {
    let set = CodebookSet::parse(PERSONS).unwrap();
    let sex = set.resolve_field("sex", "2017").unwrap();

    assert_eq!(
        recode_value("sex", "2", sex, &RecodePolicy::Strict).unwrap(),
        Some("female".to_string())
    );
    assert_eq!(recode_value("sex", "-8", sex, &RecodePolicy::Strict).unwrap(), None);
    assert_eq!(
        recode_value("sex", "3", sex, &RecodePolicy::Strict).unwrap_err(),
        HarmonizeError::unmapped("sex", "3")
    );

    // the 2001 map has no missing code
    let sex_2001 = set.resolve_field("sex", "2001").unwrap();
    assert!(recode_value("sex", "-8", sex_2001, &RecodePolicy::Strict).is_err());
}

#[test]
fn test_recode_float_codes_match_integer_keys() {
    let set = CodebookSet::parse(PERSONS).unwrap();
    let sex = set.resolve_field("sex", "2017").unwrap();
    let mut df = DataFrame::new(vec![
        Series::new("sex".into(), vec![1.0f64, 2.0, 1.0]).into(),
    ])
    .unwrap();
    let summary = recode_column(&mut df, "sex", sex, &RecodePolicy::Strict).unwrap();
    assert_eq!(summary.mapped, 3);
    let sex = df.column("sex").unwrap().str().unwrap();
    assert_eq!(sex.get(1), Some("female"));
}

#[test]
fn test_label_brackets_are_sampled() {
    let set = CodebookSet::parse(PERSONS).unwrap();
    let age = set.resolve_field("age", "2017").unwrap();
    let mut df = DataFrame::new(vec![
        Series::new("age".into(), vec![1i64, 2, 3]).into(),
    ])
    .unwrap();
    Debucketer::seeded(42)
        .debucket_column(&mut df, "age", age, &DebucketOptions::default())
        .unwrap();
    let ages: Vec<i64> = df
        .column("age")
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert!((0..=4).contains(&ages[0]));
    assert!((5..=15).contains(&ages[1]));
    assert!((65..=100).contains(&ages[2]));
}

#[test]
fn test_seeded_column_is_reproducible() {
    let set = CodebookSet::parse(PERSONS).unwrap();
    let age = set.resolve_field("age", "2017").unwrap();
    let run = || {
        let mut df =
            DataFrame::new(vec![Series::new("age".into(), vec![1i64, 2, 3, 2, 1]).into()])
                .unwrap();
        Debucketer::seeded(2024)
            .debucket_column(&mut df, "age", age, &DebucketOptions::default())
            .unwrap();
        df
    };
    assert!(run().equals(&run()));
}

proptest! {
    #[test]
    fn prop_sample_is_bounded(lo in -1_000_000i64..1_000_000, width in 0i64..1_000_000, seed in any::<u64>()) {
        let hi = lo + width;
        let value = Debucketer::seeded(seed).sample(lo, hi);
        prop_assert!(value >= lo && value <= hi);
    }

    #[test]
    fn prop_degenerate_interval(value in any::<i32>(), seed in any::<u64>()) {
        let value = i64::from(value);
        prop_assert_eq!(Debucketer::seeded(seed).sample(value, value), value);
    }

    #[test]
    fn prop_parsed_brackets_are_ordered(lo in 0i64..500, width in 0i64..500) {
        let label = format!("{lo}-{}", lo + width);
        prop_assert_eq!(parse_bounds(&label, 100), Some((lo, lo + width)));
    }
}
