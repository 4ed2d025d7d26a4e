//! Tests for model types and their serialized forms.

use std::collections::BTreeMap;

use hts_model::{
    CaseInsensitiveSet, ChainOptions, ExclusionReason, HarmonizeError, IntegrityOptions,
    IntegrityReport, RecodePolicy,
};

#[test]
fn error_messages_name_field_and_value() {
    let error = HarmonizeError::unmapped("mode", "97");
    assert_eq!(
        error.to_string(),
        "unmapped category in field 'mode': value '97' has no codebook entry and no default"
    );
    let error = HarmonizeError::configuration("hh_income", "no entry for year 2030 and no default");
    assert!(error.to_string().contains("hh_income"));
}

#[test]
fn recode_policy_deserializes_from_json() {
    let strict: RecodePolicy = serde_json::from_str("\"strict\"").unwrap();
    assert_eq!(strict, RecodePolicy::Strict);
    let pass: RecodePolicy = serde_json::from_str("\"pass_through\"").unwrap();
    assert_eq!(pass, RecodePolicy::PassThrough);
    let fallback: RecodePolicy = serde_json::from_str("{\"default\": \"unknown\"}").unwrap();
    assert_eq!(fallback, RecodePolicy::default_to("unknown"));
}

#[test]
fn options_fill_defaults() {
    let chain: ChainOptions = serde_json::from_str("{\"derive_origins\": true}").unwrap();
    assert!(chain.derive_origins);
    assert_eq!(chain.wrap_tolerance, 0);

    let integrity: IntegrityOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(integrity.key, "pid");
    assert!(integrity.trip_columns.contains(&"tst".to_string()));
    assert!(!integrity.negative_is_missing);
}

#[test]
fn integrity_report_serializes_reason_keys() {
    let mut plans_by_reason = BTreeMap::new();
    plans_by_reason.insert(ExclusionReason::Overlap, 2);
    let report = IntegrityReport {
        checked_plans: 10,
        removed_trips: 5,
        removed_plans: 2,
        removed_attribute_rows: 2,
        plans_by_reason,
        excluded_keys: ["11".to_string(), "12".to_string()].into_iter().collect(),
    };
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["plans_by_reason"]["overlap"], 2);
    assert_eq!(report.sample(1), "[11] (+1 more)");
}

#[test]
fn case_insensitive_lookup_keeps_first_spelling() {
    let set = CaseInsensitiveSet::new(["HOUSEID", "houseid", "PERSONID"]);
    assert_eq!(set.get("houseid"), Some("HOUSEID"));
    assert!(set.contains("PersonId"));
    assert!(!set.contains("TRIPID"));
}
