use std::collections::BTreeSet;

use polars::prelude::DataFrame;
use tracing::warn;
use hts_model::{SchemaTemplate, TemplateCheck};

/// Required template columns absent from the harmonized tables.
pub fn check_template(
    attributes: &DataFrame,
    trips: &DataFrame,
    template: &SchemaTemplate,
) -> TemplateCheck {
    let check = TemplateCheck {
        missing_attribute_columns: missing(attributes, &template.attribute_columns),
        missing_trip_columns: missing(trips, &template.trip_columns),
    };
    if !check.missing_attribute_columns.is_empty() {
        warn!(columns = ?check.missing_attribute_columns, "missing columns in attributes");
    }
    if !check.missing_trip_columns.is_empty() {
        warn!(columns = ?check.missing_trip_columns, "missing columns in trips");
    }
    check
}

fn missing(df: &DataFrame, required: &BTreeSet<String>) -> BTreeSet<String> {
    required
        .iter()
        .filter(|name| df.column(name.as_str()).is_err())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{NamedFrom, Series};

    #[test]
    fn reports_missing_columns_per_table() {
        let attributes = DataFrame::new(vec![
            Series::new("pid".into(), vec!["1"]).into(),
            Series::new("hid".into(), vec!["1"]).into(),
        ])
        .unwrap();
        let trips = DataFrame::new(vec![Series::new("pid".into(), vec!["1"]).into()]).unwrap();
        let template = SchemaTemplate {
            attribute_columns: ["pid", "hid", "age"].iter().map(|s| s.to_string()).collect(),
            trip_columns: ["pid"].iter().map(|s| s.to_string()).collect(),
        };

        let check = check_template(&attributes, &trips, &template);
        assert!(!check.is_complete());
        assert_eq!(
            check.missing_attribute_columns.into_iter().collect::<Vec<_>>(),
            vec!["age".to_string()]
        );
        assert!(check.missing_trip_columns.is_empty());
    }
}
