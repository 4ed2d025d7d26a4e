use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Required output columns per harmonized table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaTemplate {
    #[serde(default)]
    pub attribute_columns: BTreeSet<String>,
    #[serde(default)]
    pub trip_columns: BTreeSet<String>,
}
