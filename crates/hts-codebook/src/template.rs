use std::path::Path;

use hts_model::SchemaTemplate;

use crate::error::CodebookError;

/// Load the output schema template (`attribute_columns`, `trip_columns`).
pub fn load_template(path: &Path) -> Result<SchemaTemplate, CodebookError> {
    let text = std::fs::read_to_string(path).map_err(|e| CodebookError::io(path, e))?;
    serde_yaml::from_str(&text).map_err(|e| CodebookError::yaml(path, e))
}

/// Parse a schema template held in memory.
pub fn parse_template(text: &str) -> Result<SchemaTemplate, CodebookError> {
    serde_yaml::from_str(text).map_err(|e| CodebookError::yaml("<inline>", e))
}
