use thiserror::Error;

/// Fatal harmonization errors.
///
/// Per-plan integrity violations and join key gaps are not errors: they are
/// recovered by exclusion and surface as report values instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HarmonizeError {
    #[error("unmapped category in field '{field}': value '{value}' has no codebook entry and no default")]
    UnmappedCategory { field: String, value: String },

    #[error("configuration error in '{field}': {message}")]
    Configuration { field: String, message: String },

    #[error("missing column '{column}' in {table} table")]
    MissingColumn { table: String, column: String },

    #[error("trip timeline is already continuous; chain reconstruction runs exactly once per dataset")]
    TimelineAlreadyRepaired,
}

impl HarmonizeError {
    pub fn unmapped(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnmappedCategory {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarmonizeError>;
