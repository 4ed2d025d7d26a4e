use std::path::PathBuf;

/// Errors raised while reading codebook and template files.
///
/// Resolution failures at run time (a year with no sub-map and no `default`,
/// a field the run asks for but the file lacks) are reported as
/// [`hts_model::HarmonizeError::Configuration`] instead.
#[derive(Debug, thiserror::Error)]
pub enum CodebookError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid codebook field '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl CodebookError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn yaml(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
