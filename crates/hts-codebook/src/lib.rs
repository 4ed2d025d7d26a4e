//! Codebook and schema template loading.
//!
//! Codebooks are external YAML data: per-field maps from raw survey codes to
//! canonical categories, bound pairs, or "missing", optionally keyed by
//! survey year.

pub mod codebook;
pub mod error;
pub mod template;

pub use codebook::{
    CodeValue, Codebook, CodebookSet, DEFAULT_YEAR_KEY, FieldSpec, ResolvedCodebooks,
};
pub use error::CodebookError;
pub use template::{load_template, parse_template};
