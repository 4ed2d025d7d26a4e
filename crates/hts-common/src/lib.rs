//! Shared utilities for the travel-survey harmonization crates.
//!
//! This crate provides polars `AnyValue` coercions and column extraction
//! helpers used wherever survey codes, keys, and clock values are read
//! row by row.

pub mod anyvalue;
pub mod columns;

// Re-export commonly used functions at crate root for convenience
pub use anyvalue::{
    any_to_f64, any_to_i64, any_to_string, any_to_string_non_empty, format_numeric, parse_f64,
    parse_i64,
};
pub use columns::{column_f64s, column_i64s, column_strings, has_column};
