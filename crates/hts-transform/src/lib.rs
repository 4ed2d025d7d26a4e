//! Travel survey transformation stages.
//!
//! - **normalization**: codebook recoding, de-bucketing, unit scaling and clock conversion
//! - **legs**: collapsing stage-grouped legs into one trip
//! - **chain**: origin derivation and the per-person continuous timeline
//! - **frame**: the trips frame and its record adapters
//! - **data_utils**: column selection and renaming

pub mod chain;
pub mod data_utils;
pub mod frame;
pub mod legs;
pub mod normalization;

pub use chain::reconstruct;
pub use data_utils::{apply_column_mappings, require_columns};
pub use frame::{Timeline, TripFrame, segments_from_frame};
pub use legs::merge_legs;
pub use normalization::{
    ClockFormat, DebucketOptions, DebucketSummary, Debucketer, RecodeSummary, ScaleSummary,
    derive_end_from_duration, fill_null_literal, rank_days, recode_column, recode_into,
    recode_value, scale_column, to_clock_minutes,
};
