//! Canonical data model for harmonized household travel surveys.
//!
//! Households, persons and trips are joinable on `hid`/`pid`. This crate holds
//! the pieces every stage agrees on: column names, trip records, stage
//! options, diagnostic reports and the fatal error taxonomy.

pub mod columns;
pub mod error;
pub mod lookup;
pub mod options;
pub mod report;
pub mod template;
pub mod trip;

pub use error::{HarmonizeError, Result};
pub use lookup::CaseInsensitiveSet;
pub use options::{ChainOptions, IntegrityOptions, RecodePolicy};
pub use report::{
    DEFAULT_SAMPLE_SIZE, ExclusionReason, IntegrityReport, JoinReport, KeyCoverage,
    TemplateCheck, format_sample,
};
pub use template::SchemaTemplate;
pub use trip::{MINUTES_PER_DAY, Trip, TripSegment};
