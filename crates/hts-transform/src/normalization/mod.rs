//! Value-level harmonization.
//!
//! - **recode**: codebook translation of categorical codes
//! - **debucket**: bounded sampling of bracketed numeric fields
//! - **clock**: trip clock times to minutes after midnight
//! - **numeric**: unit scaling of numeric fields

pub mod clock;
pub mod debucket;
pub mod numeric;
pub mod recode;

pub use clock::{ClockFormat, derive_end_from_duration, hhmm_to_minutes, rank_days, to_clock_minutes};
pub use debucket::{DebucketOptions, DebucketSummary, Debucketer, parse_bounds};
pub use numeric::{ScaleSummary, scale_column};
pub use recode::{RecodeSummary, fill_null_literal, recode_column, recode_into, recode_value};
