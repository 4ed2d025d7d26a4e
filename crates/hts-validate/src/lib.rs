//! Consistency gates for harmonized tables.
//!
//! Nothing in this crate aborts a run over bad records: violating person-plans
//! are excluded, key gaps are reported, and the findings come back as report
//! values next to the filtered frames.

pub mod compare;
pub mod integrity;
pub mod joiner;
pub mod template;

pub use compare::{ColumnKind, CompareOptions, TableComparison, TableRef, compare_tables};
pub use integrity::{IntegrityOutcome, drop_flagged_plans, filter_plans};
pub use joiner::{JoinHow, JoinOptions, JoinOutcome, check_overlap, column_collisions, join_tables};
pub use template::check_template;
