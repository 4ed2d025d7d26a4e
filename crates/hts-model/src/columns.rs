//! Canonical column names shared by every harmonized table.

pub const HID: &str = "hid";
pub const PID: &str = "pid";
pub const TID: &str = "tid";
pub const SEQ: &str = "seq";
pub const DAY: &str = "day";
pub const YEAR: &str = "year";

pub const MODE: &str = "mode";
pub const OACT: &str = "oact";
pub const DACT: &str = "dact";
pub const OZONE: &str = "ozone";
pub const DZONE: &str = "dzone";
pub const TST: &str = "tst";
pub const TET: &str = "tet";
pub const DISTANCE: &str = "distance";

/// Name of the field in a codebook file that holds the raw -> canonical
/// column renames.
pub const COLUMN_MAPPINGS: &str = "column_mappings";

/// Trip columns rebuilt from records after leg merging and chain repair.
/// Any other trip column is carried through unchanged.
pub const TRIP_RECORD_COLUMNS: [&str; 9] =
    [SEQ, MODE, OACT, DACT, OZONE, DZONE, TST, TET, DISTANCE];
