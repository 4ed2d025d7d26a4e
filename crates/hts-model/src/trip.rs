//! Trip segment and canonical trip records.
//!
//! Leg merging and chain reconstruction work on these plain records rather
//! than on frame columns, so each stage can be exercised with literal trip
//! lists. `row` always points back at the frame row the record was read from;
//! non-canonical columns are carried through by that index.

/// Minutes in one wall-clock day.
pub const MINUTES_PER_DAY: i64 = 1440;

/// One raw leg as recorded by the survey instrument.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TripSegment {
    /// Source row in the frame this segment was read from.
    pub row: usize,
    /// Person key, in its string form.
    pub pid: String,
    /// Self-reported ordinal within the person's day.
    pub seq: i64,
    /// Grouping key shared by the legs of one logical trip.
    pub stage: Option<String>,
    pub mode: Option<String>,
    pub oact: Option<String>,
    pub dact: Option<String>,
    pub ozone: Option<String>,
    pub dzone: Option<String>,
    /// Start, in minutes after midnight.
    pub tst: Option<i64>,
    /// End, in minutes after midnight.
    pub tet: Option<i64>,
    /// Kilometres.
    pub distance: Option<f64>,
}

/// A canonical trip: one logical journey between two activities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trip {
    pub row: usize,
    pub pid: String,
    pub seq: i64,
    pub mode: Option<String>,
    pub oact: Option<String>,
    pub dact: Option<String>,
    pub ozone: Option<String>,
    pub dzone: Option<String>,
    pub tst: Option<i64>,
    pub tet: Option<i64>,
    pub distance: Option<f64>,
}

impl Trip {
    /// Create an otherwise empty trip for a person and sequence index.
    pub fn new(pid: impl Into<String>, seq: i64) -> Self {
        Self {
            pid: pid.into(),
            seq,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_times(mut self, tst: i64, tet: i64) -> Self {
        self.tst = Some(tst);
        self.tet = Some(tet);
        self
    }

    #[must_use]
    pub fn with_activities(mut self, oact: &str, dact: &str) -> Self {
        self.oact = Some(oact.to_string());
        self.dact = Some(dact.to_string());
        self
    }

    #[must_use]
    pub fn with_zones(mut self, ozone: &str, dzone: &str) -> Self {
        self.ozone = Some(ozone.to_string());
        self.dzone = Some(dzone.to_string());
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: &str) -> Self {
        self.mode = Some(mode.to_string());
        self
    }

    #[must_use]
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    /// Trip duration in minutes, when both clock values are present.
    pub fn duration(&self) -> Option<i64> {
        Some(self.tet? - self.tst?)
    }
}

impl TripSegment {
    /// Create a leg for a person and sequence index, optionally grouped by stage.
    pub fn new(pid: impl Into<String>, seq: i64, stage: Option<&str>) -> Self {
        Self {
            pid: pid.into(),
            seq,
            stage: stage.map(str::to_string),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_times(mut self, tst: i64, tet: i64) -> Self {
        self.tst = Some(tst);
        self.tet = Some(tet);
        self
    }

    #[must_use]
    pub fn with_activities(mut self, oact: &str, dact: &str) -> Self {
        self.oact = Some(oact.to_string());
        self.dact = Some(dact.to_string());
        self
    }

    #[must_use]
    pub fn with_zones(mut self, ozone: &str, dzone: &str) -> Self {
        self.ozone = Some(ozone.to_string());
        self.dzone = Some(dzone.to_string());
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: &str) -> Self {
        self.mode = Some(mode.to_string());
        self
    }

    #[must_use]
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    /// A single-leg trip: every field taken from this segment as is.
    pub fn into_trip(self) -> Trip {
        Trip {
            row: self.row,
            pid: self.pid,
            seq: self.seq,
            mode: self.mode,
            oact: self.oact,
            dact: self.dact,
            ozone: self.ozone,
            dzone: self.dzone,
            tst: self.tst,
            tet: self.tet,
            distance: self.distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_requires_both_times() {
        assert_eq!(Trip::new("1", 1).with_times(480, 500).duration(), Some(20));
        assert_eq!(Trip::new("1", 1).duration(), None);
    }

    #[test]
    fn single_leg_becomes_trip() {
        let trip = TripSegment::new("7", 3, Some("2"))
            .with_row(4)
            .with_mode("bus")
            .with_times(600, 630)
            .into_trip();
        assert_eq!(trip.row, 4);
        assert_eq!(trip.seq, 3);
        assert_eq!(trip.mode.as_deref(), Some("bus"));
        assert_eq!(trip.tet, Some(630));
    }
}
