//! Leg merging: several recorded legs of one logical trip become one trip.

use std::collections::HashMap;

use anyhow::Result;
use tracing::info;
use hts_model::{Trip, TripSegment};

use crate::frame::{TripFrame, segments_from_frame};

/// Collapse stage-grouped legs into trips.
///
/// Legs sharing `(pid, stage)` form one trip; a leg without a stage key is a
/// trip on its own. Per group, in input order:
///
/// - `mode`, `tst`, `oact`, `ozone`, `seq` and the source row come from the
///   first leg;
/// - `tet`, `dact`, `dzone` come from the last leg;
/// - `distance` is the sum of the legs that report one, and stays missing
///   when none do.
///
/// Trips are returned in the order their first leg was seen.
pub fn merge_legs(segments: &[TripSegment]) -> Vec<Trip> {
    let mut groups: Vec<Vec<&TripSegment>> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    for segment in segments {
        let slot = match segment.stage.as_deref() {
            Some(stage) => *index
                .entry((segment.pid.as_str(), stage))
                .or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                }),
            None => {
                groups.push(Vec::new());
                groups.len() - 1
            }
        };
        groups[slot].push(segment);
    }
    groups.iter().filter_map(|legs| merge_group(legs)).collect()
}

fn merge_group(legs: &[&TripSegment]) -> Option<Trip> {
    let first = legs.first()?;
    let last = legs.last()?;
    let distance = legs
        .iter()
        .filter_map(|leg| leg.distance)
        .fold(None, |total: Option<f64>, d| Some(total.unwrap_or(0.0) + d));
    Some(Trip {
        row: first.row,
        pid: first.pid.clone(),
        seq: first.seq,
        mode: first.mode.clone(),
        oact: first.oact.clone(),
        ozone: first.ozone.clone(),
        tst: first.tst,
        dact: last.dact.clone(),
        dzone: last.dzone.clone(),
        tet: last.tet,
        distance,
    })
}

impl TripFrame {
    /// Merge the legs of this frame grouped by the `stage` column.
    ///
    /// The stage column is dropped; other columns are carried from each
    /// trip's first leg.
    pub fn merge_legs(&self, stage: &str) -> Result<Self> {
        let segments = segments_from_frame(&self.data, Some(stage))?;
        let trips = merge_legs(&segments);
        info!(
            legs = segments.len(),
            trips = trips.len(),
            "merged trip legs"
        );
        let mut merged = Self::from_trips(&self.data, &trips, self.timeline())?;
        if merged.data.column(stage).is_ok() {
            merged.data = merged.data.drop(stage)?;
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(stage: &str, tst: i64, tet: i64, distance: f64) -> TripSegment {
        TripSegment::new("p1", 2, Some(stage))
            .with_times(tst, tet)
            .with_distance(distance)
    }

    #[test]
    fn three_legs_reduce_to_one_trip() {
        let segments = vec![
            leg("s", 600, 610, 1.0).with_mode("walk").with_activities("home", "transfer"),
            leg("s", 612, 640, 2.0).with_mode("bus"),
            leg("s", 641, 650, 3.0).with_mode("walk").with_activities("transfer", "work"),
        ];
        let trips = merge_legs(&segments);
        assert_eq!(trips.len(), 1);
        let trip = &trips[0];
        assert_eq!(trip.distance, Some(6.0));
        assert_eq!(trip.tst, Some(600));
        assert_eq!(trip.tet, Some(650));
        assert_eq!(trip.mode.as_deref(), Some("walk"));
        assert_eq!(trip.oact.as_deref(), Some("home"));
        assert_eq!(trip.dact.as_deref(), Some("work"));
    }

    #[test]
    fn unstaged_legs_stay_separate() {
        let segments = vec![
            TripSegment::new("p1", 1, None).with_times(480, 500),
            TripSegment::new("p1", 2, None).with_times(510, 520),
        ];
        assert_eq!(merge_legs(&segments).len(), 2);
    }

    #[test]
    fn groups_keep_first_seen_order_across_persons() {
        let segments = vec![
            TripSegment::new("p2", 1, Some("a")).with_row(0),
            TripSegment::new("p1", 1, Some("a")).with_row(1),
            TripSegment::new("p2", 1, Some("a")).with_row(2),
        ];
        let trips = merge_legs(&segments);
        let rows: Vec<usize> = trips.iter().map(|trip| trip.row).collect();
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(trips[0].pid, "p2");
    }

    #[test]
    fn all_missing_distance_stays_missing() {
        let segments = vec![
            TripSegment::new("p1", 1, Some("a")),
            TripSegment::new("p1", 1, Some("a")),
        ];
        assert_eq!(merge_legs(&segments)[0].distance, None);
    }
}
