//! Per-person chain reconstruction.
//!
//! Each person's trips are folded in `seq` order: origins are derived from the
//! previous destination (optionally), then clock times are laid onto one
//! continuous timeline. The fold carries a running day offset, so running it
//! twice shifts already-repaired trips again. [`TripFrame::reconstruct`]
//! refuses frames whose timeline is already continuous.
//!
//! Next-day detection uses the clock alone: a trip whose start, at the
//! current offset, falls more than `wrap_tolerance` minutes before the
//! previous trip's adjusted end is moved one more day forward. A coarse
//! `day` column is carried through untouched.

use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, info};
use hts_model::{ChainOptions, HarmonizeError, MINUTES_PER_DAY, Trip};

use crate::frame::{Timeline, TripFrame, segments_from_frame};

/// Rebuild every person's chain; persons keep their first-seen order.
pub fn reconstruct(trips: Vec<Trip>, options: &ChainOptions) -> Vec<Trip> {
    let mut order: Vec<String> = Vec::new();
    let mut plans: HashMap<String, Vec<Trip>> = HashMap::new();
    for trip in trips {
        if !plans.contains_key(&trip.pid) {
            order.push(trip.pid.clone());
        }
        plans.entry(trip.pid.clone()).or_default().push(trip);
    }

    let mut out = Vec::new();
    for pid in order {
        let Some(mut plan) = plans.remove(&pid) else {
            continue;
        };
        plan.sort_by_key(|trip| trip.seq);
        if options.derive_origins {
            plan = derive_origins(plan);
        }
        repair_timeline(&mut plan, options.wrap_tolerance);
        out.extend(plan);
    }
    out
}

/// Copy each origin from the previous destination, drop the first trip and
/// renumber the rest by position from 1.
fn derive_origins(plan: Vec<Trip>) -> Vec<Trip> {
    let mut previous: Option<(Option<String>, Option<String>)> = None;
    let mut out = Vec::with_capacity(plan.len().saturating_sub(1));
    for mut trip in plan {
        let destination = (trip.dact.clone(), trip.dzone.clone());
        if let Some((dact, dzone)) = previous.take() {
            trip.oact = dact;
            trip.ozone = dzone;
            trip.seq = out.len() as i64 + 1;
            out.push(trip);
        }
        previous = Some(destination);
    }
    out
}

/// The per-person fold: intra-day wrap, then the running day offset.
fn repair_timeline(plan: &mut [Trip], wrap_tolerance: i64) {
    let mut offset = 0i64;
    let mut previous_end: Option<i64> = None;
    for trip in plan.iter_mut() {
        let (Some(tst), Some(mut tet)) = (trip.tst, trip.tet) else {
            continue;
        };
        if tet < tst {
            tet += MINUTES_PER_DAY;
        }
        let duration = tet - tst;

        let mut start = tst + offset * MINUTES_PER_DAY;
        if let Some(end) = previous_end {
            while start < end - wrap_tolerance {
                offset += 1;
                start += MINUTES_PER_DAY;
            }
        }
        trip.tst = Some(start);
        trip.tet = Some(start + duration);
        previous_end = trip.tet;
    }
    if offset > 0 {
        debug!(pid = plan.first().map(|t| t.pid.as_str()), days = offset + 1, "multi-day plan");
    }
}

impl TripFrame {
    /// Reconstruct the chains of this frame exactly once.
    ///
    /// Fails with [`HarmonizeError::TimelineAlreadyRepaired`] when the frame
    /// is already on the continuous timeline.
    pub fn reconstruct(&self, options: &ChainOptions) -> Result<Self> {
        if self.timeline() == Timeline::Continuous {
            return Err(HarmonizeError::TimelineAlreadyRepaired.into());
        }
        let trips: Vec<Trip> = segments_from_frame(&self.data, None)?
            .into_iter()
            .map(hts_model::TripSegment::into_trip)
            .collect();
        let before = trips.len();
        let trips = reconstruct(trips, options);
        info!(
            trips_in = before,
            trips_out = trips.len(),
            derive_origins = options.derive_origins,
            "reconstructed trip chains"
        );
        Self::from_trips(&self.data, &trips, Timeline::Continuous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overnight_trip_ends_after_midnight() {
        let trips = vec![Trip::new("p", 1).with_times(1430, 10)];
        let out = reconstruct(trips, &ChainOptions::default());
        assert_eq!(out[0].tst, Some(1430));
        assert_eq!(out[0].tet, Some(1450));
    }

    #[test]
    fn clock_wrap_moves_rest_of_plan_to_next_day() {
        let trips = vec![
            Trip::new("p", 1).with_times(1300, 1330),
            Trip::new("p", 2).with_times(1420, 20),
            Trip::new("p", 3).with_times(60, 90),
            Trip::new("p", 4).with_times(600, 630),
        ];
        let out = reconstruct(trips, &ChainOptions::default());
        let times: Vec<(Option<i64>, Option<i64>)> =
            out.iter().map(|trip| (trip.tst, trip.tet)).collect();
        assert_eq!(
            times,
            vec![
                (Some(1300), Some(1330)),
                (Some(1420), Some(1460)),
                (Some(1500), Some(1530)),
                (Some(2040), Some(2070)),
            ]
        );
    }

    #[test]
    fn small_overlap_within_tolerance_is_left_in_place() {
        let trips = vec![
            Trip::new("p", 1).with_times(600, 640),
            Trip::new("p", 2).with_times(630, 650),
        ];
        let out = reconstruct(trips, &ChainOptions::default().with_wrap_tolerance(60));
        assert_eq!(out[1].tst, Some(630));
    }

    #[test]
    fn trips_are_ordered_by_seq_within_person() {
        let trips = vec![
            Trip::new("p", 2).with_times(600, 610),
            Trip::new("q", 1).with_times(100, 110),
            Trip::new("p", 1).with_times(500, 510),
        ];
        let out = reconstruct(trips, &ChainOptions::default());
        let keys: Vec<(&str, i64)> = out.iter().map(|t| (t.pid.as_str(), t.seq)).collect();
        assert_eq!(keys, vec![("p", 1), ("p", 2), ("q", 1)]);
    }

    #[test]
    fn origins_come_from_previous_destination() {
        let trips = vec![
            Trip::new("p", 1).with_activities("home", "shop").with_zones("urban", "suburban"),
            Trip::new("p", 2).with_times(510, 540),
            Trip::new("p", 3).with_activities("other", "home"),
        ];
        let out = reconstruct(trips, &ChainOptions::default().with_derived_origins(true));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].seq, 1);
        assert_eq!(out[0].oact.as_deref(), Some("shop"));
        assert_eq!(out[0].ozone.as_deref(), Some("suburban"));
        assert_eq!(out[1].seq, 2);
        assert_eq!(out[1].oact, None);
        assert_eq!(out[1].dact.as_deref(), Some("home"));
    }

    #[test]
    fn derived_plans_are_renumbered_from_one() {
        let trips = vec![
            Trip::new("p", 5).with_activities("home", "work"),
            Trip::new("p", 7).with_activities("work", "shop"),
            Trip::new("p", 9).with_activities("shop", "home"),
        ];
        let out = reconstruct(trips, &ChainOptions::default().with_derived_origins(true));
        let seqs: Vec<i64> = out.iter().map(|trip| trip.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }
}
