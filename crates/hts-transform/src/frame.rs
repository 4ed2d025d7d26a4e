//! The trips frame and its record adapters.
//!
//! Leg merging and chain reconstruction run on [`TripSegment`]/[`Trip`]
//! records. [`segments_from_frame`] reads the canonical trip columns of a
//! frame into records; [`TripFrame::from_trips`] writes records back,
//! carrying every other column of the source frame along by each record's
//! `row`.

use anyhow::Result;
use polars::prelude::{DataFrame, IdxCa, IdxSize, NamedFrom, NewChunkedArray, Series};
use hts_common::{column_f64s, column_i64s, column_strings, has_column};
use hts_model::columns::{
    DACT, DISTANCE, DZONE, MODE, OACT, OZONE, PID, SEQ, TET, TID, TRIP_RECORD_COLUMNS, TST,
};
use hts_model::{HarmonizeError, Trip, TripSegment};

/// Which clock the trip times of a frame are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeline {
    /// Minutes after midnight of the reported day, possibly wrapping.
    #[default]
    Clock,
    /// One continuous, non-decreasing timeline per person.
    Continuous,
}

/// A trips table plus the state of its timeline.
///
/// Chain reconstruction is not idempotent; [`Timeline`] records whether it
/// already ran so a second application is refused.
#[derive(Debug, Clone)]
pub struct TripFrame {
    pub data: DataFrame,
    timeline: Timeline,
}

impl TripFrame {
    /// Wrap a frame whose times are still raw clock minutes.
    pub fn new(data: DataFrame) -> Self {
        Self {
            data,
            timeline: Timeline::Clock,
        }
    }

    pub fn timeline(&self) -> Timeline {
        self.timeline
    }

    pub fn record_count(&self) -> usize {
        self.data.height()
    }

    pub fn into_inner(self) -> DataFrame {
        self.data
    }

    /// Number the trips `1..=n` in frame order into `tid`.
    pub fn with_trip_ids(mut self) -> Result<Self> {
        let ids: Vec<i64> = (1..=self.data.height() as i64).collect();
        self.data.with_column(Series::new(TID.into(), ids))?;
        Ok(self)
    }

    /// Rebuild a frame from records.
    ///
    /// Canonical record columns come from `trips`; every other column of
    /// `source` is taken from the row each trip points at. Source column
    /// order is kept; record columns the source lacked are appended when any
    /// trip carries a value for them.
    pub fn from_trips(source: &DataFrame, trips: &[Trip], timeline: Timeline) -> Result<Self> {
        let indices: Vec<IdxSize> = trips.iter().map(|trip| trip.row as IdxSize).collect();
        let idx = IdxCa::from_vec("row".into(), indices);

        let mut order: Vec<String> = source
            .get_column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        if !order.iter().any(|name| name == PID) {
            return Err(HarmonizeError::missing_column("trips", PID).into());
        }

        let mut data = source.select(order.clone())?.take(&idx)?;
        data.with_column(Series::new(
            PID.into(),
            trips.iter().map(|t| t.pid.clone()).collect::<Vec<_>>(),
        ))?;
        for name in TRIP_RECORD_COLUMNS {
            let series = record_series(name, trips);
            let present = has_column(source, name);
            if present || series.null_count() < series.len() {
                if !present {
                    order.push(name.to_string());
                }
                data.with_column(series)?;
            }
        }
        let data = data.select(order)?;
        Ok(Self { data, timeline })
    }
}

fn record_series(name: &str, trips: &[Trip]) -> Series {
    match name {
        SEQ => Series::new(name.into(), trips.iter().map(|t| t.seq).collect::<Vec<_>>()),
        TST => Series::new(name.into(), trips.iter().map(|t| t.tst).collect::<Vec<_>>()),
        TET => Series::new(name.into(), trips.iter().map(|t| t.tet).collect::<Vec<_>>()),
        DISTANCE => Series::new(
            name.into(),
            trips.iter().map(|t| t.distance).collect::<Vec<_>>(),
        ),
        _ => Series::new(
            name.into(),
            trips
                .iter()
                .map(|t| text_field(t, name).map(str::to_string))
                .collect::<Vec<_>>(),
        ),
    }
}

fn text_field<'a>(trip: &'a Trip, name: &str) -> Option<&'a str> {
    match name {
        MODE => trip.mode.as_deref(),
        OACT => trip.oact.as_deref(),
        DACT => trip.dact.as_deref(),
        OZONE => trip.ozone.as_deref(),
        DZONE => trip.dzone.as_deref(),
        _ => None,
    }
}

/// Read the canonical trip columns of a frame into segments.
///
/// `pid` is required. A missing `seq` column, or a null `seq` cell, gets the
/// record's position within its person. Other canonical columns are optional
/// and read as missing when absent. `stage` names the leg grouping column.
pub fn segments_from_frame(df: &DataFrame, stage: Option<&str>) -> Result<Vec<TripSegment>> {
    if !has_column(df, PID) {
        return Err(HarmonizeError::missing_column("trips", PID).into());
    }
    let height = df.height();
    let strings = |name: &str| -> Result<Vec<Option<String>>> {
        if has_column(df, name) {
            Ok(column_strings(df, name)?)
        } else {
            Ok(vec![None; height])
        }
    };
    let integers = |name: &str| -> Result<Vec<Option<i64>>> {
        if has_column(df, name) {
            Ok(column_i64s(df, name)?)
        } else {
            Ok(vec![None; height])
        }
    };

    let pids = strings(PID)?;
    let seqs = integers(SEQ)?;
    let stages = match stage {
        Some(name) => strings(name)?,
        None => vec![None; height],
    };
    let modes = strings(MODE)?;
    let oacts = strings(OACT)?;
    let dacts = strings(DACT)?;
    let ozones = strings(OZONE)?;
    let dzones = strings(DZONE)?;
    let starts = integers(TST)?;
    let ends = integers(TET)?;
    let distances = if has_column(df, DISTANCE) {
        column_f64s(df, DISTANCE)?
    } else {
        vec![None; height]
    };

    let mut positions: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
    let mut segments = Vec::with_capacity(height);
    for row in 0..height {
        let pid = pids[row].clone().unwrap_or_default();
        let position = positions.entry(pid.clone()).or_insert(0);
        *position += 1;
        segments.push(TripSegment {
            row,
            seq: seqs[row].unwrap_or(*position),
            pid,
            stage: stages[row].clone(),
            mode: modes[row].clone(),
            oact: oacts[row].clone(),
            dact: dacts[row].clone(),
            ozone: ozones[row].clone(),
            dzone: dzones[row].clone(),
            tst: starts[row],
            tet: ends[row],
            distance: distances[row],
        });
    }
    Ok(segments)
}
