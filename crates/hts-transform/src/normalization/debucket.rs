//! De-bucketing of censored numeric fields.
//!
//! Income and age are often reported as bracket codes. The codebook maps each
//! code to a closed interval `[lo, hi]` and [`Debucketer`] draws one integer
//! uniformly from it, optionally scaled (e.g. a currency conversion).
//!
//! The random source is owned by the [`Debucketer`] and passed in by the
//! caller. Seed it for reproducible output; the default pipeline does not.

use anyhow::Result;
use polars::prelude::{DataFrame, NamedFrom, Series};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use hts_codebook::{CodeValue, Codebook};
use hts_common::{column_strings, parse_i64};
use hts_model::HarmonizeError;

/// Upper bound used for open-ended labels such as `"65+"`.
pub const DEFAULT_OPEN_UPPER: i64 = 100;

/// Scale and missing-value handling for one de-bucketed field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebucketOptions {
    /// Linear factor applied to the sampled value before truncation.
    pub scale: f64,
    /// Written when a code has no bound pair (absent, null, or missing).
    pub missing_value: i64,
}

impl Default for DebucketOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            missing_value: 0,
        }
    }
}

impl DebucketOptions {
    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn with_missing_value(mut self, value: i64) -> Self {
        self.missing_value = value;
        self
    }
}

/// Per-column de-bucketing counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DebucketSummary {
    pub sampled: usize,
    /// Rows given the missing sentinel.
    pub missing: usize,
}

/// Bounded sampler over an injected random source.
#[derive(Debug)]
pub struct Debucketer<R = StdRng> {
    rng: R,
}

impl Debucketer<StdRng> {
    /// Reproducible sampler.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Sampler seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Seeded when `seed` is given, from entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

impl<R: Rng> Debucketer<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// One integer drawn uniformly from `[lo, hi]`; `lo` when the interval is
    /// degenerate.
    pub fn sample(&mut self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// Sample and scale; `None` bounds yield the missing sentinel.
    pub fn sample_scaled(&mut self, bounds: Option<(i64, i64)>, options: &DebucketOptions) -> i64 {
        match bounds {
            Some((lo, hi)) => scale(self.sample(lo, hi), options.scale),
            None => options.missing_value,
        }
    }

    /// Replace bracket codes in `column` with sampled integers.
    ///
    /// Codebook entries are bound pairs, or category labels such as
    /// `"25-34"` parsed with [`parse_bounds`]. Null cells and codes mapped to
    /// null get the missing sentinel, as do codes absent from the codebook.
    /// A label that is not a bracket is a configuration error.
    pub fn debucket_column(
        &mut self,
        df: &mut DataFrame,
        column: &str,
        codebook: &Codebook,
        options: &DebucketOptions,
    ) -> Result<DebucketSummary> {
        let raw = column_strings(df, column)?;
        let mut bounds = Vec::with_capacity(raw.len());
        for cell in &raw {
            let entry = cell.as_deref().and_then(|code| codebook.lookup(code));
            bounds.push(match entry {
                Some(CodeValue::Bounds(lo, hi)) => Some((*lo, *hi)),
                Some(CodeValue::Category(label)) => {
                    Some(parse_bounds(label, DEFAULT_OPEN_UPPER).ok_or_else(|| {
                        HarmonizeError::configuration(
                            codebook.field(),
                            format!("'{label}' is not a numeric bracket"),
                        )
                    })?)
                }
                Some(CodeValue::Missing) | None => None,
            });
        }
        Ok(self.write_samples(df, column, &bounds, options)?)
    }

    /// Replace bracket labels (`"25-34"`, `"20->24"`, `"65+"`) in `column`
    /// with sampled integers. Unparseable labels get the missing sentinel.
    pub fn debucket_label_column(
        &mut self,
        df: &mut DataFrame,
        column: &str,
        open_upper: i64,
        options: &DebucketOptions,
    ) -> Result<DebucketSummary> {
        let bounds: Vec<Option<(i64, i64)>> = column_strings(df, column)?
            .iter()
            .map(|cell| cell.as_deref().and_then(|label| parse_bounds(label, open_upper)))
            .collect();
        Ok(self.write_samples(df, column, &bounds, options)?)
    }

    fn write_samples(
        &mut self,
        df: &mut DataFrame,
        column: &str,
        bounds: &[Option<(i64, i64)>],
        options: &DebucketOptions,
    ) -> polars::prelude::PolarsResult<DebucketSummary> {
        let mut summary = DebucketSummary::default();
        let values: Vec<i64> = bounds
            .iter()
            .map(|pair| {
                if pair.is_some() {
                    summary.sampled += 1;
                } else {
                    summary.missing += 1;
                }
                self.sample_scaled(*pair, options)
            })
            .collect();
        df.with_column(Series::new(column.into(), values))?;
        Ok(summary)
    }

    /// Start minute for a trip reported at hour resolution.
    ///
    /// `tst` and `tet` are the reported hours already converted to minutes,
    /// `duration` the trip length in minutes. The start is drawn from the
    /// window where both the start hour and the end hour still match;
    /// when that window is empty the midpoint `(tst + tet + duration) / 2`
    /// is used instead.
    pub fn sample_start_minute(&mut self, tst: i64, tet: i64, duration: i64) -> i64 {
        let earliest = tst.max(tet - duration);
        let latest = (tst + 60).min(tet + 60 - duration);
        if latest < earliest {
            return (tst + tet + duration) / 2;
        }
        self.sample(earliest, latest)
    }

    /// A value drawn from `[base, base + width]`, for durations reported in
    /// coarse steps.
    pub fn jitter(&mut self, base: i64, width: i64) -> i64 {
        self.sample(base, base + width.max(0))
    }
}

fn scale(value: i64, factor: f64) -> i64 {
    if factor == 1.0 {
        value
    } else {
        (value as f64 * factor).trunc() as i64
    }
}

/// Parse a textual bracket into a bound pair.
///
/// Accepts `"lo-hi"`, `"lo->hi"`, a single number, and open-ended `"lo+"`
/// (upper bound `open_upper`, or `lo` when that is smaller).
///
/// ```
/// use hts_transform::normalization::debucket::parse_bounds;
///
/// assert_eq!(parse_bounds("25-34", 100), Some((25, 34)));
/// assert_eq!(parse_bounds("20->24", 100), Some((20, 24)));
/// assert_eq!(parse_bounds("65+", 100), Some((65, 100)));
/// assert_eq!(parse_bounds("100+", 100), Some((100, 100)));
/// assert_eq!(parse_bounds("7", 100), Some((7, 7)));
/// assert_eq!(parse_bounds("unknown", 100), None);
/// ```
pub fn parse_bounds(label: &str, open_upper: i64) -> Option<(i64, i64)> {
    let label = label.trim();
    if let Some(lo) = label.strip_suffix('+') {
        let lo = parse_i64(lo)?;
        return Some((lo, open_upper.max(lo)));
    }
    if let Some(value) = parse_i64(label) {
        return Some((value, value));
    }
    let (lo, hi) = label
        .split_once("->")
        .or_else(|| label.split_once(" to "))
        .or_else(|| label.split_once('-'))?;
    let (lo, hi) = (parse_i64(lo)?, parse_i64(hi)?);
    (lo <= hi).then_some((lo, hi))
}
