//! Survey harmonization pipeline with explicit stages.
//!
//! 1. **Load**: read raw CSV extracts, resolve codebooks, map columns
//! 2. **Harmonize**: recode categories, sample bracketed values, scale units
//! 3. **Chain**: convert clock times, merge legs, reconstruct chains
//! 4. **Attributes**: join persons to households
//! 5. **Integrity**: drop violating person-plans from both tables
//! 6. **Output**: write canonical tables and the diagnostics file
//!
//! Each stage takes the output of the previous one and returns typed results.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use polars::prelude::{CsvReadOptions, CsvWriter, DataFrame, NamedFrom, SerReader, SerWriter, Series};
use tracing::{debug, info, info_span};

use hts_codebook::{Codebook, CodebookSet, ResolvedCodebooks};
use hts_model::columns::{COLUMN_MAPPINGS, DAY, PID, TET, TST, YEAR};
use hts_model::{ChainOptions, HarmonizeError, JoinReport};
use hts_transform::{
    DebucketOptions, Debucketer, TripFrame, apply_column_mappings, derive_end_from_duration,
    fill_null_literal, rank_days, recode_into, require_columns, scale_column, to_clock_minutes,
};
use hts_validate::{JoinOptions, drop_flagged_plans, join_tables};

use crate::config::{FieldAction, FieldConfig, TableConfig, TripTableConfig};
use crate::types::{FieldSummary, LegSummary};

// ============================================================================
// Stage 1: Load
// ============================================================================

/// A raw table after column mapping, with its codebooks for the survey year.
#[derive(Debug)]
pub struct LoadedTable {
    pub name: String,
    pub source: PathBuf,
    pub frame: DataFrame,
    pub input_rows: usize,
    pub codebooks: Option<ResolvedCodebooks>,
}

/// Read a CSV file with a header row.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("open {}", path.display()))?
        .finish()
        .with_context(|| format!("read {}", path.display()))?;
    Ok(df)
}

/// Read a table, resolve its codebook for `year`, and apply the codebook's
/// column mappings when it has any.
pub fn load_table(name: &str, config: &TableConfig, year: &str) -> Result<LoadedTable> {
    let span = info_span!("load", table = name, source = %config.path.display());
    let _guard = span.enter();
    let start = Instant::now();

    let raw = read_csv(&config.path)?;
    let input_rows = raw.height();

    let codebooks = match &config.codebook {
        Some(path) => {
            let set = CodebookSet::load(path)?;
            Some(set.resolve(year)?)
        }
        None => None,
    };
    let frame = match codebooks.as_ref() {
        Some(codebooks) if codebooks.get(COLUMN_MAPPINGS).is_some() => {
            apply_column_mappings(&raw, name, &codebooks.column_mappings()?)?
        }
        _ => raw,
    };

    info!(
        rows = input_rows,
        columns = frame.width(),
        duration_ms = start.elapsed().as_millis(),
        "table loaded"
    );
    Ok(LoadedTable {
        name: name.to_string(),
        source: config.path.clone(),
        frame,
        input_rows,
        codebooks,
    })
}

/// Drop raw trip plans with a null (or negative) value in `columns`.
///
/// `["*"]` checks every column.
pub fn drop_raw_plans(
    trips: &mut LoadedTable,
    columns: &[String],
    key: &str,
) -> Result<BTreeSet<String>> {
    if columns.is_empty() {
        return Ok(BTreeSet::new());
    }
    let columns: Vec<String> = if columns.iter().any(|column| column == "*") {
        Vec::new()
    } else {
        columns.to_vec()
    };
    let (frame, dropped) = drop_flagged_plans(&trips.frame, key, &columns, true)?;
    trips.frame = frame;
    Ok(dropped)
}

// ============================================================================
// Stage 2: Harmonize
// ============================================================================

/// Apply every configured field of a table, in field-name order.
pub fn harmonize_fields(
    table: &mut LoadedTable,
    fields: &BTreeMap<String, FieldConfig>,
    debucketer: &mut Debucketer,
) -> Result<Vec<FieldSummary>> {
    let span = info_span!("harmonize", table = %table.name);
    let _guard = span.enter();

    let mut summaries = Vec::with_capacity(fields.len());
    for (field, config) in fields {
        let summary = harmonize_field(table, field, config, debucketer)
            .with_context(|| format!("harmonize {}.{field}", table.name))?;
        debug!(
            field = %field,
            converted = summary.converted,
            missing = summary.missing,
            fallback = summary.fallback,
            "field harmonized"
        );
        summaries.push(summary);
    }
    info!(fields = summaries.len(), "table harmonized");
    Ok(summaries)
}

fn harmonize_field(
    table: &mut LoadedTable,
    field: &str,
    config: &FieldConfig,
    debucketer: &mut Debucketer,
) -> Result<FieldSummary> {
    let source = config.source.as_deref().unwrap_or(field);
    let codebook_field = config.codebook_field.as_deref().unwrap_or(field);
    require_columns(&table.frame, &table.name, &[source])?;

    let mut summary = FieldSummary {
        table: table.name.clone(),
        field: field.to_string(),
        action: config.action,
        converted: 0,
        missing: 0,
        fallback: 0,
        filled: 0,
    };
    let options = DebucketOptions {
        scale: config.scale.unwrap_or(1.0),
        missing_value: config.missing_value.unwrap_or(0),
    };

    match config.action {
        FieldAction::Recode => {
            let codebook = field_codebook(&table.name, table.codebooks.as_ref(), codebook_field)?;
            let counts = recode_into(&mut table.frame, source, field, codebook, &config.policy)?;
            summary.converted = counts.mapped;
            summary.missing = counts.mapped_missing + counts.nulls;
            summary.fallback = counts.defaulted + counts.passed_through;
        }
        FieldAction::Debucket => {
            let codebook = field_codebook(&table.name, table.codebooks.as_ref(), codebook_field)?;
            copy_source(&mut table.frame, source, field)?;
            let counts = debucketer.debucket_column(&mut table.frame, field, codebook, &options)?;
            summary.converted = counts.sampled;
            summary.missing = counts.missing;
        }
        FieldAction::DebucketLabels => {
            copy_source(&mut table.frame, source, field)?;
            let counts = debucketer.debucket_label_column(
                &mut table.frame,
                field,
                config.open_upper(),
                &options,
            )?;
            summary.converted = counts.sampled;
            summary.missing = counts.missing;
        }
        FieldAction::Scale => {
            let Some(factor) = config.scale else {
                return Err(
                    HarmonizeError::configuration(field, "scale action needs a 'scale' factor")
                        .into(),
                );
            };
            copy_source(&mut table.frame, source, field)?;
            let counts = scale_column(&mut table.frame, field, factor)?;
            summary.converted = counts.scaled;
            summary.missing = counts.missing;
        }
    }

    if let Some(literal) = &config.fill_null {
        summary.filled = fill_null_literal(&mut table.frame, field, literal)?;
    }
    Ok(summary)
}

fn field_codebook<'a>(
    table: &str,
    codebooks: Option<&'a ResolvedCodebooks>,
    field: &str,
) -> Result<&'a Codebook> {
    let Some(codebooks) = codebooks else {
        bail!("{table} table has no codebook but field '{field}' needs one");
    };
    Ok(codebooks.require(field)?)
}

fn copy_source(df: &mut DataFrame, source: &str, target: &str) -> Result<()> {
    if source != target {
        let column = df.column(source)?.clone().with_name(target.into());
        df.with_column(column)?;
    }
    Ok(())
}

// ============================================================================
// Stage 3: Chain
// ============================================================================

/// Bring trip times to clock minutes and derive the `day` field.
pub fn prepare_trip_times(trips: &mut DataFrame, config: &TripTableConfig) -> Result<()> {
    require_columns(trips, "trips", &[PID, TST])?;
    let converted = to_clock_minutes(trips, TST, &config.clock)?;
    match &config.duration {
        Some(duration) => {
            require_columns(trips, "trips", &[duration.as_str()])?;
            derive_end_from_duration(trips, TST, duration, TET)?;
        }
        None => {
            require_columns(trips, "trips", &[TET])?;
            to_clock_minutes(trips, TET, &config.clock)?;
        }
    }
    if let Some(day_source) = &config.day_source {
        require_columns(trips, "trips", &[day_source.as_str()])?;
        rank_days(trips, PID, day_source, DAY)?;
    }
    debug!(rows = trips.height(), converted, "trip clock times converted");
    Ok(())
}

/// Merge legs (when a stage column is configured) and reconstruct the
/// per-person chains.
pub fn build_chains(
    trips: DataFrame,
    config: &TripTableConfig,
    options: &ChainOptions,
) -> Result<(TripFrame, Option<LegSummary>)> {
    let span = info_span!("chain");
    let _guard = span.enter();
    let start = Instant::now();

    let mut frame = TripFrame::new(trips);
    let mut legs = None;
    if let Some(stage) = &config.stage {
        require_columns(&frame.data, "trips", &[stage.as_str()])?;
        let before = frame.record_count();
        frame = frame.merge_legs(stage)?;
        legs = Some(LegSummary {
            legs: before,
            trips: frame.record_count(),
        });
    }
    let frame = frame.reconstruct(options)?.with_trip_ids()?;
    info!(
        trips = frame.record_count(),
        duration_ms = start.elapsed().as_millis(),
        "trip chains built"
    );
    Ok((frame, legs))
}

// ============================================================================
// Stage 4: Attributes
// ============================================================================

/// Person attributes: persons left-joined to households on `key`.
pub fn build_attributes(
    persons: &DataFrame,
    households: Option<&DataFrame>,
    key: &str,
) -> Result<(DataFrame, Option<JoinReport>)> {
    let Some(households) = households else {
        return Ok((persons.clone(), None));
    };
    let span = info_span!("attributes", key);
    let _guard = span.enter();
    let outcome = join_tables(persons, households, key, JoinOptions::left().ordered())?;
    Ok((outcome.frame, Some(outcome.report)))
}

/// Record the survey year on every attribute row.
pub fn stamp_year(df: &mut DataFrame, year: &str) -> Result<()> {
    let years = vec![year.to_string(); df.height()];
    df.with_column(Series::new(YEAR.into(), years))?;
    Ok(())
}

// ============================================================================
// Stage 6: Output (stage 5 runs in hts-validate)
// ============================================================================

/// Write `df` as CSV with a header row.
pub fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Write named tables as `<name>.csv` into `dir`.
pub fn write_tables(dir: &Path, tables: &mut [(&str, &mut DataFrame)]) -> Result<Vec<PathBuf>> {
    let span = info_span!("output", dir = %dir.display());
    let _guard = span.enter();
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut written = Vec::with_capacity(tables.len());
    for (name, df) in tables.iter_mut() {
        let path = dir.join(format!("{name}.csv"));
        write_csv(&path, df)?;
        info!(table = *name, rows = df.height(), path = %path.display(), "table written");
        written.push(path);
    }
    Ok(written)
}

/// Write the diagnostics payload as pretty JSON.
pub fn write_diagnostics<T: serde::Serialize>(dir: &Path, payload: &T) -> Result<PathBuf> {
    let path = dir.join("diagnostics.json");
    let json = serde_json::to_string_pretty(payload)?;
    fs::write(&path, format!("{json}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
