use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use tracing::{info, info_span};

use hts_codebook::{CodebookSet, load_template};
use hts_model::TemplateCheck;
use hts_transform::Debucketer;
use hts_validate::{
    CompareOptions, TableComparison, TableRef, check_overlap, check_template, compare_tables,
    filter_plans,
};

use crate::cli::{CodebookArgs, CompareArgs, HarmonizeArgs, VerifyArgs};
use crate::config::RunConfig;
use crate::pipeline::{
    build_attributes, build_chains, drop_raw_plans, harmonize_fields, load_table,
    prepare_trip_times, read_csv, stamp_year, write_diagnostics, write_tables,
};
use crate::summary::{print_codebook, print_comparisons, print_template_check};
use crate::types::{RunResult, TableSummary};

pub fn run_harmonize(args: &HarmonizeArgs) -> Result<RunResult> {
    let mut config = RunConfig::load(&args.config)?;
    if let Some(dir) = &args.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    harmonize(&config, args.dry_run)
}

/// Run every stage for one survey wave.
pub fn harmonize(config: &RunConfig, dry_run: bool) -> Result<RunResult> {
    let span = info_span!("harmonize", survey = %config.survey, year = %config.year);
    let _guard = span.enter();
    let start = Instant::now();
    let mut debucketer = Debucketer::from_seed_option(config.seed);

    // =========================================================================
    // Stage 1-2: Load and harmonize each table
    // =========================================================================
    let mut fields = Vec::new();
    let mut households = match &config.households {
        Some(table) => {
            let mut loaded = load_table("households", table, &config.year)?;
            fields.extend(harmonize_fields(&mut loaded, &table.fields, &mut debucketer)?);
            Some(loaded)
        }
        None => None,
    };
    let mut persons = load_table("persons", &config.persons, &config.year)?;
    fields.extend(harmonize_fields(
        &mut persons,
        &config.persons.fields,
        &mut debucketer,
    )?);

    let mut trips = load_table("trips", &config.trips.table, &config.year)?;
    let dropped_raw_plans =
        drop_raw_plans(&mut trips, &config.trips.drop_flagged, &config.integrity.key)?;
    fields.extend(harmonize_fields(
        &mut trips,
        &config.trips.table.fields,
        &mut debucketer,
    )?);

    // =========================================================================
    // Stage 3: Chains
    // =========================================================================
    prepare_trip_times(&mut trips.frame, &config.trips)?;
    let (chains, merged_legs) = build_chains(trips.frame, &config.trips, &config.chain)?;

    // =========================================================================
    // Stage 4-5: Attributes and integrity
    // =========================================================================
    let (mut attributes, household_join) = build_attributes(
        &persons.frame,
        households.as_ref().map(|table| &table.frame),
        &config.household_key,
    )?;
    stamp_year(&mut attributes, &config.year)?;
    let (trip_coverage, outcome) = info_span!("integrity").in_scope(|| -> Result<_> {
        let coverage = check_overlap(&chains.data, &attributes, &config.integrity.key)?;
        let outcome = filter_plans(&chains.data, &attributes, &config.integrity)?;
        Ok((coverage, outcome))
    })?;
    let mut trips_out = outcome.trips;
    let mut attributes_out = outcome.attributes;

    let template = match &config.template {
        Some(path) => {
            let template = load_template(path)?;
            Some(check_template(&attributes_out, &trips_out, &template))
        }
        None => None,
    };

    // =========================================================================
    // Stage 6: Output
    // =========================================================================
    let output_dir = config.output_dir();
    let mut tables = vec![
        TableSummary {
            name: "attributes".to_string(),
            source: persons.source.clone(),
            input_rows: persons.input_rows,
            output_rows: attributes_out.height(),
            output: None,
        },
        TableSummary {
            name: "trips".to_string(),
            source: trips.source.clone(),
            input_rows: trips.input_rows,
            output_rows: trips_out.height(),
            output: None,
        },
    ];
    if let Some(households) = &households {
        tables.push(TableSummary {
            name: "households".to_string(),
            source: households.source.clone(),
            input_rows: households.input_rows,
            output_rows: households.frame.height(),
            output: None,
        });
    }

    if dry_run {
        info!(
            duration_ms = start.elapsed().as_millis(),
            "output skipped (dry run)"
        );
    } else {
        let mut outputs: Vec<(&str, &mut DataFrame)> = vec![
            ("attributes", &mut attributes_out),
            ("trips", &mut trips_out),
        ];
        if let Some(households) = households.as_mut() {
            outputs.push(("households", &mut households.frame));
        }
        let written = write_tables(&output_dir, &mut outputs)?;
        for (summary, path) in tables.iter_mut().zip(written) {
            summary.output = Some(path);
        }
    }

    let result = RunResult {
        survey: config.survey.clone(),
        year: config.year.clone(),
        seed: config.seed,
        output_dir,
        written: !dry_run,
        tables,
        fields,
        dropped_raw_plans,
        merged_legs,
        household_join,
        trip_coverage,
        integrity: outcome.report,
        template,
    };
    if !dry_run {
        write_diagnostics(&result.output_dir, &result)?;
    }
    info!(
        attributes = attributes_out.height(),
        trips = trips_out.height(),
        duration_ms = start.elapsed().as_millis(),
        "harmonization complete"
    );
    Ok(result)
}

pub fn run_verify(args: &VerifyArgs) -> Result<TemplateCheck> {
    let template = load_template(&args.template)?;
    let attributes = read_csv(&args.attributes)?;
    let trips = read_csv(&args.trips)?;
    let check = check_template(&attributes, &trips, &template);
    print_template_check(&check);
    Ok(check)
}

pub fn run_compare(args: &CompareArgs) -> Result<Vec<TableComparison>> {
    let reference = table_ref(&args.reference)?;
    let others = args
        .others
        .iter()
        .map(|path| table_ref(path))
        .collect::<Result<Vec<_>>>()?;
    let options = CompareOptions {
        max_values: args.max_values,
        numeric_rel_tol: args.tolerance,
        ..CompareOptions::default()
    };
    let comparisons = compare_tables(&reference, &others, &options)?;
    print_comparisons(&comparisons, options.max_values);
    Ok(comparisons)
}

pub fn run_codebook(args: &CodebookArgs) -> Result<()> {
    let set = CodebookSet::load(&args.codebook)
        .with_context(|| format!("load codebook {}", args.codebook.display()))?;
    let year_keyed: BTreeSet<&str> = set
        .field_names()
        .filter(|name| set.field(name).is_some_and(|spec| spec.is_year_keyed()))
        .collect();
    info!(
        fields = set.field_names().count(),
        year_keyed = year_keyed.len(),
        "codebook loaded"
    );
    let resolved = set.resolve(&args.year)?;
    print_codebook(&resolved);
    Ok(())
}

fn table_ref(path: &Path) -> Result<TableRef> {
    let name = path
        .file_stem()
        .map_or_else(|| path.display().to_string(), |stem| stem.to_string_lossy().into_owned());
    Ok(TableRef::new(name, read_csv(path)?))
}
