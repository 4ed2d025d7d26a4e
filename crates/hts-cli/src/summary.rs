use std::path::Path;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use hts_codebook::ResolvedCodebooks;
use hts_model::{
    DEFAULT_SAMPLE_SIZE, IntegrityReport, JoinReport, KeyCoverage, TemplateCheck, format_sample,
};
use hts_validate::TableComparison;

use crate::types::RunResult;

pub fn print_run_summary(result: &RunResult) {
    println!("Survey: {} ({})", result.survey, result.year);
    match result.seed {
        Some(seed) => println!("Seed: {seed}"),
        None => println!("Seed: entropy"),
    }
    if result.written {
        println!("Output: {}", result.output_dir.display());
    } else {
        println!("Output: skipped (dry run)");
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Source"),
        header_cell("Input rows"),
        header_cell("Output rows"),
        header_cell("Written"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    for summary in &result.tables {
        table.add_row(vec![
            name_cell(&summary.name),
            Cell::new(file_name(&summary.source)),
            Cell::new(summary.input_rows),
            Cell::new(summary.output_rows),
            written_cell(summary.output.is_some()),
        ]);
    }
    println!("{table}");

    if !result.fields.is_empty() {
        let mut fields = Table::new();
        fields.set_header(vec![
            header_cell("Table"),
            header_cell("Field"),
            header_cell("Action"),
            header_cell("Converted"),
            header_cell("Missing"),
            header_cell("Fallback"),
            header_cell("Filled"),
        ]);
        apply_table_style(&mut fields);
        for index in 3..7 {
            align_column(&mut fields, index, CellAlignment::Right);
        }
        for field in &result.fields {
            fields.add_row(vec![
                name_cell(&field.table),
                Cell::new(&field.field),
                Cell::new(field.action),
                Cell::new(field.converted),
                count_cell(field.missing, Color::Yellow),
                count_cell(field.fallback, Color::Yellow),
                count_cell(field.filled, Color::DarkGrey),
            ]);
        }
        println!();
        println!("Fields:");
        println!("{fields}");
    }

    if let Some(legs) = result.merged_legs {
        println!();
        println!("Legs merged: {} legs -> {} trips", legs.legs, legs.trips);
    }
    if !result.dropped_raw_plans.is_empty() {
        println!(
            "Raw plans dropped: {} {}",
            result.dropped_raw_plans.len(),
            format_sample(&result.dropped_raw_plans, DEFAULT_SAMPLE_SIZE)
        );
    }
    if let Some(join) = &result.household_join {
        print_join(join);
    }
    print_trip_coverage(&result.trip_coverage);
    print_integrity(&result.integrity);
    if let Some(check) = &result.template {
        print_template_check(check);
    }
}

fn print_join(report: &JoinReport) {
    let coverage = &report.coverage;
    println!();
    println!(
        "Household join ({} on {}): {} -> {} rows",
        report.how, coverage.key, report.left_rows, report.output_rows
    );
    if !coverage.missing_in_right.is_empty() {
        println!(
            "  persons without household: {} ({:.2}%) {}",
            coverage.missing_in_right.len(),
            coverage.percent_missing_in_right(),
            format_sample(&coverage.missing_in_right, DEFAULT_SAMPLE_SIZE)
        );
    }
    if !coverage.missing_in_left.is_empty() {
        println!(
            "  households without persons: {} ({:.2}%) {}",
            coverage.missing_in_left.len(),
            coverage.percent_missing_in_left(),
            format_sample(&coverage.missing_in_left, DEFAULT_SAMPLE_SIZE)
        );
    }
    if !report.collisions.is_empty() {
        println!(
            "  duplicate columns: {}",
            format_sample(&report.collisions, DEFAULT_SAMPLE_SIZE)
        );
    }
}

fn print_trip_coverage(coverage: &KeyCoverage) {
    if coverage.is_complete() {
        return;
    }
    println!();
    println!(
        "Trip coverage on {}: {} travellers, {} persons",
        coverage.key, coverage.left_keys, coverage.right_keys
    );
    if !coverage.missing_in_left.is_empty() {
        println!(
            "  persons without trips: {} ({:.2}%) {}",
            coverage.missing_in_left.len(),
            coverage.percent_missing_in_left(),
            format_sample(&coverage.missing_in_left, DEFAULT_SAMPLE_SIZE)
        );
    }
    if !coverage.missing_in_right.is_empty() {
        println!(
            "  trips without a person: {} ({:.2}%) {}",
            coverage.missing_in_right.len(),
            coverage.percent_missing_in_right(),
            format_sample(&coverage.missing_in_right, DEFAULT_SAMPLE_SIZE)
        );
    }
}

fn print_integrity(report: &IntegrityReport) {
    println!();
    if report.is_clean() {
        println!("Integrity: all {} person-plans passed", report.checked_plans);
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Reason"), header_cell("Plans")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (reason, count) in &report.plans_by_reason {
        table.add_row(vec![Cell::new(reason), count_cell(*count, Color::Red)]);
    }
    println!(
        "Integrity: removed {} of {} person-plans ({} trips, {} attribute rows)",
        report.removed_plans,
        report.checked_plans,
        report.removed_trips,
        report.removed_attribute_rows
    );
    println!("{table}");
    println!("Excluded: {}", report.sample(DEFAULT_SAMPLE_SIZE));
}

pub fn print_template_check(check: &TemplateCheck) {
    if check.is_complete() {
        println!("Template: all required columns present");
        return;
    }
    println!("Template: required columns missing");
    if !check.missing_attribute_columns.is_empty() {
        println!(
            "  attributes: {}",
            format_sample(&check.missing_attribute_columns, usize::MAX)
        );
    }
    if !check.missing_trip_columns.is_empty() {
        println!(
            "  trips: {}",
            format_sample(&check.missing_trip_columns, usize::MAX)
        );
    }
}

pub fn print_comparisons(comparisons: &[TableComparison], max_values: usize) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Reference"),
        header_cell("Finding"),
    ]);
    apply_table_style(&mut table);
    for comparison in comparisons {
        let lines = comparison.lines(max_values);
        if lines.is_empty() {
            table.add_row(vec![
                name_cell(&comparison.name),
                Cell::new(&comparison.reference),
                Cell::new("match").fg(Color::Green),
            ]);
            continue;
        }
        for line in lines {
            table.add_row(vec![
                name_cell(&comparison.name),
                Cell::new(&comparison.reference),
                Cell::new(line),
            ]);
        }
    }
    println!("{table}");
}

pub fn print_codebook(codebooks: &ResolvedCodebooks) {
    println!("Year: {}", codebooks.year());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Raw"),
        header_cell("Value"),
    ]);
    apply_table_style(&mut table);
    for codebook in codebooks.value_fields() {
        for (raw, value) in codebook.entries() {
            table.add_row(vec![
                name_cell(codebook.field()),
                Cell::new(raw),
                Cell::new(value),
            ]);
        }
    }
    println!("{table}");
    if let Ok(mappings) = codebooks.column_mappings() {
        println!("Column mappings: {}", mappings.len());
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn name_cell(name: &str) -> Cell {
    Cell::new(name)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn written_cell(written: bool) -> Cell {
    if written {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
