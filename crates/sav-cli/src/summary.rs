use std::fmt::Write as _;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use sav_repair::{ChangeReport, LaneAxis, SaveSummary};

use crate::commands::RunOutcome;

pub fn print_outcome(outcome: &RunOutcome, details: bool) {
    println!("Save: {}", outcome.save.display());
    print_junction_table(&outcome.report);
    println!("{}", counts_table(&outcome.report));
    if details && !outcome.report.entries().is_empty() {
        print!("{}", details_text(&outcome.report));
    }
    if !outcome.report.warnings().is_empty() {
        eprintln!("Warnings:");
        for warning in outcome.report.warnings() {
            eprintln!("- {warning}");
        }
    }
    match (&outcome.backup, outcome.written) {
        (Some(backup), true) => {
            println!("Wrote {} (backup: {})", outcome.save.display(), backup.display());
        }
        (_, true) => println!("Wrote {}", outcome.save.display()),
        (_, false) if outcome.report.is_empty() => println!("Nothing to write."),
        (_, false) if outcome.applied => println!("Save left unchanged."),
        (_, false) => println!("Dry run; pass --apply to write the changes."),
    }
    if let Some(path) = &outcome.json {
        println!("JSON: {}", path.display());
    }
}

fn print_junction_table(report: &ChangeReport) {
    if report.junctions().is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Junction"),
        header_cell("Kind"),
        header_cell("Axis"),
        header_cell("Spread X"),
        header_cell("Spread Y"),
        header_cell("Ends"),
        header_cell("Lanes"),
    ]);
    apply_summary_table_style(&mut table);
    for column in 3..=6 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for junction in report.junctions() {
        table.add_row(vec![
            Cell::new(junction.id)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(junction.kind),
            axis_cell(junction.axis),
            Cell::new(format!("{:.1}", junction.spread.x)),
            Cell::new(format!("{:.1}", junction.spread.y)),
            Cell::new(junction.touches),
            Cell::new(junction.lanes),
        ]);
    }
    println!("{table}");
}

/// Totals of a run as a two-column table.
pub fn counts_table(report: &ChangeReport) -> Table {
    let counts = report.counts();
    let mut table = Table::new();
    table.set_header(vec![header_cell("Change"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (label, count) in [
        ("Junctions repaired", counts.junctions_repaired),
        ("Poles created", counts.poles_created),
        ("References rewritten", counts.references_rewritten),
        ("Entities deleted", counts.entities_deleted),
        ("Fragments patched", counts.fragments_patched),
        ("Connectors removed", counts.connectors_removed),
    ] {
        table.add_row(vec![Cell::new(label), count_cell(count)]);
    }
    table
}

/// One line per change entry, for `--details`.
pub fn details_text(report: &ChangeReport) -> String {
    let mut out = String::from("Changes:\n");
    for entry in report.entries() {
        let _ = writeln!(out, "  {entry}");
    }
    out
}

pub fn print_inspect(summary: &SaveSummary) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Item"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let mut rows = vec![
        ("File bytes".to_string(), summary.file_len),
        ("Payload bytes".to_string(), summary.payload_len),
        ("Records".to_string(), summary.records),
        ("Entities".to_string(), summary.entities),
        ("Splines".to_string(), summary.splines),
        ("Junctions".to_string(), summary.junction_total()),
    ];
    rows.extend(
        summary
            .junctions
            .iter()
            .map(|(kind, count)| (format!("  -> {kind}"), *count)),
    );
    rows.extend([
        ("Junctions with lane ends".to_string(), summary.junctions_touched),
        ("Invisible poles".to_string(), summary.poles),
        ("Drones".to_string(), summary.drones),
        ("Connector entries".to_string(), summary.connectors),
        ("Dangling splines".to_string(), summary.dangling_splines),
    ]);
    for (label, count) in rows {
        let label_cell = if label.starts_with("  ->") {
            dim_cell(label)
        } else {
            Cell::new(label)
        };
        table.add_row(vec![label_cell, Cell::new(count)]);
    }
    println!("{table}");
    if summary.junctions_touched > 0 {
        println!(
            "{} junction(s) still carry lane ends; run `fix` to repair them.",
            summary.junctions_touched
        );
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(80);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn axis_cell(axis: LaneAxis) -> Cell {
    match axis {
        LaneAxis::X => Cell::new(axis).fg(Color::Magenta),
        LaneAxis::Y => Cell::new(axis).fg(Color::Green),
    }
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
