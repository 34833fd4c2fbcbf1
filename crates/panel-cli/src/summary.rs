use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use panel_model::CohortPolicy;

use crate::types::{FileReport, ProcessResult, ReconcileResult};

pub fn print_process_summary(result: &ProcessResult) {
    println!("Configuration: {}", result.config_name);
    if let Some(path) = &result.output {
        println!("Summaries: {}", path.display());
    }
    if let Some(path) = &result.diagnostics {
        println!("Diagnostics: {}", path.display());
    }

    let mut files = Table::new();
    files.set_header(vec![
        header_cell("File"),
        header_cell("Year"),
        header_cell("Policy"),
        header_cell("Seen"),
        header_cell("Aggregated"),
        header_cell("Cohort"),
        header_cell("Country"),
        header_cell("Network"),
        header_cell("Geo"),
        header_cell("No scores"),
        header_cell("Rows"),
    ]);
    apply_summary_table_style(&mut files);
    for index in 1..=10 {
        align_column(&mut files, index, CellAlignment::Right);
    }
    for file in &result.files {
        files.add_row(file_row(file));
    }
    println!("{files}");

    if !result.summaries.is_empty() {
        let mut rows = Table::new();
        rows.set_header(vec![
            header_cell("Geo"),
            header_cell("Region"),
            header_cell("Year"),
            header_cell("Grade"),
            header_cell("Composite"),
            header_cell("Std"),
            header_cell("Records"),
            header_cell("Public"),
            header_cell("Low conf."),
        ]);
        apply_table_style(&mut rows);
        for index in 4..=7 {
            align_column(&mut rows, index, CellAlignment::Right);
        }
        align_column(&mut rows, 8, CellAlignment::Center);
        for s in &result.summaries {
            rows.add_row(vec![
                Cell::new(&s.geo_unit)
                    .fg(Color::Blue)
                    .add_attribute(Attribute::Bold),
                Cell::new(&s.region),
                Cell::new(s.year),
                Cell::new(&s.grade_tag),
                Cell::new(format!("{:.1}", s.composite_mean)),
                Cell::new(format!("{:.1}", s.composite_stddev)),
                Cell::new(s.record_count),
                s.network_share
                    .map_or_else(|| dim_cell("-"), |share| Cell::new(format!("{:.0}%", share * 100.0))),
                if s.low_confidence {
                    Cell::new("yes").fg(Color::Yellow)
                } else {
                    dim_cell("no")
                },
            ]);
        }
        println!("{rows}");
    }

    let failed: Vec<&FileReport> = result.files.iter().filter(|f| f.error.is_some()).collect();
    if !failed.is_empty() {
        eprintln!("Errors:");
        for file in failed {
            if let Some(error) = &file.error {
                eprintln!("- {}: {error}", file.path.display());
            }
        }
    }
}

fn file_row(file: &FileReport) -> Vec<Cell> {
    let d = &file.diagnostics;
    let name = file
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.path.display().to_string());
    let name_cell = if file.error.is_some() {
        Cell::new(name).fg(Color::Red).add_attribute(Attribute::Bold)
    } else {
        Cell::new(name).add_attribute(Attribute::Bold)
    };
    vec![
        name_cell,
        Cell::new(d.year),
        policy_cell(d.cohort_filter_policy_used),
        Cell::new(d.total_records_seen),
        Cell::new(d.total_records_aggregated),
        count_cell(d.rejected_by_cohort, Color::Yellow),
        count_cell(d.rejected_by_country, Color::Yellow),
        count_cell(d.rejected_by_network, Color::Yellow),
        count_cell(d.unresolved_geo_value_count, Color::Red),
        count_cell(d.records_without_scores, Color::Yellow),
        Cell::new(file.rows),
    ]
}

pub fn print_panel_summary(result: &ReconcileResult) {
    if !result.raised.is_empty() {
        println!("Raised to region level: {}", result.raised.join(", "));
    }
    if !result.unmapped.is_empty() {
        eprintln!("Dropped keys without a region: {}", result.unmapped.join(", "));
    }
    if let Some(path) = &result.output {
        println!("Panel: {}", path.display());
    }

    let mut table = Table::new();
    let mut header = vec![header_cell("Key"), header_cell("Year")];
    header.extend(result.sources.iter().map(|source| header_cell(source)));
    table.set_header(header);
    apply_summary_table_style(&mut table);
    for index in 2..result.sources.len() + 2 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for row in &result.rows {
        let mut cells = vec![
            Cell::new(&row.key)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(row.year),
        ];
        for source in &result.sources {
            // Sources split by grade have their cells under NAME_GRADE.
            let values: Vec<String> = row
                .sources
                .iter()
                .filter(|(name, _)| *name == source || name.starts_with(&format!("{source}_")))
                .map(|(_, cell)| format!("{:.1}", cell.composite_mean))
                .collect();
            cells.push(if values.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(values.join(" / "))
            });
        }
        table.add_row(cells);
    }
    println!("{table}");
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
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn policy_cell(policy: Option<CohortPolicy>) -> Cell {
    match policy {
        Some(CohortPolicy::Strict) => Cell::new("STRICT").fg(Color::Green),
        Some(policy) => Cell::new(policy.as_str()).fg(Color::Yellow),
        None => dim_cell("-"),
    }
}

fn count_cell(count: u64, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
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
