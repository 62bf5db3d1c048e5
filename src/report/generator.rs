//! Markdown and JSON report generation.
//!
//! This module turns one dashboard update into a document: metadata, the
//! effective filters, and the period × contact-type table (or the no-data
//! notice).

use crate::models::{AppliedFilters, FilterOptions, PivotTable, Report, ReportMetadata, Reshaped};
use anyhow::{Context, Result};
use std::path::Path;

/// Notice shown instead of a table or chart when nothing matches.
pub const NO_DATA_MESSAGE: &str = "No data to display for the selected filters.";

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Violations Dashboard\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_filters_section(&report.metadata.filters));
    output.push_str(&generate_table_section(&report.result));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Records Loaded:** {}\n",
        metadata.records_loaded
    ));
    section.push_str(&format!(
        "- **Records Matched:** {}\n",
        metadata.records_matched
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the filters section.
fn generate_filters_section(filters: &AppliedFilters) -> String {
    let mut section = String::new();

    section.push_str("## Filters\n\n");
    section.push_str(&format!("- **Locations:** {}\n", filters.locations));
    section.push_str(&format!("- **Bicycle Type:** {}\n", filters.bicycle));
    section.push_str(&format!(
        "- **Date Range:** {} to {}\n",
        filters.start.format("%Y-%m-%d"),
        filters.end.format("%Y-%m-%d")
    ));
    section.push_str(&format!("- **Aggregation:** {}\n", filters.granularity));
    section.push('\n');

    section
}

/// Generate the table section, or the notice when there is nothing to show.
fn generate_table_section(result: &Reshaped) -> String {
    let mut section = String::new();

    section.push_str("## Violations by Contact Type\n\n");

    match result {
        Reshaped::Table(table) => section.push_str(&generate_pivot_table(table)),
        Reshaped::Empty => {
            section.push_str(&format!("> ⚠️ {}\n\n", NO_DATA_MESSAGE));
        }
    }

    section
}

/// Render the pivot table with a per-period total column and a totals row.
fn generate_pivot_table(table: &PivotTable) -> String {
    let mut out = String::new();

    out.push_str("| Period |");
    for contact in &table.contact_types {
        out.push_str(&format!(" {} |", escape_cell(contact)));
    }
    out.push_str(" Total |\n");

    out.push_str("|---|");
    for _ in &table.contact_types {
        out.push_str("---:|");
    }
    out.push_str("---:|\n");

    for ((period, row), total) in table
        .periods
        .iter()
        .zip(&table.counts)
        .zip(table.row_totals())
    {
        out.push_str(&format!("| {} |", period.format("%Y-%m-%d")));
        for count in row {
            out.push_str(&format!(" {} |", count));
        }
        out.push_str(&format!(" {} |\n", total));
    }

    out.push_str("| **Total** |");
    for total in table.column_totals() {
        out.push_str(&format!(" **{}** |", total));
    }
    out.push_str(&format!(" **{}** |\n\n", table.total()));

    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Generated by vdash v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

/// Write rendered report content to disk.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

/// Plain-text listing of the filter choices for the loaded data.
pub fn generate_options_text(options: &FilterOptions) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Records: {} ({} without a usable date)",
        options.record_count, options.undated_count
    ));
    lines.push(String::new());
    lines.push("Locations:".to_string());
    for location in &options.locations {
        lines.push(format!("  - {}", location));
    }
    lines.push(String::new());
    lines.push(format!("Bicycle types: {}", options.bicycle_types.join(", ")));

    let granularities: Vec<String> = options
        .granularities
        .iter()
        .map(|g| g.to_string())
        .collect();
    lines.push(format!("Aggregation: {}", granularities.join(", ")));

    match (options.default_start, options.default_end) {
        (Some(start), Some(end)) => lines.push(format!(
            "Date range: {} to {}",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )),
        _ => lines.push("Date range: (no dated records)".to_string()),
    }

    lines.join("\n")
}
