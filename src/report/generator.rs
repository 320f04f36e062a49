//! Report generation.
//!
//! This module generates Markdown, JSON and CSV reports from the
//! cumulative top-N tables.

use crate::cli::OutputFormat;
use crate::error::{PoseStatError, Result};
use crate::models::{CumulativeTable, LabeledTable, Report, ReportMetadata, Thresholds};

/// Attach display labels to tables in output order.
///
/// `per_input` holds the tables of each input file, already in tag order.
/// With no labels each tag names itself; otherwise there must be exactly
/// one label per table.
pub fn assign_labels(
    per_input: Vec<(String, Vec<CumulativeTable>)>,
    labels: &[String],
) -> Result<Vec<LabeledTable>> {
    let total: usize = per_input.iter().map(|(_, tables)| tables.len()).sum();

    if !labels.is_empty() && labels.len() != total {
        return Err(PoseStatError::InvalidInput(format!(
            "{} names given for {} tags",
            labels.len(),
            total
        )));
    }

    let mut names = labels.iter();
    let labeled = per_input
        .into_iter()
        .flat_map(|(source, tables)| {
            tables.into_iter().map(move |table| (source.clone(), table))
        })
        .map(|(source, table)| LabeledTable {
            label: names.next().cloned().unwrap_or_else(|| table.tag.clone()),
            source,
            table,
        })
        .collect();

    Ok(labeled)
}

/// Render a report in the requested format.
pub fn render_report(report: &Report, format: OutputFormat, precision: usize) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_markdown_report(report, precision)),
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Csv => generate_csv_report(report),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, precision: usize) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# PoseBench Top-N Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(report, precision));
    output.push_str(&generate_tables_section(
        &report.tables,
        &report.metadata.thresholds,
        precision,
    ));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    let inputs: Vec<String> = metadata.inputs.iter().map(|i| format!("`{}`", i)).collect();
    section.push_str(&format!("- **Inputs:** {}\n", inputs.join(", ")));
    section.push_str(&format!(
        "- **Expected Systems per Tag:** {}\n",
        metadata.expected_systems
    ));
    section.push_str(&format!(
        "- **RMSD Thresholds:** {}\n",
        metadata.thresholds
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the summary at the highlighted pose counts.
///
/// Each cell holds the middle-threshold percentage with the tighter and
/// looser thresholds as bounds.
fn generate_summary_section(report: &Report, precision: usize) -> String {
    let mut section = String::new();
    let thresholds = &report.metadata.thresholds;
    let poses = &report.metadata.report_poses;

    section.push_str("## Summary\n\n");

    if report.tables.is_empty() {
        section.push_str("No tags were found in the input.\n\n");
        return section;
    }

    section.push_str(&format!(
        "Percent of systems with a pose {} among the top N poses \
         (bounds: {} / {}).\n\n",
        thresholds.label(1),
        thresholds.label(0),
        thresholds.label(2)
    ));

    section.push_str("| Name | Tag | Systems | Max Poses |");
    for n in poses {
        section.push_str(&format!(" Top {} |", n));
    }
    section.push('\n');
    section.push_str("|:---|:---|:---:|:---:|");
    for _ in poses {
        section.push_str(":---:|");
    }
    section.push('\n');

    for labeled in &report.tables {
        let table = &labeled.table;
        section.push_str(&format!(
            "| {} | `{}` | {} | {} |",
            labeled.label, table.tag, table.systems, table.max_poses
        ));
        for n in poses {
            let cell = match table.at(*n) {
                Some(row) => format!(
                    "{:.p$} ({:.p$} / {:.p$})",
                    row.pct_within_2,
                    row.pct_within_1,
                    row.pct_within_3,
                    p = precision
                ),
                None => "-".to_string(),
            };
            section.push_str(&format!(" {} |", cell));
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

/// Generate one cumulative table per tag.
fn generate_tables_section(
    tables: &[LabeledTable],
    thresholds: &Thresholds,
    precision: usize,
) -> String {
    let mut section = String::new();

    if tables.is_empty() {
        return section;
    }

    section.push_str("## Cumulative Tables\n\n");

    for labeled in tables {
        section.push_str(&format!(
            "### {} (`{}`)\n\n",
            labeled.label, labeled.table.tag
        ));
        section.push_str(&format!(
            "*Source: {} | Systems: {} | Max Poses: {}*\n\n",
            labeled.source, labeled.table.systems, labeled.table.max_poses
        ));

        section.push_str(&format!(
            "| Top N | {} | {} | {} |\n",
            thresholds.label(0),
            thresholds.label(1),
            thresholds.label(2)
        ));
        section.push_str("|:---:|:---:|:---:|:---:|\n");

        for row in &labeled.table.rows {
            let cells: Vec<String> = row
                .percentages()
                .iter()
                .map(|pct| format!("{:.p$}", pct, p = precision))
                .collect();
            section.push_str(&format!("| {} | {} |\n", row.n, cells.join(" | ")));
        }
        section.push('\n');
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by PoseBench v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map_err(|e| PoseStatError::InvalidInput(format!("cannot serialize report: {}", e)))
}

/// Generate a CSV report with one row per tag and pose count.
pub fn generate_csv_report(report: &Report) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "label",
        "tag",
        "n",
        "pct_within_1",
        "pct_within_2",
        "pct_within_3",
    ])?;

    for labeled in &report.tables {
        for row in &labeled.table.rows {
            writer.write_record([
                labeled.label.clone(),
                labeled.table.tag.clone(),
                row.n.to_string(),
                row.pct_within_1.to_string(),
                row.pct_within_2.to_string(),
                row.pct_within_3.to_string(),
            ])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PoseStatError::Io(e.into_error()))?;

    String::from_utf8(bytes)
        .map_err(|e| PoseStatError::InvalidInput(format!("report is not UTF-8: {}", e)))
}
