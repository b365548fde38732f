//! Markdown and JSON report generation.
//!
//! Each view becomes a section and each panel a table of its rows, with the
//! chart roles noted above the table.

use super::{Report, ReportMetadata};
use crate::engine::{AggregateRow, DerivedValue};
use crate::views::{ChartKind, Panel, View};
use anyhow::Result;

/// Cell text for an undefined value.
const UNDEFINED: &str = "n/a";

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# PhonePe Pulse Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(&report.views));

    for view in &report.views {
        output.push_str(&generate_view_section(view));
    }

    output.push_str(&generate_footer());
    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data Source:** {}\n", metadata.data_source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    match metadata.year {
        Some(year) => section.push_str(&format!("- **Year:** {}\n", year)),
        None => section.push_str("- **Year:** latest available\n"),
    }
    if let Some(ref state) = metadata.state {
        section.push_str(&format!("- **State:** {}\n", state));
    }
    section.push_str(&format!("- **Ranking Size:** {}\n", metadata.top_n));
    section.push_str(&format!(
        "- **Build Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn anchor(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect::<String>()
        .replace(' ', "-")
}

/// Generate the table of contents.
fn generate_table_of_contents(views: &[View]) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    for view in views {
        toc.push_str(&format!("- [{}](#{})\n", view.title, anchor(&view.title)));
    }
    toc.push('\n');

    toc
}

/// Generate one view section.
fn generate_view_section(view: &View) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", view.title));
    for panel in &view.panels {
        section.push_str(&generate_panel_block(panel));
    }

    section
}

/// Generate the block for a single panel.
fn generate_panel_block(panel: &Panel) -> String {
    let mut block = String::new();
    let chart = &panel.chart;

    block.push_str(&format!("### {}\n\n", panel.title));

    if chart.kind == ChartKind::Metric {
        let value = chart
            .rows
            .first()
            .and_then(|row| column_value(row, &chart.y))
            .unwrap_or_else(|| UNDEFINED.to_string());
        block.push_str(&format!("- **{}**\n\n", value));
        return block;
    }

    let mut roles = format!("*{:?} chart", chart.kind);
    if let Some(ref x) = chart.x {
        roles.push_str(&format!(" | x: `{}`", x));
    }
    roles.push_str(&format!(" | y: `{}`", chart.y));
    if let Some(ref color) = chart.color {
        roles.push_str(&format!(" | color: `{}`", color));
    }
    roles.push_str("*\n\n");
    block.push_str(&roles);

    if panel.is_empty() {
        block.push_str("No data for this selection.\n\n");
        return block;
    }

    block.push_str(&generate_table(&chart.rows));
    block
}

/// Column names of a row, in output order.
fn column_names(row: &AggregateRow) -> Vec<String> {
    let mut names: Vec<String> = row
        .dimensions()
        .iter()
        .map(|(d, _)| d.name().to_string())
        .collect();
    names.extend(row.measures().iter().map(|(m, _)| m.name().to_string()));
    names.extend(row.derived().iter().map(|(n, _)| n.clone()));
    names
}

/// Escape text for a Markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Rendered value of a named column, or `None` if the row has no such column.
fn column_value(row: &AggregateRow, column: &str) -> Option<String> {
    if let Some((_, v)) = row.dimensions().iter().find(|(d, _)| d.name() == column) {
        return Some(escape_cell(&v.to_string()));
    }
    if let Some((_, v)) = row.measures().iter().find(|(m, _)| m.name() == column) {
        return Some(format_number(*v));
    }
    row.derived_value(column).map(|value| match value {
        DerivedValue::Number(Some(v)) => format_number(v),
        DerivedValue::Category(Some(q)) => q.to_string(),
        DerivedValue::Number(None) | DerivedValue::Category(None) => UNDEFINED.to_string(),
    })
}

/// Generate a Markdown table of rows sharing one shape.
fn generate_table(rows: &[AggregateRow]) -> String {
    let mut table = String::new();
    let Some(first) = rows.first() else {
        return table;
    };
    let columns = column_names(first);

    table.push_str(&format!("| {} |\n", columns.join(" | ")));
    table.push_str(&format!(
        "|{}\n",
        columns.iter().map(|_| ":---|").collect::<String>()
    ));

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| column_value(row, c).unwrap_or_else(|| UNDEFINED.to_string()))
            .collect();
        table.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    table.push('\n');

    table
}

/// Format a number with thousands separators; whole numbers drop the
/// fraction, others keep two decimals.
pub fn format_number(value: f64) -> String {
    let rounded = if value.fract() == 0.0 {
        format!("{:.0}", value.abs())
    } else {
        format!("{:.2}", value.abs())
    };
    let (int_part, frac_part) = match rounded.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (rounded, None),
    };

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by pulsedash*\n");

    footer
}

/// Generate a JSON report. Undefined cells serialize as `null`.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Field, Quadrant};
    use crate::models::{DimValue, Dimension, Measure};
    use crate::views::ViewKind;
    use chrono::Utc;

    fn state_row(state: &str, amount: f64) -> AggregateRow {
        AggregateRow::new(
            vec![(Dimension::State, DimValue::from(state))],
            vec![(Measure::TxnAmount, amount)],
        )
    }

    fn create_test_report() -> Report {
        let rows = vec![
            state_row("Assam", 1234567.0)
                .with_derived("growth_pct", DerivedValue::Number(Some(12.5))),
            state_row("Goa", 10.0).with_derived("growth_pct", DerivedValue::Number(None)),
        ];

        Report {
            metadata: ReportMetadata {
                data_source: "snapshot test.json".to_string(),
                generated_at: Utc::now(),
                year: Some(2022),
                state: None,
                top_n: 10,
                duration_seconds: 0.5,
            },
            views: vec![View {
                kind: ViewKind::Market,
                title: ViewKind::Market.title().to_string(),
                panels: vec![
                    Panel::metric(
                        "total",
                        "Total Transaction Amount",
                        &Measure::TxnAmount.into(),
                        AggregateRow::new(Vec::new(), vec![(Measure::TxnAmount, 9590.0)]),
                    ),
                    Panel::bar(
                        "growth",
                        "Fastest Growing States",
                        Dimension::State,
                        &Field::derived("growth_pct"),
                        None,
                        rows,
                    ),
                    Panel::bar(
                        "empty",
                        "Nothing Here",
                        Dimension::State,
                        &Measure::TxnAmount.into(),
                        None,
                        Vec::new(),
                    ),
                ],
            }],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report());

        assert!(markdown.contains("# PhonePe Pulse Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("- **Year:** 2022"));
        assert!(markdown.contains("- [Market Expansion](#market-expansion)"));
        assert!(markdown.contains("## Market Expansion"));
        assert!(markdown.contains("- **9,590**"));
        assert!(markdown.contains("| state | txn_amount | growth_pct |"));
        assert!(markdown.contains("| Assam | 1,234,567 | 12.50 |"));
        assert!(markdown.contains("| Goa | 10 | n/a |"));
        assert!(markdown.contains("No data for this selection."));
    }

    #[test]
    fn test_chart_roles_line() {
        let report = create_test_report();
        let block = generate_panel_block(&report.views[0].panels[1]);
        assert!(block.contains("*Bar chart | x: `state` | y: `growth_pct`*"));
    }

    #[test]
    fn test_category_cells() {
        let row = state_row("Bihar", 1.0)
            .with_derived("category", DerivedValue::Category(Some(Quadrant::HighLow)));
        assert_eq!(column_value(&row, "category"), Some("High-Low".to_string()));
        assert_eq!(column_value(&row, "missing"), None);
    }

    #[test]
    fn test_pipe_in_cell_is_escaped() {
        let rows = vec![state_row("Dadra | Nagar Haveli", 5.0)];
        let table = generate_table(&rows);
        assert!(table.contains("| Dadra \\| Nagar Haveli | 5 |"));
        assert_eq!(table.lines().nth(2).map(|l| l.matches(" | ").count()), Some(1));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(1000.0), "1,000");
        assert_eq!(format_number(1234567.891), "1,234,567.89");
        assert_eq!(format_number(-2500.5), "-2,500.50");
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report()).unwrap();

        assert!(json.contains("\"data_source\""));
        assert!(json.contains("\"kind\": \"market\""));
        assert!(json.contains("\"growth_pct\": null"));
        assert!(json.contains("\"kind\": \"bar\""));
    }
}
