//! Rendering of command results as JSON or fixed-width tables

use crate::search_ads::resources::{Campaign, ReportingDataResponse, SpendRow, UserAcl};
use crate::search_ads::types::{ApiError, AsaError};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Table,
}

/// Table column: header text and maximum cell width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub header: &'static str,
    pub width: usize,
}

impl Column {
    pub const fn new(header: &'static str, width: usize) -> Self {
        Self { header, width }
    }
}

/// Something that can be shown as one table row
pub trait TableRow {
    fn columns() -> Vec<Column>;
    fn cells(&self) -> Vec<String>;
}

impl TableRow for Campaign {
    fn columns() -> Vec<Column> {
        vec![
            Column::new("ID", 12),
            Column::new("NAME", 32),
            Column::new("STATUS", 10),
            Column::new("SERVING STATUS", 16),
            Column::new("DAILY BUDGET", 16),
            Column::new("COUNTRIES", 20),
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.status.clone().unwrap_or_default(),
            self.serving_status.clone().unwrap_or_default(),
            self.daily_budget_amount
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            self.countries_or_regions.join(","),
        ]
    }
}

impl TableRow for UserAcl {
    fn columns() -> Vec<Column> {
        vec![
            Column::new("ORG NAME", 30),
            Column::new("ORG ID", 15),
            Column::new("CURRENCY", 10),
            Column::new("ROLES", 40),
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.org_name.clone(),
            self.org_id.to_string(),
            self.currency.clone(),
            self.role_names.join(", "),
        ]
    }
}

/// Pretty-printed JSON
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AsaError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AsaError::Transport(ApiError::Parse(format!("Failed to render JSON: {}", e))))
}

/// Fixed-width table; cells longer than their column are cut with `...`
pub fn render_table<R: TableRow>(rows: &[R]) -> String {
    let columns = R::columns();
    let mut out = String::new();

    let header: Vec<String> = columns.iter().map(|c| c.header.to_string()).collect();
    push_line(&mut out, &columns, &header);
    let rule: Vec<String> = columns.iter().map(|c| "-".repeat(c.width)).collect();
    push_line(&mut out, &columns, &rule);

    for row in rows {
        push_line(&mut out, &columns, &row.cells());
    }
    out
}

fn push_line(out: &mut String, columns: &[Column], cells: &[String]) {
    let line = columns
        .iter()
        .zip(cells)
        .map(|(column, cell)| format!("{:<width$}", truncate(cell, column.width), width = column.width))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(cell: &str, width: usize) -> String {
    if cell.chars().count() <= width {
        return cell.to_string();
    }
    if width <= 3 {
        return cell.chars().take(width).collect();
    }
    let mut cut: String = cell.chars().take(width - 3).collect();
    cut.push_str("...");
    cut
}

/// Render a list in the requested format
pub fn render_list<R: TableRow + Serialize>(format: OutputFormat, rows: &[R]) -> Result<String, AsaError> {
    match format {
        OutputFormat::Json => render_json(rows),
        OutputFormat::Table => Ok(render_table(rows)),
    }
}

/// Human-readable report: metadata, totals and per-date metrics per row
pub fn render_report(report: &ReportingDataResponse) -> String {
    if report.row.is_empty() {
        return "No report data.\n".to_string();
    }

    let mut out = String::new();
    for row in &report.row {
        if !row.metadata.is_empty() {
            let meta = row
                .metadata
                .iter()
                .map(|(key, value)| format!("{}: {}", key, value))
                .collect::<Vec<_>>()
                .join("  ");
            let _ = writeln!(out, "{}", meta);
        }
        if let Some(total) = &row.total {
            push_metrics(&mut out, total);
        }
        for bucket in &row.granularity {
            let _ = writeln!(out, "  Date: {}", bucket.date);
            push_metrics(&mut out, &bucket.metrics);
        }
        out.push_str("---\n");
    }

    if let Some(total) = report.grand_totals.as_ref().and_then(|g| g.total.as_ref()) {
        out.push_str("\nGRAND TOTALS:\n");
        push_metrics(&mut out, total);
    }
    out
}

fn push_metrics(out: &mut String, m: &SpendRow) {
    let _ = writeln!(
        out,
        "  Impressions: {} | Taps: {} | Installs: {} (tap: {}, view: {}) | NewDL: {} | Redownloads: {}",
        m.impressions,
        m.taps,
        m.total_installs,
        m.tap_installs,
        m.view_installs,
        m.total_new_downloads,
        m.total_redownloads
    );
    let _ = writeln!(
        out,
        "  TTR: {:.4} | InstallRate: {:.4} (tap: {:.4}) | CPI: {} | AvgCPT: {} | Spend: {}",
        m.ttr,
        m.total_install_rate,
        m.tap_install_rate,
        m.total_avg_cpi,
        m.avg_cpt,
        m.local_spend
    );
}
