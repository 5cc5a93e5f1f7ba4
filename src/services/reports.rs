//! Pure transform from aggregation output to renderer input, plus the
//! in-crate renderers. PDF/XLSX/label generators are external collaborators
//! that consume the same [`ReportDocument`] through [`ReportRenderer`];
//! nothing here does I/O and nothing mutates its input, so concurrent calls
//! with different inputs are safe.

use std::str::FromStr;

use serde::Serialize;

use crate::errors::ServiceError;
use crate::services::aggregation::{AggregationResult, TallyEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Json,
}

impl FromStr for ReportFormat {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            other => Err(ServiceError::Validation(format!(
                "unsupported report format '{other}' (expected csv or json)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub entries: Vec<TallyEntry>,
}

/// Renderer-neutral report shape: a header, one table of per-employee rows,
/// and one section per tally.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub date_label: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub sections: Vec<ReportSection>,
}

pub fn build_document(agg: &AggregationResult) -> ReportDocument {
    let columns = ["Сотрудник", "Ланч-бокс", "Доп. 1", "Доп. 2"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows = agg
        .rows
        .iter()
        .map(|row| {
            vec![
                row.full_name.clone(),
                row.meal_box.clone(),
                row.extra1.clone().unwrap_or_default(),
                row.extra2.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let section = |title: &str, entries: &[TallyEntry]| ReportSection {
        title: title.to_string(),
        entries: entries.to_vec(),
    };
    ReportDocument {
        title: agg.org_name.clone(),
        date_label: agg.date.format("%Y-%m-%d").to_string(),
        columns,
        rows,
        sections: vec![
            section("Салаты", &agg.salads),
            section("Супы", &agg.soups),
            section("Запеканки и блины", &agg.zapekanka),
            section("Ланч-боксы", &agg.meal_boxes),
            section("Выпечка", &agg.pastry),
            section("Фрукты и напитки", &agg.fruit_and_drink),
        ],
    }
}

/// Seam for document generators. External PDF/XLSX renderers implement this
/// against the same document; the crate ships CSV and JSON.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>, ServiceError>;
    fn content_type(&self) -> &'static str;
    fn file_extension(&self) -> &'static str;
}

pub fn renderer_for(format: ReportFormat) -> Box<dyn ReportRenderer> {
    match format {
        ReportFormat::Csv => Box::new(CsvRenderer),
        ReportFormat::Json => Box::new(JsonRenderer),
    }
}

pub struct CsvRenderer;

impl ReportRenderer for CsvRenderer {
    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>, ServiceError> {
        let mut out = String::new();
        out.push_str(&csv_row(&[doc.title.as_str(), doc.date_label.as_str()]));
        out.push('\n');
        out.push_str(&csv_row(
            &doc.columns.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        ));
        for row in &doc.rows {
            out.push_str(&csv_row(
                &row.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
            ));
        }
        for section in &doc.sections {
            out.push('\n');
            out.push_str(&csv_row(&[section.title.as_str()]));
            for entry in &section.entries {
                out.push_str(&csv_row(&[
                    entry.name.as_str(),
                    &entry.count.to_string(),
                ]));
            }
        }
        Ok(out.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }
}

pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>, ServiceError> {
        serde_json::to_vec_pretty(doc)
            .map_err(|e| ServiceError::Internal(format!("encode report: {e}")))
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }
}

fn csv_row(cells: &[&str]) -> String {
    let mut row = cells.iter().map(|c| csv_cell(c)).collect::<Vec<_>>().join(",");
    row.push('\n');
    row
}

fn csv_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
