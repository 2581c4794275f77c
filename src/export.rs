//! CSV / XLSX export of the current table, and the category filter for filtered exports.

use crate::chart_data::{numeric_values, text_values};
use crate::classify::ColumnClasses;
use crate::error::ExportError;
use crate::statistics::{DescribeTable, DESCRIBE_ROWS};
use crate::table::{ColumnKind, Table};
use chrono::NaiveDateTime;
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DATA_SHEET: &str = "Data";
pub const STATISTICS_SHEET: &str = "Statistics";

/// `YYYYMMDD_HHMMSS`, the suffix of every export filename.
pub fn export_timestamp(at: &NaiveDateTime) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Keep rows whose value in `column` is one of `values`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub values: Vec<String>,
}

impl RowFilter {
    pub fn new(column: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            column: column.into(),
            values,
        }
    }

    /// An empty selection offers no filtered export.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn require_categorical(table: &Table, column: &str) -> Result<(), ExportError> {
    match table.column_kind(column) {
        Some(ColumnKind::Text) => Ok(()),
        _ => Err(ExportError::InvalidFilterColumn(column.to_string())),
    }
}

/// Selectable values of a categorical column, in first-appearance order.
pub fn unique_values(table: &Table, column: &str) -> Result<Vec<String>, ExportError> {
    require_categorical(table, column)?;
    let mut seen: Vec<String> = Vec::new();
    for value in text_values(table, column)?.into_iter().flatten() {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    Ok(seen)
}

pub fn filter_rows(table: &Table, filter: &RowFilter) -> Result<Table, ExportError> {
    require_categorical(table, &filter.column)?;
    let keep: Vec<bool> = text_values(table, &filter.column)?
        .iter()
        .map(|v| v.as_ref().is_some_and(|s| filter.values.contains(s)))
        .collect();
    let mask = BooleanChunked::new("mask".into(), keep.as_slice());
    Ok(Table::new(table.frame().filter(&mask)?))
}

/// Header plus rows, no index column.
pub fn to_csv_bytes(table: &Table, delimiter: u8) -> Result<Vec<u8>, ExportError> {
    let mut df = table.frame().clone();
    let mut buf: Vec<u8> = Vec::new();
    CsvWriter::new(&mut buf)
        .with_separator(delimiter)
        .include_header(true)
        .finish(&mut df)?;
    Ok(buf)
}

// Out-of-range positions saturate; the writer rejects them with its own limit error.
fn cell_pos(row: usize, col: usize) -> (u32, u16) {
    (
        u32::try_from(row).unwrap_or(u32::MAX),
        u16::try_from(col).unwrap_or(u16::MAX),
    )
}

fn data_sheet(table: &Table) -> Result<Worksheet, ExportError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(DATA_SHEET)?;
    let header = Format::new().set_bold();

    for (c, info) in table.columns().iter().enumerate() {
        let (r0, col) = cell_pos(0, c);
        sheet.write_string_with_format(r0, col, &info.name, &header)?;

        match info.kind {
            ColumnKind::Integer | ColumnKind::Float => {
                for (r, value) in numeric_values(table, &info.name)?.iter().enumerate() {
                    if let Some(v) = value.filter(|v| v.is_finite()) {
                        let (row, col) = cell_pos(r + 1, c);
                        sheet.write_number(row, col, v)?;
                    }
                }
            }
            ColumnKind::Boolean => {
                let values = table.frame().column(&info.name)?.bool()?.clone();
                for (r, value) in values.iter().enumerate() {
                    if let Some(v) = value {
                        let (row, col) = cell_pos(r + 1, c);
                        sheet.write_boolean(row, col, v)?;
                    }
                }
            }
            _ => {
                for (r, value) in text_values(table, &info.name)?.iter().enumerate() {
                    if let Some(v) = value {
                        let (row, col) = cell_pos(r + 1, c);
                        sheet.write_string(row, col, v)?;
                    }
                }
            }
        }
    }
    Ok(sheet)
}

/// Describe table laid out with statistic names down column A and one column per numeric column.
fn statistics_sheet(describe: &DescribeTable) -> Result<Worksheet, ExportError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(STATISTICS_SHEET)?;
    let bold = Format::new().set_bold();

    for (c, summary) in describe.columns.iter().enumerate() {
        let (r0, col) = cell_pos(0, c + 1);
        sheet.write_string_with_format(r0, col, &summary.name, &bold)?;
    }
    for (r, label) in DESCRIBE_ROWS.iter().enumerate() {
        let (row, c0) = cell_pos(r + 1, 0);
        sheet.write_string_with_format(row, c0, *label, &bold)?;
        for (c, summary) in describe.columns.iter().enumerate() {
            if let Some(v) = summary.row(r).filter(|v| v.is_finite()) {
                let (row, col) = cell_pos(r + 1, c + 1);
                sheet.write_number(row, col, v)?;
            }
        }
    }
    Ok(sheet)
}

/// Workbook with a `Data` sheet and, when given, a `Statistics` sheet.
pub fn to_xlsx_bytes(table: &Table, describe: Option<&DescribeTable>) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    workbook.push_worksheet(data_sheet(table)?);
    if let Some(describe) = describe.filter(|d| !d.columns.is_empty()) {
        workbook.push_worksheet(statistics_sheet(describe)?);
    }
    Ok(workbook.save_to_buffer()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Csv,
    Xlsx,
    FilteredCsv,
}

impl ArtifactKind {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Csv | Self::FilteredCsv => "text/csv",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Button label in the export view.
    pub fn label(self) -> &'static str {
        match self {
            Self::Csv => "Download as CSV",
            Self::Xlsx => "Download as Excel",
            Self::FilteredCsv => "Download Filtered Data",
        }
    }
}

/// A named, fully built download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub kind: ArtifactKind,
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Data rows contained in the artifact
    pub rows: usize,
}

impl ExportArtifact {
    /// Write the artifact into `dir`, creating it if needed. Returns the written path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        info!(file = %path.display(), bytes = self.bytes.len(), "export written");
        Ok(path)
    }
}

/// Everything the export view offers for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBundle {
    pub csv: ExportArtifact,
    pub xlsx: ExportArtifact,
    /// Present when a filter with at least one selected value was given
    pub filtered: Option<ExportArtifact>,
}

impl ExportBundle {
    pub fn build(
        table: &Table,
        filter: Option<&RowFilter>,
        at: &NaiveDateTime,
    ) -> Result<Self, ExportError> {
        Self::build_with_delimiter(table, filter, at, b',')
    }

    pub fn build_with_delimiter(
        table: &Table,
        filter: Option<&RowFilter>,
        at: &NaiveDateTime,
        delimiter: u8,
    ) -> Result<Self, ExportError> {
        let stamp = export_timestamp(at);
        let classes = ColumnClasses::of(table);
        let describe = if classes.has_numeric() {
            Some(DescribeTable::compute(table, &classes.numeric)?)
        } else {
            None
        };

        let csv = ExportArtifact {
            kind: ArtifactKind::Csv,
            filename: format!("dashboard_export_{}.csv", stamp),
            bytes: to_csv_bytes(table, delimiter)?,
            rows: table.row_count(),
        };
        let xlsx = ExportArtifact {
            kind: ArtifactKind::Xlsx,
            filename: format!("dashboard_export_{}.xlsx", stamp),
            bytes: to_xlsx_bytes(table, describe.as_ref())?,
            rows: table.row_count(),
        };
        let filtered = match filter.filter(|f| !f.is_empty()) {
            Some(filter) => {
                let subset = filter_rows(table, filter)?;
                Some(ExportArtifact {
                    kind: ArtifactKind::FilteredCsv,
                    filename: format!("dashboard_filtered_{}.csv", stamp),
                    bytes: to_csv_bytes(&subset, delimiter)?,
                    rows: subset.row_count(),
                })
            }
            None => None,
        };

        Ok(Self {
            csv,
            xlsx,
            filtered,
        })
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &ExportArtifact> + '_ {
        [&self.csv, &self.xlsx].into_iter().chain(self.filtered.as_ref())
    }
}
