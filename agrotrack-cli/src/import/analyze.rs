//! Workbook survey before an import
//!
//! Reports, per sheet, whether it lists farmers or agro-processors, where its
//! header sits and how many data rows follow, without touching a backend.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use super::reader::{CellValue, Sheet, SheetRole, SheetSelection, read_sheets, sheet_role};
use crate::types::RecordKind;

/// Rows searched for a header when surveying
pub const SURVEY_SCAN_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetAnalysis {
    pub name: String,
    pub role: SheetRole,
    /// 0-based; `None` when no row in the window has a "name" column
    pub header_row: Option<usize>,
    pub headers: Vec<String>,
    /// Non-blank rows below the header
    pub data_rows: usize,
}

impl SheetAnalysis {
    /// Kind of record this sheet would contribute, if any
    pub fn importable_kind(&self) -> Option<RecordKind> {
        self.header_row.and(self.role.kind())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookAnalysis {
    pub source: String,
    pub sheets: Vec<SheetAnalysis>,
    pub farmers: usize,
    pub processors: usize,
}

fn has_name_column(row: &[CellValue]) -> bool {
    row.iter().any(|cell| cell.to_text().to_lowercase().contains("name"))
}

pub fn analyze_sheet(sheet: &Sheet, scan_rows: usize) -> SheetAnalysis {
    let header_row = sheet
        .rows
        .iter()
        .take(scan_rows)
        .position(|row| has_name_column(row));

    let (headers, data_rows) = match header_row {
        Some(row) => {
            let headers = sheet.rows[row]
                .iter()
                .map(CellValue::to_text)
                .filter(|label| !label.is_empty())
                .collect();
            let data_rows = sheet.rows[row + 1..]
                .iter()
                .filter(|cells| !cells.iter().all(CellValue::is_empty))
                .count();
            (headers, data_rows)
        }
        None => (Vec::new(), 0),
    };

    SheetAnalysis {
        name: sheet.name.clone(),
        role: sheet_role(&sheet.name),
        header_row,
        headers,
        data_rows,
    }
}

pub fn analyze_workbook<P: AsRef<Path>>(path: P, scan_rows: usize) -> Result<WorkbookAnalysis> {
    let path = path.as_ref();
    let sheets = read_sheets(path, &SheetSelection::All)?;

    let sheets: Vec<SheetAnalysis> = sheets
        .iter()
        .map(|sheet| analyze_sheet(sheet, scan_rows))
        .collect();

    let total = |kind: RecordKind| -> usize {
        sheets
            .iter()
            .filter(|s| s.importable_kind() == Some(kind))
            .map(|s| s.data_rows)
            .sum()
    };
    let farmers = total(RecordKind::Farmer);
    let processors = total(RecordKind::AgroProcessor);

    Ok(WorkbookAnalysis {
        source: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string()),
        sheets,
        farmers,
        processors,
    })
}
