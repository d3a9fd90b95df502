//! Read spreadsheet files into grids of typed cells
//!
//! Workbooks (.xlsx, .xlsm, .xls, .ods) are opened with calamine; .csv files
//! are read with the csv crate and treated as a single sheet.

use anyhow::{Context, Result, bail};
use calamine::{Data, Reader, open_workbook_auto};
use serde::Serialize;
use std::path::Path;

use crate::types::RecordKind;

/// A single spreadsheet cell, reduced to the types the importer cares about
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Convert a calamine cell. Date cells become their serial day count.
    pub fn from_data(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) if s.trim().is_empty() => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) => CellValue::Text(s.clone()),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(_) => CellValue::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// String form of the cell, trimmed.
    /// Whole numbers are written without a fractional part.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 {
                    (*n as i64).to_string()
                } else {
                    n.to_string()
                }
            }
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

/// One sheet as rows of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(CellValue::is_empty))
    }
}

/// Which sheets of a workbook to import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelection {
    /// The sheet whose name suits the record kind, else the first sheet
    Auto(RecordKind),
    Named(String),
    All,
}

/// What a sheet holds, judged from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetRole {
    Farmer,
    AgroProcessor,
    /// Statistics or summary tables, never imported automatically
    Summary,
}

impl SheetRole {
    pub fn kind(&self) -> Option<RecordKind> {
        match self {
            SheetRole::Farmer => Some(RecordKind::Farmer),
            SheetRole::AgroProcessor => Some(RecordKind::AgroProcessor),
            SheetRole::Summary => None,
        }
    }
}

/// "Agro" wins over everything else; any remaining sheet that is not a
/// statistics or summary table is taken to list farmers.
pub fn sheet_role(name: &str) -> SheetRole {
    let lower = name.trim().to_lowercase();
    if lower.contains("agro") || lower.contains("processor") {
        SheetRole::AgroProcessor
    } else if lower.contains("statistic") || lower.contains("summary") {
        SheetRole::Summary
    } else {
        SheetRole::Farmer
    }
}

fn name_keyword(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Farmer => "farm",
        RecordKind::AgroProcessor => "agro",
    }
}

/// Index of the sheet to import for `kind`.
///
/// Preference order: a non-summary sheet named after the kind ("farm" or
/// "agro"), then any sheet whose role matches, then the first sheet.
pub fn pick_sheet(names: &[String], kind: RecordKind) -> Option<usize> {
    if names.is_empty() {
        return None;
    }
    let keyword = name_keyword(kind);
    names
        .iter()
        .position(|n| n.to_lowercase().contains(keyword) && sheet_role(n) != SheetRole::Summary)
        .or_else(|| names.iter().position(|n| sheet_role(n).kind() == Some(kind)))
        .or(Some(0))
}

/// Read the selected sheets of a spreadsheet file
pub fn read_sheets<P: AsRef<Path>>(path: P, selection: &SheetSelection) -> Result<Vec<Sheet>> {
    let path = path.as_ref();
    ensure_exists(path)?;

    if is_csv(path) {
        let sheet = read_csv(path)?;
        if let SheetSelection::Named(name) = selection {
            if *name != sheet.name {
                bail!("CSV file {} has no sheet named '{}'", path.display(), name);
            }
        }
        return Ok(vec![sheet]);
    }

    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open spreadsheet: {}", path.display()))?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    let wanted: Vec<String> = match selection {
        SheetSelection::Auto(kind) => {
            let picked = pick_sheet(&sheet_names, *kind).and_then(|i| sheet_names.get(i).cloned());
            if let Some(name) = &picked {
                log::info!("Using sheet '{}' for {} records", name, kind);
            }
            picked.into_iter().collect()
        }
        SheetSelection::Named(name) => {
            let found = sheet_names
                .iter()
                .find(|s| s.eq_ignore_ascii_case(name))
                .with_context(|| {
                    format!(
                        "Sheet '{}' not found in {} (available: {})",
                        name,
                        path.display(),
                        sheet_names.join(", ")
                    )
                })?;
            vec![found.clone()]
        }
        SheetSelection::All => sheet_names,
    };

    if wanted.is_empty() {
        bail!("Spreadsheet has no sheets: {}", path.display());
    }

    let mut sheets = Vec::with_capacity(wanted.len());
    for sheet_name in wanted {
        let range = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

        let rows: Vec<Vec<CellValue>> = range
            .rows()
            .map(|r| r.iter().map(CellValue::from_data).collect())
            .collect();

        log::debug!("Read sheet '{}' ({} rows)", sheet_name, rows.len());
        sheets.push(Sheet::new(sheet_name, rows));
    }

    Ok(sheets)
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("File does not exist: {}", path.display());
    }
    if !path.is_file() {
        bail!("Not a file: {}", path.display());
    }
    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn csv_sheet_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sheet1")
        .to_string()
}

fn read_csv(path: &Path) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Failed to read CSV row {} in {}", idx + 1, path.display()))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(Sheet::new(csv_sheet_name(path), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::io::Write;

    #[test]
    fn test_to_text() {
        assert_eq!(CellValue::Number(712345678.0).to_text(), "712345678");
        assert_eq!(CellValue::Number(1.5).to_text(), "1.5");
        assert_eq!(CellValue::Text("  Alice ".into()).to_text(), "Alice");
        assert_eq!(CellValue::Bool(true).to_text(), "true");
        assert_eq!(CellValue::Empty.to_text(), "");
    }

    #[test]
    fn test_as_number() {
        assert_eq!(CellValue::Number(2.0).as_number(), Some(2.0));
        assert_eq!(CellValue::Text(" -6.82 ".into()).as_number(), Some(-6.82));
        assert_eq!(CellValue::Text("north".into()).as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn test_missing_file() {
        let err = read_sheets("/definitely/not/here.xlsx", &SheetSelection::All).unwrap_err();
        assert!(err.to_string().contains("File does not exist"));
    }

    #[test]
    fn test_read_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farmers.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Name,District,Commodities").unwrap();
        writeln!(file, "Alice,Kilosa,\"maize, beans\"").unwrap();
        writeln!(file, "Bob,,rice").unwrap();
        drop(file);

        let sheets = read_sheets(&path, &SheetSelection::Auto(RecordKind::Farmer)).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "farmers");
        assert_eq!(sheets[0].rows.len(), 3);
        assert_eq!(sheets[0].rows[1][2], CellValue::Text("maize, beans".into()));
        assert_eq!(sheets[0].rows[2][1], CellValue::Empty);
    }

    #[test]
    fn test_read_xlsx_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");

        let mut workbook = Workbook::new();
        let first = workbook.add_worksheet();
        first.set_name("Farmers").unwrap();
        first.write_string(0, 0, "Name").unwrap();
        first.write_number(0, 1, 1.0).unwrap();
        first.write_string(1, 0, "Alice").unwrap();
        first.write_number(1, 1, 45000.0).unwrap();
        let second = workbook.add_worksheet();
        second.set_name("Processors").unwrap();
        second.write_string(0, 0, "Business Name").unwrap();
        workbook.save(&path).unwrap();

        let first_only = read_sheets(&path, &SheetSelection::Auto(RecordKind::Farmer)).unwrap();
        assert_eq!(first_only.len(), 1);
        assert_eq!(first_only[0].rows[1][0], CellValue::Text("Alice".into()));
        assert_eq!(first_only[0].rows[1][1].as_number(), Some(45000.0));

        let named = read_sheets(&path, &SheetSelection::Named("processors".into())).unwrap();
        assert_eq!(named[0].name, "Processors");

        let all = read_sheets(&path, &SheetSelection::All).unwrap();
        assert_eq!(all.len(), 2);

        let missing = read_sheets(&path, &SheetSelection::Named("Visits".into()));
        assert!(missing.is_err());

        let auto = read_sheets(&path, &SheetSelection::Auto(RecordKind::AgroProcessor)).unwrap();
        assert_eq!(auto.len(), 1);
        assert_eq!(auto[0].name, "Processors");
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_sheet_role() {
        assert_eq!(sheet_role("KILOSA FARMERS"), SheetRole::Farmer);
        assert_eq!(sheet_role("Mvomero"), SheetRole::Farmer);
        assert_eq!(sheet_role("AGRO PROCESSORS"), SheetRole::AgroProcessor);
        assert_eq!(sheet_role("Agro statistics"), SheetRole::AgroProcessor);
        assert_eq!(sheet_role("Statistics"), SheetRole::Summary);
        assert_eq!(sheet_role("District Summary"), SheetRole::Summary);
    }

    #[test]
    fn test_pick_sheet_by_kind() {
        let book = names(&["Statistics", "AGRO PROCESSORS", "Kilosa Farmers"]);
        assert_eq!(pick_sheet(&book, RecordKind::Farmer), Some(2));
        assert_eq!(pick_sheet(&book, RecordKind::AgroProcessor), Some(1));

        // Summary sheets are passed over even when named after farmers
        let book = names(&["Farm summary", "Statistics", "Mvomero"]);
        assert_eq!(pick_sheet(&book, RecordKind::Farmer), Some(2));

        // Nothing suitable: first sheet
        let book = names(&["Statistics", "Summary"]);
        assert_eq!(pick_sheet(&book, RecordKind::Farmer), Some(0));
        assert_eq!(pick_sheet(&book, RecordKind::AgroProcessor), Some(0));

        assert_eq!(pick_sheet(&[], RecordKind::Farmer), None);
    }
}
