//! End-to-end import: read → locate header → normalize → filter → upload

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use super::dates::{DEFAULT_DATE_FORMAT, validate_date_format};
use super::fields::FieldTable;
use super::filter::{Decision, SkipCounts, assess};
use super::header::{DEFAULT_SCAN_ROWS, HeaderLocation, HeaderPolicy, clamp_scan_rows, resolve_header};
use super::normalize::{Normalizer, RawRecord};
use super::reader::{Sheet, SheetSelection, read_sheets};
use super::upload::{BatchUploader, DEFAULT_BATCH_SIZE, UploadOutcome};
use crate::api::Backend;
use crate::types::{ImportBatch, RecordDraft, RecordKind};

/// Skipped rows logged per sheet at debug level
const SKIP_LOG_SAMPLE: usize = 5;

/// Header labels shown when a sheet yields nothing
const HEADER_SAMPLE: usize = 12;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub kind: RecordKind,
    pub sheets: SheetSelection,
    pub header_scan_rows: usize,
    pub header_policy: HeaderPolicy,
    pub batch_size: usize,
    pub date_format: String,
    pub dry_run: bool,
    /// Pattern table; `None` uses the built-in table for `kind`
    pub field_table: Option<FieldTable>,
}

impl ImportOptions {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            sheets: SheetSelection::Auto(kind),
            header_scan_rows: DEFAULT_SCAN_ROWS,
            header_policy: HeaderPolicy::Fallback,
            batch_size: DEFAULT_BATCH_SIZE,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            dry_run: false,
            field_table: None,
        }
    }

    fn normalizer(&self) -> Result<Normalizer> {
        validate_date_format(&self.date_format)?;
        let table = match &self.field_table {
            Some(table) => {
                if table.kind() != self.kind {
                    anyhow::bail!(
                        "Field table is for {} records but the import is for {}",
                        table.kind(),
                        self.kind
                    );
                }
                table.clone()
            }
            None => FieldTable::for_kind(self.kind),
        };
        Ok(Normalizer::new(table).with_date_format(self.date_format.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetReport {
    pub name: String,
    /// 0-based header row, `None` for an empty sheet
    pub header_row: Option<usize>,
    /// True when no header was detected and row 0 was used
    pub header_fallback: bool,
    pub headers: Vec<String>,
    /// Non-blank data rows examined
    pub rows_read: usize,
    pub accepted: usize,
    pub skipped: SkipCounts,
    /// Set when the sheet was rejected (strict header mode)
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source: String,
    pub kind: RecordKind,
    pub dry_run: bool,
    pub sheets: Vec<SheetReport>,
    pub accepted: usize,
    pub skipped: SkipCounts,
    pub upload: Option<UploadOutcome>,
    pub batch_id: Option<Uuid>,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.upload.as_ref().map(|u| u.ids.len()).unwrap_or(0)
    }

    pub fn is_complete(&self) -> bool {
        self.upload.as_ref().map(UploadOutcome::is_complete).unwrap_or(true)
    }
}

/// Normalized records ready for upload
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub report: ImportReport,
    pub records: Vec<RecordDraft>,
}

/// Normalize and filter one sheet
pub fn prepare_sheet(
    sheet: &Sheet,
    normalizer: &Normalizer,
    options: &ImportOptions,
) -> Result<(SheetReport, Vec<RecordDraft>)> {
    let mut report = SheetReport {
        name: sheet.name.clone(),
        ..Default::default()
    };

    if sheet.is_empty() {
        debug!("Sheet '{}' is empty", sheet.name);
        return Ok((report, Vec::new()));
    }

    let scan_rows = clamp_scan_rows(options.header_scan_rows);
    let location = resolve_header(&sheet.rows, scan_rows, options.header_policy)
        .with_context(|| format!("Sheet '{}'", sheet.name))?;
    let Some(location) = location else {
        return Ok((report, Vec::new()));
    };

    let header_idx = location.row();
    report.header_row = Some(header_idx);
    report.header_fallback = location == HeaderLocation::Fallback;
    if report.header_fallback {
        warn!(
            "Sheet '{}': no header row found in the first {} rows, using row 1",
            sheet.name, scan_rows
        );
    }

    let labels: Vec<String> = sheet.rows[header_idx].iter().map(|c| c.to_text()).collect();
    report.headers = labels.iter().filter(|l| !l.is_empty()).cloned().collect();

    let column_map = normalizer.column_map(&labels);
    debug!(
        "Sheet '{}' column mapping: {:?}",
        sheet.name,
        column_map.describe(&labels)
    );

    let mut accepted = Vec::new();
    let mut logged_skips = 0;

    for (idx, row) in sheet.rows.iter().enumerate().skip(header_idx + 1) {
        let raw = RawRecord::from_row(idx + 1, &labels, row);
        if raw.is_blank() {
            continue;
        }
        report.rows_read += 1;

        let draft = normalizer.normalize_cells(&column_map, row);
        match assess(&draft) {
            Decision::Accept => accepted.push(draft),
            Decision::Skip(reason) => {
                report.skipped.record(reason);
                if logged_skips < SKIP_LOG_SAMPLE {
                    debug!(
                        "Sheet '{}' row {}: skipped ({}), name {:?}",
                        sheet.name, raw.row_number, reason, draft.name
                    );
                    logged_skips += 1;
                }
            }
        }
    }

    report.accepted = accepted.len();
    if accepted.is_empty() {
        warn!(
            "Sheet '{}': no records accepted from {} rows; headers: {}",
            sheet.name,
            report.rows_read,
            report
                .headers
                .iter()
                .take(HEADER_SAMPLE)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok((report, accepted))
}

/// Read a file and produce normalized, filtered records without uploading
pub fn prepare_import<P: AsRef<Path>>(path: P, options: &ImportOptions) -> Result<PreparedImport> {
    let path = path.as_ref();
    let normalizer = options.normalizer()?;
    let sheets = read_sheets(path, &options.sheets)?;

    let mut report = ImportReport {
        source: path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string(),
        kind: options.kind,
        dry_run: options.dry_run,
        sheets: Vec::with_capacity(sheets.len()),
        accepted: 0,
        skipped: SkipCounts::default(),
        upload: None,
        batch_id: None,
    };
    let mut records = Vec::new();

    for sheet in &sheets {
        let (sheet_report, sheet_records) = match prepare_sheet(sheet, &normalizer, options) {
            Ok(prepared) => prepared,
            // With several sheets a rejected sheet is reported, not fatal
            Err(e) if sheets.len() > 1 => {
                warn!("{:#}", e);
                let failed = SheetReport {
                    name: sheet.name.clone(),
                    error: Some(format!("{:#}", e)),
                    ..Default::default()
                };
                (failed, Vec::new())
            }
            Err(e) => return Err(e),
        };
        report.skipped.merge(&sheet_report.skipped);
        report.sheets.push(sheet_report);
        records.extend(sheet_records);
    }

    report.accepted = records.len();
    info!(
        "Prepared {} {} records from {} ({} skipped)",
        report.accepted,
        options.kind.tag(),
        report.source,
        report.skipped.total()
    );

    Ok(PreparedImport { report, records })
}

/// Run a full import against a backend.
///
/// Whatever was committed, even by a partially failed upload, is saved as an
/// import batch so `undo` can remove it.
pub async fn run_import<P: AsRef<Path>>(
    backend: &dyn Backend,
    path: P,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let PreparedImport {
        mut report,
        records,
    } = prepare_import(path, options)?;

    if options.dry_run || records.is_empty() {
        return Ok(report);
    }

    let uploader = BatchUploader::new(options.batch_size);
    info!(
        "Uploading {} records to the {} backend in {} batches of up to {}",
        records.len(),
        backend.name(),
        uploader.batch_count(records.len()),
        uploader.batch_size()
    );
    let outcome = uploader.upload(backend, options.kind, &records).await;

    if !outcome.ids.is_empty() {
        let batch = ImportBatch::new(options.kind, report.source.clone(), outcome.ids.clone())
            .with_failure(outcome.failure.as_ref().map(|f| f.to_string()));
        backend.save_import_batch(&batch).await.with_context(|| {
            format!(
                "Imported {} records but failed to save the import batch; ids: {}",
                outcome.ids.len(),
                outcome
                    .ids
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            )
        })?;
        report.batch_id = Some(batch.id);
    }

    report.upload = Some(outcome);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::reader::CellValue;
    use crate::store::SqliteBackend;
    use rust_xlsxwriter::Workbook;

    fn text_row(values: &[&str]) -> Vec<CellValue> {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(v.to_string())
                }
            })
            .collect()
    }

    fn farmer_sheet() -> Sheet {
        Sheet::new(
            "Farmers",
            vec![
                text_row(&["Field survey 2023"]),
                text_row(&[""]),
                text_row(&["No.", "Farmer Name", "District", "Commodities"]),
                text_row(&["1", "Alice", "Kilosa", "maize, beans"]),
                text_row(&["2", "A", "Kilosa", "rice"]),
                text_row(&["", "", "", ""]),
                text_row(&["No.", "Farmer Name", "District", "Commodities"]),
                text_row(&["3", "", "Mvomero", "rice"]),
                text_row(&["4", "Bob", "Mvomero", "rice , , sesame"]),
            ],
        )
    }

    #[test]
    fn test_prepare_sheet() {
        let options = ImportOptions::new(RecordKind::Farmer);
        let normalizer = options.normalizer().unwrap();
        let (report, records) = prepare_sheet(&farmer_sheet(), &normalizer, &options).unwrap();

        assert_eq!(report.header_row, Some(2));
        assert!(!report.header_fallback);
        assert_eq!(report.rows_read, 5);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.skipped.name_too_short, 1);
        assert_eq!(report.skipped.header_echo, 1);
        assert_eq!(report.skipped.empty_name, 1);
        assert_eq!(report.skipped.total() + report.accepted, report.rows_read);

        assert_eq!(records[0].name, "Alice");
        assert_eq!(records[1].name, "Bob");
        assert_eq!(records[1].commodities, vec!["rice", "sesame"]);
    }

    #[test]
    fn test_prepare_sheet_fallback_and_strict() {
        let sheet = Sheet::new(
            "Odd",
            vec![text_row(&["Who", "Where"]), text_row(&["Alice", "Kilosa"])],
        );
        let options = ImportOptions::new(RecordKind::Farmer);
        let normalizer = options.normalizer().unwrap();
        let (report, records) = prepare_sheet(&sheet, &normalizer, &options).unwrap();
        assert!(report.header_fallback);
        assert_eq!(report.header_row, Some(0));
        // No column maps to the name field
        assert!(records.is_empty());
        assert_eq!(report.skipped.empty_name, 1);

        let strict = ImportOptions {
            header_policy: HeaderPolicy::Strict,
            ..ImportOptions::new(RecordKind::Farmer)
        };
        assert!(prepare_sheet(&sheet, &normalizer, &strict).is_err());
    }

    #[test]
    fn test_empty_sheet_yields_nothing() {
        let options = ImportOptions::new(RecordKind::Farmer);
        let normalizer = options.normalizer().unwrap();
        let (report, records) =
            prepare_sheet(&Sheet::new("Blank", vec![]), &normalizer, &options).unwrap();
        assert!(records.is_empty());
        assert_eq!(report.header_row, None);
    }

    #[test]
    fn test_rejects_mismatched_table() {
        let options = ImportOptions {
            field_table: Some(FieldTable::for_kind(RecordKind::AgroProcessor)),
            ..ImportOptions::new(RecordKind::Farmer)
        };
        assert!(options.normalizer().is_err());
    }

    fn write_workbook(path: &Path, rows: usize) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Farmer list").unwrap();
        let headers = ["Name", "District", "Commodities", "Date of Visit", "Remarks"];
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(1, col as u16, *header).unwrap();
        }
        for i in 0..rows {
            let row = (i + 2) as u32;
            sheet.write_string(row, 0, format!("Farmer {}", i)).unwrap();
            sheet.write_string(row, 1, "Kilosa").unwrap();
            sheet.write_string(row, 2, "maize, rice").unwrap();
            if i % 2 == 0 {
                sheet.write_number(row, 3, 45000.0).unwrap();
                sheet.write_string(row, 4, "first visit").unwrap();
            }
        }
        workbook.save(path).unwrap();
    }

    #[tokio::test]
    async fn test_run_import_and_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farmers.xlsx");
        write_workbook(&path, 120);

        let backend = SqliteBackend::in_memory().await.unwrap();
        let options = ImportOptions::new(RecordKind::Farmer);
        let report = run_import(&backend, &path, &options).await.unwrap();

        assert_eq!(report.accepted, 120);
        assert_eq!(report.imported(), 120);
        assert!(report.is_complete());
        let upload = report.upload.as_ref().unwrap();
        assert_eq!(upload.batches_submitted, 3);

        let records = backend.list_records(RecordKind::Farmer).await.unwrap();
        assert_eq!(records.len(), 120);
        assert_eq!(records[0].fields.name, "Farmer 0");
        assert_eq!(records[0].fields.date_of_visit, "2023-03-15");
        assert_eq!(records[119].fields.name, "Farmer 119");

        let visits = backend.list_visits(None).await.unwrap();
        assert_eq!(visits.len(), 60);

        let batch = backend.last_import_batch().await.unwrap().unwrap();
        assert_eq!(Some(batch.id), report.batch_id);
        assert_eq!(batch.record_ids, upload.ids);
        assert_eq!(batch.source, "farmers.xlsx");
    }

    #[tokio::test]
    async fn test_dry_run_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farmers.xlsx");
        write_workbook(&path, 3);

        let backend = SqliteBackend::in_memory().await.unwrap();
        let options = ImportOptions {
            dry_run: true,
            ..ImportOptions::new(RecordKind::Farmer)
        };
        let report = run_import(&backend, &path, &options).await.unwrap();
        assert_eq!(report.accepted, 3);
        assert!(report.upload.is_none());
        assert!(backend.list_records(RecordKind::Farmer).await.unwrap().is_empty());
        assert!(backend.last_import_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_creates_nothing() {
        let backend = SqliteBackend::in_memory().await.unwrap();
        let options = ImportOptions::new(RecordKind::Farmer);
        assert!(run_import(&backend, "/no/such/file.xlsx", &options).await.is_err());
        assert!(backend.last_import_batch().await.unwrap().is_none());
    }
}
