//! Write records to an `.xlsx` workbook the importer can read back

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

use crate::import::CanonicalField;
use crate::types::{Record, RecordKind, join_commodities};

/// Column header for each exported field, spelled so the default pattern
/// table matches it exactly
fn header_label(field: CanonicalField) -> &'static str {
    match field {
        CanonicalField::Name => "Name",
        CanonicalField::BusinessName => "Business Name",
        CanonicalField::RefCode => "Ref No",
        CanonicalField::Address => "Address",
        CanonicalField::Contact => "Contact",
        CanonicalField::District => "District",
        CanonicalField::Commodities => "Commodities",
        CanonicalField::Quantities => "Quantities",
        CanonicalField::Email => "Email",
        CanonicalField::DateOfVisit => "Date of Visit",
        CanonicalField::Status => "Status",
        CanonicalField::Remarks => "Remarks",
        CanonicalField::Latitude => "Latitude",
        CanonicalField::Longitude => "Longitude",
    }
}

/// Exported columns, in order
pub fn export_fields(kind: RecordKind) -> Vec<CanonicalField> {
    CanonicalField::ALL
        .into_iter()
        .filter(|f| *f != CanonicalField::BusinessName || kind == RecordKind::AgroProcessor)
        .collect()
}

fn sheet_name(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Farmer => "Farmers",
        RecordKind::AgroProcessor => "Agro-processors",
    }
}

fn write_header(ws: &mut Worksheet, fields: &[CanonicalField]) -> Result<()> {
    let bold = Format::new().set_bold();
    for (col, field) in fields.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, header_label(*field), &bold)?;
    }
    Ok(())
}

fn write_record(ws: &mut Worksheet, row: u32, fields: &[CanonicalField], record: &Record) -> Result<()> {
    let r = &record.fields;
    for (col, field) in fields.iter().enumerate() {
        let col = col as u16;
        let text = match field {
            CanonicalField::Name => r.name.clone(),
            CanonicalField::BusinessName => r.business_name.clone().unwrap_or_default(),
            CanonicalField::RefCode => r.ref_code.clone().unwrap_or_default(),
            CanonicalField::Address => r.address.clone(),
            CanonicalField::Contact => r.contact.clone(),
            CanonicalField::District => r.district.clone(),
            CanonicalField::Commodities => join_commodities(&r.commodities),
            CanonicalField::Quantities => r.quantities.clone(),
            CanonicalField::Email => r.email.clone(),
            CanonicalField::DateOfVisit => r.date_of_visit.clone(),
            CanonicalField::Status => r.status.clone(),
            CanonicalField::Remarks => r.remarks.clone(),
            CanonicalField::Latitude | CanonicalField::Longitude => {
                let value = if *field == CanonicalField::Latitude {
                    r.latitude
                } else {
                    r.longitude
                };
                if let Some(value) = value {
                    ws.write_number(row, col, value)?;
                }
                continue;
            }
        };
        if !text.is_empty() {
            ws.write_string(row, col, &text)?;
        }
    }
    Ok(())
}

/// Write `records` of one kind to `path`; returns the number of rows written
pub fn export_records<P: AsRef<Path>>(kind: RecordKind, records: &[Record], path: P) -> Result<usize> {
    let path = path.as_ref();
    let fields = export_fields(kind);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(kind))?;
    write_header(worksheet, &fields)?;

    let mut written = 0;
    for record in records.iter().filter(|r| r.kind == kind) {
        written += 1;
        write_record(worksheet, written as u32, &fields, record)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportOptions, prepare_import};
    use crate::types::{RecordDraft, RecordId};
    use chrono::Utc;

    fn processor() -> Record {
        let mut fields = RecordDraft::new("Juma Said");
        fields.business_name = Some("Kilosa Mills".to_string());
        fields.ref_code = Some("KM-7".to_string());
        fields.district = "Kilosa".to_string();
        fields.commodities = vec!["maize".to_string(), "rice".to_string()];
        fields.date_of_visit = "2024-02-10".to_string();
        fields.latitude = Some(-6.83);
        fields.longitude = Some(36.98);
        Record {
            id: RecordId::new("p1"),
            kind: RecordKind::AgroProcessor,
            fields,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_farmer_export_has_no_business_column() {
        let fields = export_fields(RecordKind::Farmer);
        assert!(!fields.contains(&CanonicalField::BusinessName));
        assert_eq!(fields[0], CanonicalField::Name);
        assert!(export_fields(RecordKind::AgroProcessor).contains(&CanonicalField::BusinessName));
    }

    #[test]
    fn test_export_reimports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processors.xlsx");
        let record = processor();

        let written = export_records(RecordKind::AgroProcessor, &[record.clone()], &path).unwrap();
        assert_eq!(written, 1);

        let prepared = prepare_import(&path, &ImportOptions::new(RecordKind::AgroProcessor)).unwrap();
        assert_eq!(prepared.report.sheets[0].header_row, Some(0));
        assert_eq!(prepared.records, vec![record.fields]);
    }
}
