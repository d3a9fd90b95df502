//! Map raw spreadsheet rows onto record drafts
//!
//! Column resolution for each canonical field:
//! 1. lower-case and trim every column label
//! 2. exact match against the field's patterns, in pattern order
//! 3. otherwise substring containment, in pattern order
//! 4. otherwise the field stays empty

use std::collections::HashMap;

use super::dates::{DEFAULT_DATE_FORMAT, format_date_cell};
use super::fields::{CanonicalField, FieldTable};
use super::reader::CellValue;
use crate::types::{RecordDraft, RecordKind, split_commodities};

/// One data row keyed by its original column labels
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 1-based row number in the sheet, for diagnostics
    pub row_number: usize,
    pub fields: Vec<(String, CellValue)>,
}

impl RawRecord {
    /// Pair a data row with header labels. Columns without a label are dropped.
    pub fn from_row(row_number: usize, labels: &[String], cells: &[CellValue]) -> Self {
        let fields = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| !label.trim().is_empty())
            .map(|(idx, label)| {
                let cell = cells.get(idx).cloned().unwrap_or(CellValue::Empty);
                (label.clone(), cell)
            })
            .collect();
        Self { row_number, fields }
    }

    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, cell)| cell.is_empty())
    }
}

/// Lower-case, trim and collapse inner whitespace of a column label
pub fn normalize_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Index of the key matched by the first pattern, exact matches first
pub fn resolve_column(keys: &[String], patterns: &[String]) -> Option<usize> {
    for pattern in patterns {
        if let Some(idx) = keys.iter().position(|key| key == pattern) {
            return Some(idx);
        }
    }
    for pattern in patterns {
        if let Some(idx) = keys.iter().position(|key| key.contains(pattern.as_str())) {
            return Some(idx);
        }
    }
    None
}

/// Resolved canonical-field → column index for one set of labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    columns: HashMap<CanonicalField, usize>,
}

impl ColumnMap {
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Resolved fields with the label each one came from
    pub fn describe(&self, labels: &[String]) -> Vec<(CanonicalField, String)> {
        let mut described: Vec<(CanonicalField, String)> = self
            .columns
            .iter()
            .filter_map(|(field, idx)| labels.get(*idx).map(|l| (*field, l.clone())))
            .collect();
        described.sort_by_key(|(field, _)| *field);
        described
    }
}

/// Shared normalizer, parameterized by a field table
#[derive(Debug, Clone)]
pub struct Normalizer {
    table: FieldTable,
    date_format: String,
}

impl Normalizer {
    pub fn new(table: FieldTable) -> Self {
        Self {
            table,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    pub fn for_kind(kind: RecordKind) -> Self {
        Self::new(FieldTable::for_kind(kind))
    }

    /// Set the strftime format used for serial dates (validate it first)
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn kind(&self) -> RecordKind {
        self.table.kind()
    }

    pub fn table(&self) -> &FieldTable {
        &self.table
    }

    /// Resolve every canonical field against a set of column labels
    pub fn column_map(&self, labels: &[String]) -> ColumnMap {
        let keys: Vec<String> = labels.iter().map(|l| normalize_key(l)).collect();
        let columns = self
            .table
            .entries()
            .iter()
            .filter_map(|(field, patterns)| resolve_column(&keys, patterns).map(|idx| (*field, idx)))
            .collect();
        ColumnMap { columns }
    }

    /// Normalize a row of cells using a precomputed column map
    pub fn normalize_cells(&self, map: &ColumnMap, cells: &[CellValue]) -> RecordDraft {
        let cell = |field: CanonicalField| -> Option<&CellValue> {
            map.get(field).and_then(|idx| cells.get(idx))
        };
        let text = |field: CanonicalField| -> String {
            match cell(field) {
                Some(value) if field.is_date() => format_date_cell(value, &self.date_format),
                Some(value) => value.to_text(),
                None => String::new(),
            }
        };
        let number = |field: CanonicalField| -> Option<f64> { cell(field).and_then(CellValue::as_number) };
        let optional = |field: CanonicalField| -> Option<String> {
            Some(text(field)).filter(|s| !s.is_empty())
        };

        RecordDraft {
            name: text(CanonicalField::Name),
            business_name: if self.table.has_field(CanonicalField::BusinessName) {
                optional(CanonicalField::BusinessName)
            } else {
                None
            },
            ref_code: optional(CanonicalField::RefCode),
            address: text(CanonicalField::Address),
            contact: text(CanonicalField::Contact),
            district: text(CanonicalField::District),
            commodities: split_commodities(&text(CanonicalField::Commodities)),
            quantities: text(CanonicalField::Quantities),
            email: text(CanonicalField::Email),
            date_of_visit: text(CanonicalField::DateOfVisit),
            status: text(CanonicalField::Status),
            remarks: text(CanonicalField::Remarks),
            latitude: number(CanonicalField::Latitude),
            longitude: number(CanonicalField::Longitude),
        }
    }
}
