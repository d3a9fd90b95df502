//! Header row detection
//!
//! Spreadsheets handed in by field staff often carry a title block above the
//! real column headers. The locator scans a small window at the top of the
//! sheet and takes the first row that mentions a known field token.

use anyhow::{Result, bail};

use super::reader::CellValue;

/// Tokens that mark a header row (matched case-insensitively as substrings)
pub const HEADER_TOKENS: &[&str] = &[
    "name", "ref", "business", "address", "district", "phone", "email", "commodit", "quantit",
    "date", "status", "remark",
];

pub const MIN_SCAN_ROWS: usize = 5;
pub const MAX_SCAN_ROWS: usize = 15;
pub const DEFAULT_SCAN_ROWS: usize = 10;

/// What to do when no row in the scan window looks like a header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderPolicy {
    /// Treat the first row as the header
    #[default]
    Fallback,
    /// Fail the sheet
    Strict,
}

/// Where the header was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLocation {
    /// A row in the window matched a token
    Detected(usize),
    /// Nothing matched; row 0 is used
    Fallback,
}

impl HeaderLocation {
    pub fn row(&self) -> usize {
        match self {
            HeaderLocation::Detected(row) => *row,
            HeaderLocation::Fallback => 0,
        }
    }
}

pub fn clamp_scan_rows(rows: usize) -> usize {
    rows.clamp(MIN_SCAN_ROWS, MAX_SCAN_ROWS)
}

/// Check whether any cell of a row contains a header token
pub fn is_header_row(row: &[CellValue]) -> bool {
    row.iter().any(|cell| {
        let text = cell.to_text().to_lowercase();
        !text.is_empty() && HEADER_TOKENS.iter().any(|token| text.contains(token))
    })
}

/// Index of the first row within `scan_rows` that looks like a header.
/// First match wins; `None` when no row matches or the sheet is empty.
pub fn locate_header(rows: &[Vec<CellValue>], scan_rows: usize) -> Option<usize> {
    rows.iter().take(scan_rows).position(|row| is_header_row(row))
}

/// Locate the header and apply the fallback policy.
/// Returns `Ok(None)` for a sheet without any rows.
pub fn resolve_header(
    rows: &[Vec<CellValue>],
    scan_rows: usize,
    policy: HeaderPolicy,
) -> Result<Option<HeaderLocation>> {
    if rows.is_empty() {
        return Ok(None);
    }

    match locate_header(rows, scan_rows) {
        Some(row) => Ok(Some(HeaderLocation::Detected(row))),
        None => match policy {
            HeaderPolicy::Fallback => Ok(Some(HeaderLocation::Fallback)),
            HeaderPolicy::Strict => bail!(
                "No header row found in the first {} rows (expected a column such as 'Name', 'District' or 'Commodities')",
                scan_rows.min(rows.len())
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<CellValue> {
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

    #[test]
    fn test_header_after_title_block() {
        let rows = vec![
            row(&["MINISTRY OF AGRICULTURE"]),
            row(&["Field survey 2023", ""]),
            row(&["No.", "Farmer Name", "District"]),
            row(&["1", "Alice", "Kilosa"]),
        ];
        assert_eq!(locate_header(&rows, 10), Some(2));
    }

    #[test]
    fn test_earliest_match_wins() {
        let rows = vec![
            row(&["Report date: 2024"]),
            row(&["Name", "District"]),
        ];
        // "date" in the title row is a token too
        assert_eq!(locate_header(&rows, 10), Some(0));
    }

    #[test]
    fn test_case_insensitive_substring() {
        let rows = vec![row(&["", "COMMODITIES GROWN"])];
        assert_eq!(locate_header(&rows, 10), Some(0));
    }

    #[test]
    fn test_numbers_never_match() {
        let rows = vec![vec![CellValue::Number(1.0), CellValue::Number(2.0)]];
        assert_eq!(locate_header(&rows, 10), None);
    }

    #[test]
    fn test_window_limits_scan() {
        let mut rows: Vec<Vec<CellValue>> = (0..6).map(|_| row(&["x"])).collect();
        rows.push(row(&["Name"]));
        assert_eq!(locate_header(&rows, 5), None);
        assert_eq!(locate_header(&rows, 7), Some(6));
    }

    #[test]
    fn test_empty_sheet() {
        assert_eq!(locate_header(&[], 10), None);
        assert_eq!(resolve_header(&[], 10, HeaderPolicy::Strict).unwrap(), None);
    }

    #[test]
    fn test_fallback_policy() {
        let rows = vec![row(&["a", "b"]), row(&["c", "d"])];
        let location = resolve_header(&rows, 10, HeaderPolicy::Fallback).unwrap();
        assert_eq!(location, Some(HeaderLocation::Fallback));
        assert_eq!(location.unwrap().row(), 0);

        let err = resolve_header(&rows, 10, HeaderPolicy::Strict).unwrap_err();
        assert!(err.to_string().contains("No header row found"));
    }

    #[test]
    fn test_clamp_scan_rows() {
        assert_eq!(clamp_scan_rows(1), MIN_SCAN_ROWS);
        assert_eq!(clamp_scan_rows(12), 12);
        assert_eq!(clamp_scan_rows(100), MAX_SCAN_ROWS);
    }
}
