//! Spreadsheet serial dates
//!
//! Spreadsheets store dates as a day count where day 0 is 1899-12-30 and
//! day 25569 is the Unix epoch.

use anyhow::{Result, bail};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, Utc};

use super::reader::CellValue;

/// Days between the spreadsheet epoch (1899-12-30) and 1970-01-01
pub const SERIAL_EPOCH_OFFSET_DAYS: f64 = 25569.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Convert a serial day count (fraction = time of day) to a UTC timestamp
pub fn serial_to_datetime(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() {
        return None;
    }
    let millis = ((serial - SERIAL_EPOCH_OFFSET_DAYS) * MILLIS_PER_DAY).round();
    if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
}

pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    serial_to_datetime(serial).map(|dt| dt.date_naive())
}

/// Render a date cell: text passes through, numbers are serial dates
pub fn format_date_cell(cell: &CellValue, format: &str) -> String {
    match cell {
        CellValue::Number(serial) => match serial_to_date(*serial) {
            Some(date) => date.format(format).to_string(),
            None => cell.to_text(),
        },
        _ => cell.to_text(),
    }
}

/// Reject strftime strings chrono cannot render
pub fn validate_date_format(format: &str) -> Result<()> {
    if format.trim().is_empty() {
        bail!("Date format must not be empty");
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        bail!("Invalid date format: '{}'", format);
    }
    Ok(())
}
