//! Derived views over stored records: aggregates and workbook export

pub mod analytics;
pub mod export;

pub use analytics::{Summary, summarize};
pub use export::export_records;
