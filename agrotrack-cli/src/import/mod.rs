//! Spreadsheet import for farmer and agro-processor records
//!
//! Pipeline stages, one module each:
//! - `reader`: workbook/CSV → sheets of typed cells
//! - `header`: find the header row in the first rows of a sheet
//! - `fields`/`normalize`: map column labels onto canonical fields
//! - `dates`: spreadsheet serial dates
//! - `filter`: accept/skip decision per row
//! - `upload`: sequential fixed-size batches with id collection
//! - `pipeline`: ties the stages together and saves the import batch
//!
//! `analyze` surveys a workbook's sheets without importing anything.

pub mod analyze;
pub mod dates;
pub mod fields;
pub mod filter;
pub mod header;
pub mod normalize;
pub mod pipeline;
pub mod reader;
pub mod upload;

pub use analyze::{SheetAnalysis, WorkbookAnalysis, analyze_workbook};
pub use fields::{CanonicalField, FieldTable};
pub use header::HeaderPolicy;
pub use pipeline::{ImportOptions, ImportReport, SheetReport, prepare_import, run_import};
pub use reader::{SheetRole, SheetSelection};
pub use upload::{BatchUploader, DEFAULT_BATCH_SIZE, UploadOutcome};
