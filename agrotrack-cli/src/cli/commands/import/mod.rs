//! `agrotrack import`

pub mod handler;

use clap::Args;
use std::path::PathBuf;

use crate::types::RecordKind;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Workbook (.xlsx, .xlsm, .xls, .ods) or .csv file
    pub file: PathBuf,

    /// Kind of record in the file
    #[arg(short, long, value_enum)]
    pub kind: RecordKind,

    /// Sheet to import (default: the sheet named after the record kind, else the first)
    #[arg(long, conflicts_with = "all_sheets")]
    pub sheet: Option<String>,

    /// Import every sheet in the workbook
    #[arg(long)]
    pub all_sheets: bool,

    /// Normalize and report without uploading
    #[arg(long)]
    pub dry_run: bool,

    /// Delete every existing record of the kind before importing
    #[arg(long, conflicts_with = "dry_run")]
    pub replace: bool,

    /// Skip the confirmation prompt of --replace
    #[arg(short, long)]
    pub yes: bool,

    /// Reject sheets with no recognizable header row instead of using row 1
    #[arg(long)]
    pub strict_headers: bool,

    /// Records per backend call
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,

    /// Rows scanned for the header (clamped to 5-15)
    #[arg(long)]
    pub header_rows: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
