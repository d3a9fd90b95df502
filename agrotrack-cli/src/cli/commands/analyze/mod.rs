//! `agrotrack analyze`

pub mod handler;

use clap::Args;
use std::path::PathBuf;

use crate::import::analyze::SURVEY_SCAN_ROWS;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Workbook (.xlsx, .xlsm, .xls, .ods) or .csv file
    pub file: PathBuf,

    /// Rows searched for a "name" column on each sheet
    #[arg(long, default_value_t = SURVEY_SCAN_ROWS as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub header_rows: u64,

    /// Print the analysis as JSON
    #[arg(long)]
    pub json: bool,
}
