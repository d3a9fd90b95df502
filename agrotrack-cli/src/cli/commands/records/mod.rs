//! `agrotrack records ...`

pub mod handler;

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::output::OutputFormat;
use crate::types::{RecordKind, RecordPatch, split_commodities};

#[derive(Subcommand, Debug)]
pub enum RecordsCommands {
    /// List records
    List {
        #[arg(short, long, value_enum)]
        kind: RecordKind,
        /// Only records in this district (case-insensitive)
        #[arg(long)]
        district: Option<String>,
        /// Only records listing this commodity (case-insensitive)
        #[arg(long)]
        commodity: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Find records whose name or business name contains a query
    Search {
        #[arg(short, long, value_enum)]
        kind: RecordKind,
        query: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show one record with its visits
    Show {
        #[arg(short, long, value_enum)]
        kind: RecordKind,
        id: String,
    },
    /// Create a record
    Add {
        #[arg(short, long, value_enum)]
        kind: RecordKind,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Change fields of a record
    Update {
        #[arg(short, long, value_enum)]
        kind: RecordKind,
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete a record and its visits
    Delete {
        #[arg(short, long, value_enum)]
        kind: RecordKind,
        id: String,
    },
    /// Delete recently created records, or every record of a kind
    Purge {
        #[arg(short, long, value_enum)]
        kind: RecordKind,
        /// Only records created in the last N minutes
        #[arg(long, conflicts_with = "all", value_parser = clap::value_parser!(u64).range(1..))]
        minutes: Option<u64>,
        /// Every record of the kind
        #[arg(long)]
        all: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Export records to an .xlsx workbook
    Export {
        #[arg(short, long, value_enum)]
        kind: RecordKind,
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Record fields settable from the command line
#[derive(Args, Debug, Default)]
pub struct FieldArgs {
    #[arg(long)]
    pub name: Option<String>,
    /// Agro-processors only
    #[arg(long)]
    pub business_name: Option<String>,
    #[arg(long)]
    pub ref_code: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub contact: Option<String>,
    #[arg(long)]
    pub district: Option<String>,
    /// Comma-separated, e.g. "maize, beans"
    #[arg(long)]
    pub commodities: Option<String>,
    #[arg(long)]
    pub quantities: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub date_of_visit: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub remarks: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,
}

impl FieldArgs {
    pub fn into_patch(self) -> RecordPatch {
        let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string());
        RecordPatch {
            name: trimmed(self.name),
            business_name: trimmed(self.business_name),
            ref_code: trimmed(self.ref_code),
            address: trimmed(self.address),
            contact: trimmed(self.contact),
            district: trimmed(self.district),
            commodities: self.commodities.as_deref().map(split_commodities),
            quantities: trimmed(self.quantities),
            email: trimmed(self.email),
            date_of_visit: trimmed(self.date_of_visit),
            status: trimmed(self.status),
            remarks: trimmed(self.remarks),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}
