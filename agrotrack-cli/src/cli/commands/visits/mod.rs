//! `agrotrack visits ...`

pub mod handler;

use clap::Subcommand;

use crate::cli::output::OutputFormat;
use crate::types::RecordKind;

#[derive(Subcommand, Debug)]
pub enum VisitsCommands {
    /// List visits, newest first
    List {
        /// Only visits to this record
        #[arg(short, long)]
        record: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Record a visit
    Add {
        #[arg(short, long, value_enum)]
        kind: RecordKind,
        /// Id of the visited record
        #[arg(short, long)]
        record: String,
        /// Visit date, e.g. 2024-03-01
        #[arg(short, long)]
        date: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Change the date or remarks of a visit
    Update {
        id: String,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Delete a visit
    Delete { id: String },
}
