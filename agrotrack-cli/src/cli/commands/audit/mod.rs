//! `agrotrack audit ...`

pub mod handler;

use clap::Subcommand;

use crate::cli::output::OutputFormat;

#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// Show audit entries, newest first
    List {
        /// Only entries for this record
        #[arg(short, long)]
        record: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}
