//! `agrotrack links ...`

pub mod handler;

use clap::Subcommand;

use crate::cli::output::OutputFormat;

#[derive(Subcommand, Debug)]
pub enum LinksCommands {
    /// Record that a farmer supplies an agro-processor
    Add {
        /// Farmer id
        #[arg(long)]
        farmer: String,
        /// Agro-processor id
        #[arg(long)]
        processor: String,
        #[arg(long)]
        commodity: String,
        /// Free-text volume, e.g. "2 tonnes"
        #[arg(long)]
        volume: Option<String>,
        /// Date of the arrangement (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// List supply links
    List {
        /// Only links of this farmer
        #[arg(long, conflicts_with = "processor")]
        farmer: Option<String>,
        /// Only links of this agro-processor
        #[arg(long)]
        processor: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}
