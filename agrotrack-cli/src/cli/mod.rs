//! Command-line interface

pub mod commands;
pub mod context;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::BackendKind;
use commands::analyze::{AnalyzeArgs, handler::handle_analyze_command};
use commands::audit::{AuditCommands, handler::handle_audit_command};
use commands::import::{ImportArgs, handler::handle_import_command};
use commands::links::{LinksCommands, handler::handle_links_command};
use commands::records::{RecordsCommands, handler::handle_records_command};
use commands::stats::{StatsArgs, handler::handle_stats_command};
use commands::undo::{UndoArgs, handler::handle_undo_command};
use commands::visits::{VisitsCommands, handler::handle_visits_command};
use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "agrotrack", version, about = "Farmer and agro-processor records, with spreadsheet import")]
pub struct Cli {
    /// Config file (default: <config dir>/agrotrack/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend, overriding config and environment
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import records from a spreadsheet or CSV file
    Import(ImportArgs),
    /// Report which sheets of a workbook hold farmers or agro-processors
    Analyze(AnalyzeArgs),
    /// Remove the records created by the most recent import
    Undo(UndoArgs),
    /// Manage records
    #[command(subcommand)]
    Records(RecordsCommands),
    /// Visit history
    #[command(subcommand)]
    Visits(VisitsCommands),
    /// Farmers supplying agro-processors
    #[command(subcommand)]
    Links(LinksCommands),
    /// Audit log
    #[command(subcommand)]
    Audit(AuditCommands),
    /// Aggregates by district, commodity, status and month
    Stats(StatsArgs),
}

impl Cli {
    /// Log filter implied by `-v` flags
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    pub async fn run(self) -> Result<()> {
        if self.no_color {
            colored::control::set_override(false);
        }

        let ctx = AppContext::load(self.config.as_deref(), self.backend)?;
        match self.command {
            Commands::Import(args) => handle_import_command(args, &ctx).await,
            Commands::Analyze(args) => handle_analyze_command(args),
            Commands::Undo(args) => handle_undo_command(args, &ctx).await,
            Commands::Records(command) => handle_records_command(command, &ctx).await,
            Commands::Visits(command) => handle_visits_command(command, &ctx).await,
            Commands::Links(command) => handle_links_command(command, &ctx).await,
            Commands::Audit(command) => handle_audit_command(command, &ctx).await,
            Commands::Stats(args) => handle_stats_command(args, &ctx).await,
        }
    }
}
