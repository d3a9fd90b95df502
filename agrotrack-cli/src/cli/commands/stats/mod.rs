//! `agrotrack stats`

pub mod handler;

use clap::{Args, ValueEnum};

use crate::types::RecordKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StatsFormat {
    #[default]
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(short, long, value_enum)]
    pub kind: RecordKind,
    /// Rows shown per breakdown in table output
    #[arg(long, default_value_t = 10)]
    pub top: usize,
    #[arg(short, long, value_enum, default_value_t = StatsFormat::Table)]
    pub format: StatsFormat,
}
