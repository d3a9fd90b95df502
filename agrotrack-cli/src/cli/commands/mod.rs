//! Subcommands, one module per command with its arguments and handler

pub mod analyze;
pub mod audit;
pub mod import;
pub mod links;
pub mod records;
pub mod stats;
pub mod undo;
pub mod visits;
