//! Agrotrack: farmer and agro-processor records with spreadsheet import
//!
//! - [`import`]: the normalization pipeline from workbook rows to records
//! - [`api`]: the storage contract and the hosted HTTP backend
//! - [`store`]: the local SQLite backend
//! - [`services`]: analytics and workbook export
//! - [`cli`]: the `agrotrack` command line

pub mod api;
pub mod cli;
pub mod config;
pub mod import;
pub mod services;
pub mod store;
pub mod types;
