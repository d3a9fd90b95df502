//! Hosted backend operations
//!
//! A unified description of the function calls the HTTP client can make.

pub mod operation;

pub use operation::Operation;
