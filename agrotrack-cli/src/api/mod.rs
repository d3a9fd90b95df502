//! Storage backends
//!
//! The [`Backend`] trait is the contract every record store fulfils. This
//! module also holds the HTTP client for the hosted document database and
//! its retry/timeout machinery, the wire shapes of the hosted functions and
//! the local log of import batches used alongside it.

pub mod backend;
pub mod batch_log;
pub mod client;
pub mod error;
pub mod operations;
pub mod resilience;
pub mod wire;

pub use backend::Backend;
pub use batch_log::BatchLog;
pub use client::HttpBackend;
