//! Resilience features for hosted backend calls
//!
//! Retry policies with exponential backoff plus timeout and request logging
//! settings.

pub mod config;
pub mod retry;

pub use config::{MonitoringConfig, ResilienceConfig};
pub use retry::{RetryConfig, RetryPolicy, RetryableError};
