//! Per-invocation state shared by command handlers

use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use crate::api::{Backend, BatchLog, HttpBackend};
use crate::config::{BackendKind, Config, ENV_API_URL};
use crate::store::SqliteBackend;

pub struct AppContext {
    pub config: Config,
}

impl AppContext {
    /// Load config, apply environment overrides, then the `--backend` flag
    pub fn load(config_path: Option<&Path>, backend: Option<BackendKind>) -> Result<Self> {
        let mut config = Config::load(config_path)?.apply_env(|key| std::env::var(key).ok())?;
        if let Some(kind) = backend {
            config.backend.kind = kind;
        }
        Ok(Self { config })
    }

    /// Open the configured backend
    pub async fn backend(&self) -> Result<Box<dyn Backend>> {
        match self.config.backend.kind {
            BackendKind::Sqlite => {
                let url = self.config.database_url()?;
                info!("Using SQLite store at {}", url);
                Ok(Box::new(SqliteBackend::connect(&url).await?))
            }
            BackendKind::Http => {
                let url = self.config.backend.api_url.clone().with_context(|| {
                    format!(
                        "The http backend needs an API URL: set backend.api_url in the config file or {}",
                        ENV_API_URL
                    )
                })?;
                let backend = HttpBackend::new(
                    url,
                    self.config.backend.api_key.clone(),
                    self.config.resilience(),
                    BatchLog::new(self.config.batch_log_path()?),
                )?;
                info!("Using hosted backend at {}", backend.base_url());
                Ok(Box::new(backend))
            }
        }
    }
}
