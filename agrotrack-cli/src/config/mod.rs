//! Application configuration
//!
//! Loaded from `config.toml` (see [`Config::default_path`]), then overridden
//! by `AGROTRACK_*` environment variables. Every field has a default, so an
//! absent file is fine.

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::resilience::{ResilienceConfig, RetryConfig};
use crate::import::dates::{DEFAULT_DATE_FORMAT, validate_date_format};
use crate::import::header::{DEFAULT_SCAN_ROWS, MAX_SCAN_ROWS, MIN_SCAN_ROWS};
use crate::import::{DEFAULT_BATCH_SIZE, FieldTable, HeaderPolicy, ImportOptions};
use crate::types::RecordKind;

pub const ENV_BACKEND: &str = "AGROTRACK_BACKEND";
pub const ENV_DATABASE_URL: &str = "AGROTRACK_DATABASE_URL";
pub const ENV_API_URL: &str = "AGROTRACK_API_URL";
pub const ENV_API_KEY: &str = "AGROTRACK_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local SQLite database
    #[default]
    Sqlite,
    /// Hosted document database over HTTP
    Http,
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "http" => Ok(BackendKind::Http),
            other => bail!("Unknown backend '{}' (expected 'sqlite' or 'http')", other),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub import: ImportConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// SQLite URL; defaults to a file under the user data directory
    pub database_url: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    /// Where the http backend keeps its import batches; defaults to a file
    /// under the user data directory
    pub batch_log: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub header_scan_rows: usize,
    pub strict_headers: bool,
    /// chrono strftime format for converted serial dates
    pub date_format: String,
    pub patterns: PatternOverrides,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            header_scan_rows: DEFAULT_SCAN_ROWS,
            strict_headers: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            patterns: PatternOverrides::default(),
        }
    }
}

/// Canonical field key → header patterns, replacing the built-in list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternOverrides {
    pub farmer: BTreeMap<String, Vec<String>>,
    pub processor: BTreeMap<String, Vec<String>>,
}

impl PatternOverrides {
    pub fn for_kind(&self, kind: RecordKind) -> &BTreeMap<String, Vec<String>> {
        match kind {
            RecordKind::Farmer => &self.farmer,
            RecordKind::AgroProcessor => &self.processor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub timeout_secs: u64,
    pub request_logging: bool,
    pub retry: RetrySettings,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            request_logging: true,
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub enabled: bool,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            enabled: true,
            max_attempts: retry.max_attempts,
            base_delay_ms: retry.base_delay.as_millis() as u64,
            max_delay_ms: retry.max_delay.as_millis() as u64,
            backoff_multiplier: retry.backoff_multiplier,
            jitter: retry.jitter,
        }
    }
}

impl Config {
    /// `<config dir>/agrotrack/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("agrotrack").join("config.toml"))
    }

    /// `sqlite://<data dir>/agrotrack/agrotrack.db`
    pub fn default_database_url() -> Result<String> {
        let dir = dirs::data_dir().context("Could not determine the user data directory")?;
        Ok(format!(
            "sqlite://{}",
            dir.join("agrotrack").join("agrotrack.db").display()
        ))
    }

    /// Load from an explicit path (which must exist) or the default location
    /// (which may not)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                bail!("Config file does not exist: {}", path.display());
            }
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `AGROTRACK_*` overrides. `lookup` is normally `std::env::var(..).ok()`.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(kind) = lookup(ENV_BACKEND) {
            self.backend.kind = kind
                .parse()
                .with_context(|| format!("Invalid {}", ENV_BACKEND))?;
        }
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.backend.database_url = Some(url);
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.backend.api_url = Some(url);
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.backend.api_key = Some(key);
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.import.batch_size == 0 {
            bail!("import.batch_size must be at least 1");
        }
        if !(MIN_SCAN_ROWS..=MAX_SCAN_ROWS).contains(&self.import.header_scan_rows) {
            bail!(
                "import.header_scan_rows must be between {} and {}",
                MIN_SCAN_ROWS,
                MAX_SCAN_ROWS
            );
        }
        validate_date_format(&self.import.date_format).context("import.date_format")?;
        if self.api.retry.max_attempts == 0 {
            bail!("api.retry.max_attempts must be at least 1");
        }
        if self.api.retry.backoff_multiplier < 1.0 {
            bail!("api.retry.backoff_multiplier must be at least 1.0");
        }
        for kind in [RecordKind::Farmer, RecordKind::AgroProcessor] {
            FieldTable::for_kind(kind)
                .with_overrides(self.import.patterns.for_kind(kind))
                .with_context(|| format!("import.patterns.{}", kind_section(kind)))?;
        }
        Ok(())
    }

    /// `<data dir>/agrotrack/import_batches.json` unless configured
    pub fn batch_log_path(&self) -> Result<PathBuf> {
        match &self.backend.batch_log {
            Some(path) => Ok(path.clone()),
            None => {
                let dir = dirs::data_dir().context("Could not determine the user data directory")?;
                Ok(dir.join("agrotrack").join("import_batches.json"))
            }
        }
    }

    pub fn database_url(&self) -> Result<String> {
        match &self.backend.database_url {
            Some(url) => Ok(url.clone()),
            None => Self::default_database_url(),
        }
    }

    pub fn field_table(&self, kind: RecordKind) -> Result<FieldTable> {
        FieldTable::for_kind(kind).with_overrides(self.import.patterns.for_kind(kind))
    }

    /// Import options for `kind` before command-line overrides
    pub fn import_options(&self, kind: RecordKind) -> Result<ImportOptions> {
        Ok(ImportOptions {
            header_scan_rows: self.import.header_scan_rows,
            header_policy: if self.import.strict_headers {
                HeaderPolicy::Strict
            } else {
                HeaderPolicy::Fallback
            },
            batch_size: self.import.batch_size,
            date_format: self.import.date_format.clone(),
            field_table: Some(self.field_table(kind)?),
            ..ImportOptions::new(kind)
        })
    }

    pub fn resilience(&self) -> ResilienceConfig {
        let settings = &self.api.retry;
        let retry = if settings.enabled {
            RetryConfig {
                max_attempts: settings.max_attempts,
                base_delay: Duration::from_millis(settings.base_delay_ms),
                max_delay: Duration::from_millis(settings.max_delay_ms),
                backoff_multiplier: settings.backoff_multiplier,
                jitter: settings.jitter,
            }
        } else {
            RetryConfig::none()
        };
        ResilienceConfig::builder()
            .retry_config(retry)
            .timeout(Duration::from_secs(self.api.timeout_secs))
            .request_logging(self.api.request_logging)
            .build()
    }
}

fn kind_section(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Farmer => "farmer",
        RecordKind::AgroProcessor => "processor",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::CanonicalField;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend.kind, BackendKind::Sqlite);
        assert_eq!(config.import.batch_size, 50);
        assert_eq!(config.import.header_scan_rows, 10);
        assert_eq!(config.import.date_format, "%Y-%m-%d");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [backend]
            kind = "http"
            api_url = "https://agro.example.com"

            [import]
            batch_size = 25
            strict_headers = true

            [import.patterns.farmer]
            name = ["jina", "Farmer Name"]

            [api.retry]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.kind, BackendKind::Http);
        assert_eq!(config.import.batch_size, 25);
        assert_eq!(config.import.header_scan_rows, 10);
        assert_eq!(config.api.retry.max_attempts, 5);
        assert_eq!(config.api.retry.base_delay_ms, 500);

        let options = config.import_options(RecordKind::Farmer).unwrap();
        assert_eq!(options.batch_size, 25);
        assert_eq!(options.header_policy, HeaderPolicy::Strict);
        let table = options.field_table.unwrap();
        assert_eq!(table.patterns(CanonicalField::Name), ["jina", "farmer name"]);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Config::from_toml("[import]\nbatch_size = 0").is_err());
        assert!(Config::from_toml("[import]\nheader_scan_rows = 40").is_err());
        assert!(Config::from_toml("[import]\ndate_format = \"%Q\"").is_err());
        assert!(Config::from_toml("[import.patterns.farmer]\nshoe_size = [\"x\"]").is_err());
        assert!(Config::from_toml("[backend]\nkind = \"postgres\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BACKEND, "HTTP"),
            (ENV_API_URL, "https://agro.example.com"),
            (ENV_API_KEY, ""),
        ]
        .into_iter()
        .collect();

        let config = Config::default()
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.backend.kind, BackendKind::Http);
        assert_eq!(config.backend.api_url.as_deref(), Some("https://agro.example.com"));
        // Blank values are ignored
        assert!(config.backend.api_key.is_none());

        let bad = Config::default().apply_env(|key| (key == ENV_BACKEND).then(|| "ftp".to_string()));
        assert!(bad.is_err());
    }

    #[test]
    fn test_load_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(Config::load(Some(&missing)).is_err());

        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend]\ndatabase_url = \"sqlite://x.db\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.database_url().unwrap(), "sqlite://x.db");
    }

    #[test]
    fn test_resilience_from_config() {
        let mut config = Config::default();
        config.api.timeout_secs = 5;
        config.api.retry.max_attempts = 4;
        config.api.request_logging = false;

        let resilience = config.resilience();
        assert_eq!(resilience.timeout, Duration::from_secs(5));
        assert_eq!(resilience.retry.max_attempts, 4);
        assert!(!resilience.monitoring.request_logging);

        config.api.retry.enabled = false;
        assert_eq!(config.resilience().retry.max_attempts, 1);
    }

    #[test]
    fn test_batch_log_path() {
        let mut config = Config::default();
        if let Ok(path) = config.batch_log_path() {
            assert!(path.ends_with("agrotrack/import_batches.json"));
        }
        config.backend.batch_log = Some(PathBuf::from("/tmp/batches.json"));
        assert_eq!(config.batch_log_path().unwrap(), PathBuf::from("/tmp/batches.json"));
    }
}
