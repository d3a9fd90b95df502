//! Import batches kept on this machine
//!
//! The hosted backend has no table for import batches, so the HTTP backend
//! records them in a JSON file next to the local database.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use log::debug;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::types::ImportBatch;

#[derive(Debug, Clone)]
pub struct BatchLog {
    path: PathBuf,
}

impl BatchLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<ImportBatch>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    async fn store(&self, batches: &[ImportBatch]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(batches).context("Failed to serialize batches")?;

        // Write then rename
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        debug!("Saved {} import batches to {}", batches.len(), self.path.display());
        Ok(())
    }

    pub async fn save(&self, batch: &ImportBatch) -> Result<()> {
        let mut batches = self.load().await?;
        batches.push(batch.clone());
        self.store(&batches).await
    }

    /// Most recent batch that has not been undone
    pub async fn latest(&self) -> Result<Option<ImportBatch>> {
        let batches = self.load().await?;
        Ok(batches
            .into_iter()
            .enumerate()
            .filter(|(_, b)| !b.is_undone())
            .max_by_key(|(position, b)| (b.created_at, *position))
            .map(|(_, b)| b))
    }

    pub async fn mark_undone(&self, id: Uuid) -> Result<()> {
        let mut batches = self.load().await?;
        let Some(batch) = batches.iter_mut().find(|b| b.id == id) else {
            bail!("Import batch '{}' not found", id);
        };
        batch.undone_at = Some(Utc::now());
        self.store(&batches).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordId, RecordKind};

    #[tokio::test]
    async fn test_save_latest_and_undo() {
        let dir = tempfile::tempdir().unwrap();
        let log = BatchLog::new(dir.path().join("nested").join("batches.json"));
        assert!(log.latest().await.unwrap().is_none());

        let first = ImportBatch::new(RecordKind::Farmer, "a.xlsx", vec![RecordId::new("r1")]);
        let second = ImportBatch::new(RecordKind::AgroProcessor, "b.xlsx", vec![RecordId::new("r2")]);
        log.save(&first).await.unwrap();
        log.save(&second).await.unwrap();

        assert_eq!(log.latest().await.unwrap().unwrap().id, second.id);

        log.mark_undone(second.id).await.unwrap();
        let latest = log.latest().await.unwrap().unwrap();
        assert_eq!(latest.id, first.id);
        assert_eq!(latest.record_ids, vec![RecordId::new("r1")]);

        log.mark_undone(first.id).await.unwrap();
        assert!(log.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_unknown_batch() {
        let dir = tempfile::tempdir().unwrap();
        let log = BatchLog::new(dir.path().join("batches.json"));
        let err = log.mark_undone(Uuid::new_v4()).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
