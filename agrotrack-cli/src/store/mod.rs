//! Local SQLite store
//!
//! Offline-capable [`Backend`] used by default. Schema lives in
//! `migrations/` and is applied on connect.

pub mod audit;
pub mod batches;
pub mod links;
pub mod records;
pub mod visits;

use anyhow::{Context, Result, bail};
use chrono::{TimeDelta, Utc};
use async_trait::async_trait;
use log::debug;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::api::Backend;
use crate::types::{
    AuditLogEntry, ImportBatch, LinkFilter, NewSupplyLink, NewVisit, Record, RecordDraft, RecordId,
    RecordKind, RecordPatch, SupplyLink, Visit,
};

#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (creating if needed) the database at `url` and run migrations
    pub async fn connect(url: &str) -> Result<Self> {
        if let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) {
            let path = path.split('?').next().unwrap_or_default();
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && path != ":memory:" {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL '{}'", url))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", url))?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database (tests, dry experiments)
    pub async fn in_memory() -> Result<Self> {
        // A single connection kept alive forever, or the database vanishes
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        debug!("SQLite store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn insert_records(&self, kind: RecordKind, drafts: &[RecordDraft]) -> Result<Vec<RecordId>> {
        records::insert_many(&self.pool, kind, drafts).await
    }

    async fn get_record(&self, kind: RecordKind, id: &RecordId) -> Result<Option<Record>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        records::fetch(&mut conn, kind, id).await
    }

    async fn list_records(&self, kind: RecordKind) -> Result<Vec<Record>> {
        records::list(&self.pool, kind).await
    }

    async fn search_records(&self, kind: RecordKind, query: &str) -> Result<Vec<Record>> {
        records::search(&self.pool, kind, query).await
    }

    async fn update_record(&self, kind: RecordKind, id: &RecordId, patch: &RecordPatch) -> Result<Record> {
        records::update(&self.pool, kind, id, patch).await
    }

    async fn delete_record(&self, kind: RecordKind, id: &RecordId) -> Result<()> {
        records::delete(&self.pool, kind, id).await
    }

    async fn bulk_delete(&self, kind: RecordKind, ids: &[RecordId]) -> Result<usize> {
        records::delete_many(&self.pool, kind, ids).await
    }

    async fn delete_recent(&self, kind: RecordKind, minutes: u64) -> Result<usize> {
        let since = i64::try_from(minutes)
            .ok()
            .and_then(TimeDelta::try_minutes)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .with_context(|| format!("{} minutes is out of range", minutes))?;
        records::purge(&self.pool, kind, Some(since)).await
    }

    async fn delete_all(&self, kind: RecordKind) -> Result<usize> {
        records::purge(&self.pool, kind, None).await
    }

    async fn create_visit(&self, visit: &NewVisit) -> Result<Visit> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        if records::fetch(&mut conn, visit.kind, &visit.related_id).await?.is_none() {
            bail!("{} record '{}' not found", visit.kind, visit.related_id);
        }
        visits::insert(&mut conn, visit).await
    }

    async fn update_visit(&self, id: &str, date: &str, remarks: &str) -> Result<()> {
        visits::update(&self.pool, id, date, remarks).await?;
        Ok(())
    }

    async fn delete_visit(&self, id: &str) -> Result<()> {
        visits::delete(&self.pool, id).await
    }

    async fn link_supplier(&self, link: &NewSupplyLink) -> Result<SupplyLink> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        if records::fetch(&mut conn, RecordKind::Farmer, &link.farmer_id).await?.is_none() {
            bail!("Farmer record '{}' not found", link.farmer_id);
        }
        if records::fetch(&mut conn, RecordKind::AgroProcessor, &link.processor_id)
            .await?
            .is_none()
        {
            bail!("Agro-processor record '{}' not found", link.processor_id);
        }
        links::insert(&mut conn, link).await
    }

    async fn list_supply_links(&self, filter: &LinkFilter) -> Result<Vec<SupplyLink>> {
        links::list(&self.pool, filter).await
    }

    async fn list_visits(&self, related_id: Option<&RecordId>) -> Result<Vec<Visit>> {
        visits::list(&self.pool, related_id).await
    }

    async fn list_audit_log(&self, record_id: Option<&RecordId>, limit: usize) -> Result<Vec<AuditLogEntry>> {
        audit::list(&self.pool, record_id, limit).await
    }

    async fn save_import_batch(&self, batch: &ImportBatch) -> Result<()> {
        batches::save(&self.pool, batch).await
    }

    async fn last_import_batch(&self) -> Result<Option<ImportBatch>> {
        batches::latest(&self.pool).await
    }

    async fn mark_batch_undone(&self, id: Uuid) -> Result<()> {
        batches::mark_undone(&self.pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuditAction;

    fn draft(name: &str, visit: &str) -> RecordDraft {
        let mut draft = RecordDraft::new(name);
        draft.district = "Kilosa".to_string();
        draft.commodities = vec!["maize".to_string(), "beans".to_string()];
        draft.date_of_visit = visit.to_string();
        draft
    }

    #[tokio::test]
    async fn test_insert_get_list() {
        let store = SqliteBackend::in_memory().await.unwrap();
        let ids = store
            .insert_records(RecordKind::Farmer, &[draft("Alice", ""), draft("Bob", "")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let alice = store.get_record(RecordKind::Farmer, &ids[0]).await.unwrap().unwrap();
        assert_eq!(alice.fields.name, "Alice");
        assert_eq!(alice.fields.commodities, vec!["maize", "beans"]);
        assert_eq!(alice.kind, RecordKind::Farmer);

        // Kinds are separate collections
        assert!(store
            .get_record(RecordKind::AgroProcessor, &ids[0])
            .await
            .unwrap()
            .is_none());
        assert!(store.list_records(RecordKind::AgroProcessor).await.unwrap().is_empty());

        let names: Vec<String> = store
            .list_records(RecordKind::Farmer)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.fields.name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_insert_creates_visits_and_audit() {
        let store = SqliteBackend::in_memory().await.unwrap();
        let ids = store
            .insert_records(RecordKind::Farmer, &[draft("Alice", "2024-03-01"), draft("Bob", "")])
            .await
            .unwrap();

        let visits = store.list_visits(None).await.unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].related_id, ids[0]);
        assert_eq!(visits[0].date, "2024-03-01");

        let audit = store.list_audit_log(None, 10).await.unwrap();
        assert_eq!(audit.len(), 2);
        assert!(audit.iter().all(|e| e.action == AuditAction::Create));
        assert!(audit.iter().all(|e| e.before.is_none() && e.after.is_some()));
        assert_eq!(audit[0].table_name, "farmers");
        // Newest first
        assert_eq!(audit[0].record_id, ids[1]);
    }

    #[tokio::test]
    async fn test_update_audits_before_and_after() {
        let store = SqliteBackend::in_memory().await.unwrap();
        let ids = store
            .insert_records(RecordKind::Farmer, &[draft("Alice", "")])
            .await
            .unwrap();

        let patch = RecordPatch {
            district: Some("Mvomero".to_string()),
            ..Default::default()
        };
        let updated = store.update_record(RecordKind::Farmer, &ids[0], &patch).await.unwrap();
        assert_eq!(updated.fields.district, "Mvomero");
        assert!(updated.updated_at >= updated.created_at);

        let entries = store.list_audit_log(Some(&ids[0]), 10).await.unwrap();
        assert_eq!(entries[0].action, AuditAction::Update);
        assert_eq!(entries[0].before.as_ref().unwrap()["district"], "Kilosa");
        assert_eq!(entries[0].after.as_ref().unwrap()["district"], "Mvomero");

        let missing = store
            .update_record(RecordKind::Farmer, &RecordId::new("nope"), &patch)
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_bulk_delete() {
        let store = SqliteBackend::in_memory().await.unwrap();
        let ids = store
            .insert_records(
                RecordKind::Farmer,
                &[draft("Alice", "2024-01-01"), draft("Bob", ""), draft("Cara", "")],
            )
            .await
            .unwrap();

        store.delete_record(RecordKind::Farmer, &ids[0]).await.unwrap();
        assert!(store.list_visits(Some(&ids[0])).await.unwrap().is_empty());
        assert!(store.delete_record(RecordKind::Farmer, &ids[0]).await.is_err());

        // Already-deleted ids are ignored
        let deleted = store.bulk_delete(RecordKind::Farmer, &ids).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.list_records(RecordKind::Farmer).await.unwrap().is_empty());

        let deletes = store
            .list_audit_log(None, 100)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.action == AuditAction::Delete)
            .count();
        assert_eq!(deletes, 3);
    }

    #[tokio::test]
    async fn test_create_visit_requires_record() {
        let store = SqliteBackend::in_memory().await.unwrap();
        let ids = store
            .insert_records(RecordKind::AgroProcessor, &[draft("Mill Co", "")])
            .await
            .unwrap();

        let visit = NewVisit {
            related_id: ids[0].clone(),
            kind: RecordKind::AgroProcessor,
            date: "2024-05-05".to_string(),
            remarks: "Checked stock".to_string(),
        };
        let stored = store.create_visit(&visit).await.unwrap();
        assert_eq!(stored.kind, RecordKind::AgroProcessor);

        let orphan = NewVisit {
            related_id: RecordId::new("ghost"),
            ..visit
        };
        assert!(store.create_visit(&orphan).await.is_err());
    }

    #[tokio::test]
    async fn test_search_records() {
        let store = SqliteBackend::in_memory().await.unwrap();
        store
            .insert_records(
                RecordKind::Farmer,
                &[draft("Amina Juma", ""), draft("Baraka Mollel", ""), draft("Juma Said", "")],
            )
            .await
            .unwrap();

        let found: Vec<String> = store
            .search_records(RecordKind::Farmer, "JUMA")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.fields.name)
            .collect();
        assert_eq!(found, vec!["Amina Juma", "Juma Said"]);
        assert!(store
            .search_records(RecordKind::AgroProcessor, "juma")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_edit_and_delete_visit() {
        let store = SqliteBackend::in_memory().await.unwrap();
        let ids = store
            .insert_records(RecordKind::Farmer, &[draft("Alice", "2024-03-01")])
            .await
            .unwrap();
        let visit = store.list_visits(Some(&ids[0])).await.unwrap().remove(0);

        store
            .update_visit(&visit.id, "2024-03-02", "Follow-up on seed supply")
            .await
            .unwrap();
        let edited = store.list_visits(Some(&ids[0])).await.unwrap().remove(0);
        assert_eq!(edited.date, "2024-03-02");
        assert_eq!(edited.remarks, "Follow-up on seed supply");

        store.delete_visit(&visit.id).await.unwrap();
        assert!(store.list_visits(None).await.unwrap().is_empty());
        assert!(store.delete_visit(&visit.id).await.is_err());
        assert!(store.update_visit("ghost", "2024-01-01", "").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_recent_and_all() {
        let store = SqliteBackend::in_memory().await.unwrap();
        store
            .insert_records(RecordKind::Farmer, &[draft("Alice", "2024-01-01"), draft("Bob", "")])
            .await
            .unwrap();
        store
            .insert_records(RecordKind::AgroProcessor, &[draft("Mill Co", "")])
            .await
            .unwrap();

        // Everything was created just now
        assert_eq!(store.delete_recent(RecordKind::Farmer, 10).await.unwrap(), 2);
        assert!(store.list_visits(None).await.unwrap().is_empty());
        assert_eq!(store.delete_recent(RecordKind::Farmer, 10).await.unwrap(), 0);

        assert_eq!(store.delete_all(RecordKind::AgroProcessor).await.unwrap(), 1);
        assert!(store.list_records(RecordKind::AgroProcessor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_supply_links() {
        let store = SqliteBackend::in_memory().await.unwrap();
        let farmers = store
            .insert_records(RecordKind::Farmer, &[draft("Alice", ""), draft("Bob", "")])
            .await
            .unwrap();
        let processors = store
            .insert_records(RecordKind::AgroProcessor, &[draft("Mill Co", "")])
            .await
            .unwrap();

        let link = NewSupplyLink {
            farmer_id: farmers[0].clone(),
            processor_id: processors[0].clone(),
            commodity: "maize".to_string(),
            volume: Some("2 t".to_string()),
            date: "2024-06-01".to_string(),
        };
        let stored = store.link_supplier(&link).await.unwrap();
        assert_eq!(stored.commodity, "maize");
        store
            .link_supplier(&NewSupplyLink {
                farmer_id: farmers[1].clone(),
                volume: None,
                ..link.clone()
            })
            .await
            .unwrap();

        let for_processor = store
            .list_supply_links(&LinkFilter::Processor(processors[0].clone()))
            .await
            .unwrap();
        assert_eq!(for_processor.len(), 2);
        let for_alice = store
            .list_supply_links(&LinkFilter::Farmer(farmers[0].clone()))
            .await
            .unwrap();
        assert_eq!(for_alice, vec![stored]);

        // Sides must have the right kinds
        let swapped = NewSupplyLink {
            farmer_id: processors[0].clone(),
            processor_id: farmers[0].clone(),
            ..link
        };
        assert!(store.link_supplier(&swapped).await.is_err());

        // Deleting a record drops its links
        store.delete_record(RecordKind::Farmer, &farmers[0]).await.unwrap();
        assert_eq!(store.list_supply_links(&LinkFilter::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_batch_lifecycle() {
        let store = SqliteBackend::in_memory().await.unwrap();
        assert!(store.last_import_batch().await.unwrap().is_none());

        let ids = vec![RecordId::new("b"), RecordId::new("a"), RecordId::new("c")];
        let batch = ImportBatch::new(RecordKind::Farmer, "farmers.xlsx", ids.clone())
            .with_failure(Some("batch 2 failed".to_string()));
        store.save_import_batch(&batch).await.unwrap();

        let latest = store.last_import_batch().await.unwrap().unwrap();
        assert_eq!(latest.id, batch.id);
        assert_eq!(latest.record_ids, ids);
        assert!(latest.is_partial());

        store.mark_batch_undone(batch.id).await.unwrap();
        assert!(store.last_import_batch().await.unwrap().is_none());
        assert!(store.mark_batch_undone(batch.id).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agrotrack.db");
        let url = format!("sqlite://{}", path.display());

        let store = SqliteBackend::connect(&url).await.unwrap();
        store
            .insert_records(RecordKind::Farmer, &[draft("Alice", "")])
            .await
            .unwrap();
        assert!(path.exists());
    }
}
