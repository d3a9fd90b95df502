//! Storage backend contract
//!
//! Implemented by the hosted document database client (`HttpBackend`) and by
//! the local SQLite store. Single-record mutations are expected to write their
//! audit entries, and creates to add a visit when the draft carries a visit
//! date.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::types::{
    AuditLogEntry, ImportBatch, LinkFilter, NewSupplyLink, NewVisit, Record, RecordDraft, RecordId,
    RecordKind, RecordPatch, SupplyLink, Visit,
};

#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &'static str;

    /// Insert records; returns their new ids in input order
    async fn insert_records(&self, kind: RecordKind, drafts: &[RecordDraft]) -> Result<Vec<RecordId>>;

    async fn get_record(&self, kind: RecordKind, id: &RecordId) -> Result<Option<Record>>;

    /// All records of a kind, in insertion order
    async fn list_records(&self, kind: RecordKind) -> Result<Vec<Record>>;

    /// Records whose name or business name contains `query`
    async fn search_records(&self, kind: RecordKind, query: &str) -> Result<Vec<Record>>;

    async fn update_record(&self, kind: RecordKind, id: &RecordId, patch: &RecordPatch) -> Result<Record>;

    async fn delete_record(&self, kind: RecordKind, id: &RecordId) -> Result<()>;

    /// Delete many records; ids that no longer exist are ignored.
    /// Returns the number actually deleted.
    async fn bulk_delete(&self, kind: RecordKind, ids: &[RecordId]) -> Result<usize>;

    /// Delete records created in the last `minutes` minutes; returns the count
    async fn delete_recent(&self, kind: RecordKind, minutes: u64) -> Result<usize>;

    /// Delete every record of a kind; returns the count
    async fn delete_all(&self, kind: RecordKind) -> Result<usize>;

    async fn create_visit(&self, visit: &NewVisit) -> Result<Visit>;

    /// Replace a visit's date and remarks
    async fn update_visit(&self, id: &str, date: &str, remarks: &str) -> Result<()>;

    async fn delete_visit(&self, id: &str) -> Result<()>;

    /// Visits, newest first, optionally for one record
    async fn list_visits(&self, related_id: Option<&RecordId>) -> Result<Vec<Visit>>;

    /// Audit entries, newest first
    async fn list_audit_log(&self, record_id: Option<&RecordId>, limit: usize) -> Result<Vec<AuditLogEntry>>;

    /// Record that a farmer supplies a processor
    async fn link_supplier(&self, link: &NewSupplyLink) -> Result<SupplyLink>;

    async fn list_supply_links(&self, filter: &LinkFilter) -> Result<Vec<SupplyLink>>;

    async fn save_import_batch(&self, batch: &ImportBatch) -> Result<()>;

    /// Most recent import batch that has not been undone
    async fn last_import_batch(&self) -> Result<Option<ImportBatch>>;

    async fn mark_batch_undone(&self, id: Uuid) -> Result<()>;
}
