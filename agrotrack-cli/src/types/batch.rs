//! Persisted import batches, used to undo an import

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RecordId, RecordKind};

/// The ids produced by one import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: Uuid,
    pub kind: RecordKind,
    /// File the records came from
    pub source: String,
    /// Member ids in upload order
    pub record_ids: Vec<RecordId>,
    pub created_at: DateTime<Utc>,
    pub undone_at: Option<DateTime<Utc>>,
    /// Set when the upload stopped at a failing batch
    pub failure: Option<String>,
}

impl ImportBatch {
    pub fn new(kind: RecordKind, source: impl Into<String>, record_ids: Vec<RecordId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            source: source.into(),
            record_ids,
            created_at: Utc::now(),
            undone_at: None,
            failure: None,
        }
    }

    pub fn with_failure(mut self, failure: Option<String>) -> Self {
        self.failure = failure;
        self
    }

    pub fn is_undone(&self) -> bool {
        self.undone_at.is_some()
    }

    pub fn is_partial(&self) -> bool {
        self.failure.is_some()
    }
}
