//! Visit history entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RecordDraft, RecordId, RecordKind};

/// A recorded field visit to a farmer or processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: String,
    pub related_id: RecordId,
    /// Kind of the related record
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub date: String,
    #[serde(default)]
    pub remarks: String,
    pub created_at: DateTime<Utc>,
}

/// Visit to be created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisit {
    pub related_id: RecordId,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub date: String,
    #[serde(default)]
    pub remarks: String,
}

impl NewVisit {
    /// Derive the visit that accompanies a newly created record, if any
    pub fn from_draft(related_id: &RecordId, kind: RecordKind, draft: &RecordDraft) -> Option<Self> {
        if !draft.has_visit() {
            return None;
        }
        Some(Self {
            related_id: related_id.clone(),
            kind,
            date: draft.date_of_visit.trim().to_string(),
            remarks: draft.remarks.clone(),
        })
    }
}
