//! Farmer and agro-processor records

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Kind of record tracked by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Individual farmer
    #[value(name = "farmer", alias = "farmers")]
    Farmer,
    /// Agro-processing business
    #[value(name = "processor", alias = "agro-processor", alias = "processors")]
    AgroProcessor,
}

impl RecordKind {
    /// Backend table (collection) name for this kind
    pub fn table_name(&self) -> &'static str {
        match self {
            RecordKind::Farmer => "farmers",
            RecordKind::AgroProcessor => "agroProcessors",
        }
    }

    /// Tag stored on visits and import batches
    pub fn tag(&self) -> &'static str {
        match self {
            RecordKind::Farmer => "farmer",
            RecordKind::AgroProcessor => "agro_processor",
        }
    }

    /// Parse a stored tag back into a kind
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "farmer" => Some(RecordKind::Farmer),
            "agro_processor" => Some(RecordKind::AgroProcessor),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Farmer => write!(f, "Farmer"),
            RecordKind::AgroProcessor => write!(f, "Agro-processor"),
        }
    }
}

/// Backend-assigned record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Record contents without an identity.
///
/// Produced by the import normalizer and by `records add`; the backend
/// assigns the id on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub name: String,
    /// Only meaningful for agro-processors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_code: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub commodities: Vec<String>,
    #[serde(default)]
    pub quantities: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date_of_visit: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl RecordDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Case-insensitive match of `query` against the name and business name
    pub fn matches_name(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }
        self.name.to_lowercase().contains(&query)
            || self
                .business_name
                .as_deref()
                .is_some_and(|b| b.to_lowercase().contains(&query))
    }

    /// Whether creating this record should also create a visit
    pub fn has_visit(&self) -> bool {
        !self.date_of_visit.trim().is_empty()
    }
}

/// A stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub kind: RecordKind,
    #[serde(flatten)]
    pub fields: RecordDraft,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Name shown in listings: business name for processors when present
    pub fn display_name(&self) -> &str {
        match (&self.kind, &self.fields.business_name) {
            (RecordKind::AgroProcessor, Some(business)) if !business.is_empty() => business,
            _ => &self.fields.name,
        }
    }
}

/// Partial update of a record. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commodities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_visit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl RecordPatch {
    /// Set commodities from raw comma-separated text
    pub fn with_commodities(mut self, raw: &str) -> Self {
        self.commodities = Some(split_commodities(raw));
        self
    }

    /// Check whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == RecordPatch::default()
    }

    /// Apply this patch to a draft in place
    pub fn apply(&self, draft: &mut RecordDraft) {
        if let Some(v) = &self.name {
            draft.name = v.trim().to_string();
        }
        if let Some(v) = &self.business_name {
            draft.business_name = Some(v.clone()).filter(|s| !s.is_empty());
        }
        if let Some(v) = &self.ref_code {
            draft.ref_code = Some(v.clone()).filter(|s| !s.is_empty());
        }
        if let Some(v) = &self.address {
            draft.address = v.clone();
        }
        if let Some(v) = &self.contact {
            draft.contact = v.clone();
        }
        if let Some(v) = &self.district {
            draft.district = v.clone();
        }
        if let Some(v) = &self.commodities {
            // Re-split so entries containing commas still obey the invariant
            draft.commodities = split_commodities(&join_commodities(v));
        }
        if let Some(v) = &self.quantities {
            draft.quantities = v.clone();
        }
        if let Some(v) = &self.email {
            draft.email = v.clone();
        }
        if let Some(v) = &self.date_of_visit {
            draft.date_of_visit = v.clone();
        }
        if let Some(v) = &self.status {
            draft.status = v.clone();
        }
        if let Some(v) = &self.remarks {
            draft.remarks = v.clone();
        }
        if let Some(v) = self.latitude {
            draft.latitude = Some(v);
        }
        if let Some(v) = self.longitude {
            draft.longitude = Some(v);
        }
    }
}

/// Split a comma-separated commodity string into trimmed, non-empty entries
pub fn split_commodities(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Join commodities back into display form
pub fn join_commodities(commodities: &[String]) -> String {
    commodities.join(", ")
}
