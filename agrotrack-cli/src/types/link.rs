//! Supply-chain links between farmers and the processors they supply

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

/// A farmer supplying a commodity to an agro-processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyLink {
    pub id: String,
    pub farmer_id: RecordId,
    pub processor_id: RecordId,
    pub commodity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    pub date: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplyLink {
    pub farmer_id: RecordId,
    pub processor_id: RecordId,
    pub commodity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    pub date: String,
}

/// Which links to list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LinkFilter {
    #[default]
    All,
    Farmer(RecordId),
    Processor(RecordId),
}

impl LinkFilter {
    pub fn matches(&self, link: &SupplyLink) -> bool {
        match self {
            LinkFilter::All => true,
            LinkFilter::Farmer(id) => link.farmer_id == *id,
            LinkFilter::Processor(id) => link.processor_id == *id,
        }
    }
}
