//! Document and argument shapes of the hosted backend
//!
//! Field names follow the hosted schema (`ref`, `lat`, `lng`, `dateOfVisit`,
//! `_id`, `_creationTime`). Every function validates its arguments strictly,
//! so each argument struct carries exactly the fields its function accepts.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{
    AuditAction, AuditLogEntry, NewSupplyLink, NewVisit, Record, RecordDraft, RecordId,
    RecordKind, RecordPatch, SupplyLink, Visit,
};

/// `type` tag used on hosted visit documents
pub fn kind_type(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Farmer => "Farmer",
        RecordKind::AgroProcessor => "AgroProcessor",
    }
}

pub fn kind_from_type(tag: &str) -> Option<RecordKind> {
    match tag {
        "Farmer" => Some(RecordKind::Farmer),
        "AgroProcessor" => Some(RecordKind::AgroProcessor),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn creation_time(millis: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis as i64).unwrap_or_default()
}

/// Arguments of `farmers:bulkAddFarmers` (per element) and `farmers:updateFarmer`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerArgs {
    pub name: String,
    pub address: String,
    pub contact: String,
    pub commodities: Vec<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_visit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl From<&RecordDraft> for FarmerArgs {
    fn from(draft: &RecordDraft) -> Self {
        Self {
            name: draft.name.clone(),
            address: draft.address.clone(),
            contact: draft.contact.clone(),
            commodities: draft.commodities.clone(),
            ref_code: draft.ref_code.as_deref().and_then(non_empty),
            email: non_empty(&draft.email),
            district: non_empty(&draft.district),
            quantities: non_empty(&draft.quantities),
            date_of_visit: non_empty(&draft.date_of_visit),
            status: non_empty(&draft.status),
            lat: draft.latitude,
            lng: draft.longitude,
        }
    }
}

/// Arguments of `agroProcessors:bulkAddAgroProcessors` (per element)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorArgs {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    pub address: String,
    pub contact: String,
    pub district: String,
    pub commodities: Vec<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_code: Option<String>,
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
    #[serde(rename = "type")]
    pub kind_type: &'static str,
}

impl From<&RecordDraft> for ProcessorArgs {
    fn from(draft: &RecordDraft) -> Self {
        Self {
            name: draft.name.clone(),
            business_name: draft.business_name.as_deref().and_then(non_empty),
            address: draft.address.clone(),
            contact: draft.contact.clone(),
            district: draft.district.clone(),
            commodities: draft.commodities.clone(),
            ref_code: draft.ref_code.as_deref().and_then(non_empty),
            quantities: non_empty(&draft.quantities),
            email: non_empty(&draft.email),
            date_of_visit: non_empty(&draft.date_of_visit),
            status: non_empty(&draft.status),
            remarks: non_empty(&draft.remarks),
            kind_type: kind_type(RecordKind::AgroProcessor),
        }
    }
}

/// Arguments of `agroProcessors:updateAgroProcessor`, besides `id`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorUpdateArgs {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    pub address: String,
    pub contact: String,
    pub district: String,
    pub commodities: Vec<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<&RecordDraft> for ProcessorUpdateArgs {
    fn from(draft: &RecordDraft) -> Self {
        Self {
            name: draft.name.clone(),
            business_name: draft.business_name.as_deref().and_then(non_empty),
            address: draft.address.clone(),
            contact: draft.contact.clone(),
            district: draft.district.clone(),
            commodities: draft.commodities.clone(),
            ref_code: draft.ref_code.as_deref().and_then(non_empty),
            quantities: non_empty(&draft.quantities),
            email: non_empty(&draft.email),
        }
    }
}

/// Draft values the hosted schema has no place for on insert.
///
/// Farmer remarks survive only through the visit created alongside the
/// record, so they are lost when there is no visit date.
pub fn unstored_fields(kind: RecordKind, draft: &RecordDraft) -> Vec<&'static str> {
    let mut fields = Vec::new();
    match kind {
        RecordKind::Farmer => {
            if draft.business_name.as_deref().and_then(non_empty).is_some() {
                fields.push("business name");
            }
            if non_empty(&draft.remarks).is_some() && !draft.has_visit() {
                fields.push("remarks");
            }
        }
        RecordKind::AgroProcessor => {
            if draft.latitude.is_some() {
                fields.push("latitude");
            }
            if draft.longitude.is_some() {
                fields.push("longitude");
            }
        }
    }
    fields
}

/// Patch fields the hosted update function for `kind` does not accept
pub fn unsupported_patch_fields(kind: RecordKind, patch: &RecordPatch) -> Vec<&'static str> {
    let mut fields = Vec::new();
    let mut check = |set: bool, name: &'static str| {
        if set {
            fields.push(name);
        }
    };
    match kind {
        RecordKind::Farmer => {
            check(patch.business_name.is_some(), "business name");
            check(patch.remarks.is_some(), "remarks");
        }
        RecordKind::AgroProcessor => {
            check(patch.date_of_visit.is_some(), "date of visit");
            check(patch.status.is_some(), "status");
            check(patch.remarks.is_some(), "remarks");
            check(patch.latitude.is_some(), "latitude");
            check(patch.longitude.is_some(), "longitude");
        }
    }
    fields
}

/// A stored farmer or agro-processor document
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_creationTime", default)]
    pub creation_time: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(rename = "ref", default)]
    pub ref_code: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub commodities: Vec<String>,
    #[serde(default)]
    pub quantities: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date_of_visit: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl RecordDocument {
    pub fn into_record(self, kind: RecordKind) -> Record {
        let created_at = creation_time(self.creation_time);
        Record {
            id: RecordId(self.id),
            kind,
            fields: RecordDraft {
                name: self.name,
                business_name: self.business_name.filter(|b| !b.is_empty()),
                ref_code: self.ref_code.filter(|r| !r.is_empty()),
                address: self.address,
                contact: self.contact,
                district: self.district.unwrap_or_default(),
                commodities: self.commodities,
                quantities: self.quantities.unwrap_or_default(),
                email: self.email.unwrap_or_default(),
                date_of_visit: self.date_of_visit.unwrap_or_default(),
                status: self.status.unwrap_or_default(),
                remarks: self.remarks.unwrap_or_default(),
                latitude: self.lat,
                longitude: self.lng,
            },
            created_at,
            updated_at: created_at,
        }
    }
}

/// Arguments of `visits:addVisit`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitArgs {
    pub related_id: String,
    #[serde(rename = "type")]
    pub kind_type: &'static str,
    pub date: String,
    pub remarks: String,
}

impl From<&NewVisit> for VisitArgs {
    fn from(visit: &NewVisit) -> Self {
        Self {
            related_id: visit.related_id.0.clone(),
            kind_type: kind_type(visit.kind),
            date: visit.date.clone(),
            remarks: visit.remarks.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_creationTime", default)]
    pub creation_time: f64,
    pub related_id: String,
    #[serde(rename = "type")]
    pub kind_type: String,
    pub date: String,
    #[serde(default)]
    pub remarks: String,
}

impl VisitDocument {
    /// `None` for a visit whose type tag is not a record kind
    pub fn into_visit(self) -> Option<Visit> {
        Some(Visit {
            kind: kind_from_type(&self.kind_type)?,
            id: self.id,
            related_id: RecordId(self.related_id),
            date: self.date,
            remarks: self.remarks,
            created_at: creation_time(self.creation_time),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_creationTime", default)]
    pub creation_time: f64,
    pub action: String,
    pub table: String,
    pub record_id: String,
    #[serde(default)]
    pub before: Option<Value>,
    #[serde(default)]
    pub after: Option<Value>,
    #[serde(default)]
    pub timestamp: String,
}

impl AuditDocument {
    pub fn into_entry(self) -> Result<AuditLogEntry> {
        let action = AuditAction::parse(&self.action)
            .ok_or_else(|| anyhow!("Unknown audit action '{}'", self.action))?;
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| creation_time(self.creation_time));
        Ok(AuditLogEntry {
            id: self.id,
            action,
            table_name: self.table,
            record_id: RecordId(self.record_id),
            before: self.before,
            after: self.after,
            timestamp,
        })
    }
}

/// Arguments of `business:linkFarmerToProcessor`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkArgs {
    pub farmer_id: String,
    pub processor_id: String,
    pub commodity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    pub date: String,
}

impl From<&NewSupplyLink> for LinkArgs {
    fn from(link: &NewSupplyLink) -> Self {
        Self {
            farmer_id: link.farmer_id.0.clone(),
            processor_id: link.processor_id.0.clone(),
            commodity: link.commodity.trim().to_string(),
            volume: link.volume.as_deref().and_then(non_empty),
            date: link.date.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_creationTime", default)]
    pub creation_time: f64,
    pub farmer_id: String,
    pub processor_id: String,
    pub commodity: String,
    #[serde(default)]
    pub volume: Option<String>,
    pub date: String,
}

impl LinkDocument {
    pub fn into_link(self) -> SupplyLink {
        SupplyLink {
            id: self.id,
            farmer_id: RecordId(self.farmer_id),
            processor_id: RecordId(self.processor_id),
            commodity: self.commodity,
            volume: self.volume,
            date: self.date,
            created_at: creation_time(self.creation_time),
        }
    }
}
