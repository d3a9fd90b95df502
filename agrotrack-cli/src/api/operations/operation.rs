//! Backend function calls
//!
//! Each operation maps onto one function of the hosted backend, addressed as
//! `<module>:<function>` and called with a JSON `args` object shaped the way
//! that function validates it.

use serde_json::{Value, json};

use crate::api::wire::{FarmerArgs, LinkArgs, ProcessorArgs, ProcessorUpdateArgs, VisitArgs};
use crate::types::{LinkFilter, NewSupplyLink, NewVisit, RecordDraft, RecordId, RecordKind};

/// A single call against the hosted backend
#[derive(Debug, Clone)]
pub enum Operation {
    /// Insert many records in one call; returns their ids
    BulkAdd {
        kind: RecordKind,
        records: Vec<RecordDraft>,
    },
    /// All records of a kind
    List { kind: RecordKind },
    /// Farmers whose name matches a query
    SearchFarmers { query: String },
    /// Replace every field of a record
    Update {
        kind: RecordKind,
        id: RecordId,
        fields: RecordDraft,
    },
    Delete { kind: RecordKind, id: RecordId },
    /// Delete many records; returns null
    BulkDelete { kind: RecordKind, ids: Vec<RecordId> },
    /// Delete records created in the last `minutes`; returns the count
    DeleteRecent { kind: RecordKind, minutes: u64 },
    /// Delete every record of a kind; returns the count
    DeleteAll { kind: RecordKind },
    AddVisit { visit: NewVisit },
    GetVisits { related_id: RecordId },
    GetAllVisits,
    UpdateVisit {
        id: String,
        date: String,
        remarks: String,
    },
    DeleteVisit { id: String },
    /// Newest 100 entries, or every entry of one record
    GetAuditLogs { record_id: Option<RecordId> },
    LinkFarmerToProcessor { link: NewSupplyLink },
    GetSupplyChain { filter: LinkFilter },
}

impl Operation {
    pub fn bulk_add(kind: RecordKind, records: Vec<RecordDraft>) -> Self {
        Self::BulkAdd { kind, records }
    }

    pub fn delete(kind: RecordKind, id: RecordId) -> Self {
        Self::Delete { kind, id }
    }

    pub fn bulk_delete(kind: RecordKind, ids: Vec<RecordId>) -> Self {
        Self::BulkDelete { kind, ids }
    }

    /// Backend module the function lives in
    pub fn module(&self) -> &'static str {
        match self {
            Self::BulkAdd { kind, .. }
            | Self::List { kind }
            | Self::Update { kind, .. }
            | Self::Delete { kind, .. }
            | Self::BulkDelete { kind, .. }
            | Self::DeleteRecent { kind, .. }
            | Self::DeleteAll { kind } => kind.table_name(),
            Self::SearchFarmers { .. } => RecordKind::Farmer.table_name(),
            Self::AddVisit { .. }
            | Self::GetVisits { .. }
            | Self::GetAllVisits
            | Self::UpdateVisit { .. }
            | Self::DeleteVisit { .. } => "visits",
            Self::GetAuditLogs { .. }
            | Self::LinkFarmerToProcessor { .. }
            | Self::GetSupplyChain { .. } => "business",
        }
    }

    /// Function name within the module
    pub fn function(&self) -> &'static str {
        use RecordKind::{AgroProcessor, Farmer};
        match self {
            Self::BulkAdd { kind: Farmer, .. } => "bulkAddFarmers",
            Self::BulkAdd { kind: AgroProcessor, .. } => "bulkAddAgroProcessors",
            Self::List { kind: Farmer } => "getFarmers",
            Self::List { kind: AgroProcessor } => "getAgroProcessors",
            Self::SearchFarmers { .. } => "searchFarmers",
            Self::Update { kind: Farmer, .. } => "updateFarmer",
            Self::Update { kind: AgroProcessor, .. } => "updateAgroProcessor",
            Self::Delete { kind: Farmer, .. } => "deleteFarmer",
            Self::Delete { kind: AgroProcessor, .. } => "deleteAgroProcessor",
            Self::BulkDelete { kind: Farmer, .. } => "bulkDeleteFarmers",
            Self::BulkDelete { kind: AgroProcessor, .. } => "bulkDeleteAgroProcessors",
            Self::DeleteRecent { .. } => "deleteRecent",
            Self::DeleteAll { .. } => "deleteAll",
            Self::AddVisit { .. } => "addVisit",
            Self::GetVisits { .. } => "getVisits",
            Self::GetAllVisits => "getAllVisits",
            Self::UpdateVisit { .. } => "updateVisit",
            Self::DeleteVisit { .. } => "deleteVisit",
            Self::GetAuditLogs { .. } => "getAuditLogs",
            Self::LinkFarmerToProcessor { .. } => "linkFarmerToProcessor",
            Self::GetSupplyChain { .. } => "getSupplyChain",
        }
    }

    /// Full function path, e.g. "farmers:bulkAddFarmers"
    pub fn path(&self) -> String {
        format!("{}:{}", self.module(), self.function())
    }

    /// Whether this call changes data (mutation endpoint) or only reads (query endpoint)
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::List { .. }
                | Self::SearchFarmers { .. }
                | Self::GetVisits { .. }
                | Self::GetAllVisits
                | Self::GetAuditLogs { .. }
                | Self::GetSupplyChain { .. }
        )
    }

    /// Get the operation type as a string
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::BulkAdd { .. } => "bulk_add",
            Self::List { .. } => "list",
            Self::SearchFarmers { .. } => "search",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::BulkDelete { .. } => "bulk_delete",
            Self::DeleteRecent { .. } => "delete_recent",
            Self::DeleteAll { .. } => "delete_all",
            Self::AddVisit { .. } => "add_visit",
            Self::GetVisits { .. } | Self::GetAllVisits => "list_visits",
            Self::UpdateVisit { .. } => "update_visit",
            Self::DeleteVisit { .. } => "delete_visit",
            Self::GetAuditLogs { .. } => "list_audit_log",
            Self::LinkFarmerToProcessor { .. } => "link",
            Self::GetSupplyChain { .. } => "list_links",
        }
    }

    /// Function arguments as JSON
    pub fn args(&self) -> Value {
        match self {
            Self::BulkAdd {
                kind: RecordKind::Farmer,
                records,
            } => {
                let farmers: Vec<FarmerArgs> = records.iter().map(FarmerArgs::from).collect();
                json!({ "farmers": farmers })
            }
            Self::BulkAdd {
                kind: RecordKind::AgroProcessor,
                records,
            } => {
                let processors: Vec<ProcessorArgs> =
                    records.iter().map(ProcessorArgs::from).collect();
                json!({ "processors": processors })
            }
            Self::List { .. } | Self::GetAllVisits | Self::DeleteAll { .. } => json!({}),
            Self::SearchFarmers { query } => json!({ "query": query }),
            Self::Update { kind, id, fields } => {
                let mut args = match kind {
                    RecordKind::Farmer => json!(FarmerArgs::from(fields)),
                    RecordKind::AgroProcessor => json!(ProcessorUpdateArgs::from(fields)),
                };
                args["id"] = json!(id);
                args
            }
            Self::Delete { id, .. } => json!({ "id": id }),
            Self::BulkDelete { ids, .. } => json!({ "ids": ids }),
            Self::DeleteRecent { minutes, .. } => json!({ "minutes": minutes }),
            Self::AddVisit { visit } => json!(VisitArgs::from(visit)),
            Self::GetVisits { related_id } => json!({ "relatedId": related_id }),
            Self::UpdateVisit { id, date, remarks } => {
                json!({ "id": id, "date": date, "remarks": remarks })
            }
            Self::DeleteVisit { id } => json!({ "id": id }),
            Self::GetAuditLogs { record_id } => match record_id {
                Some(id) => json!({ "recordId": id }),
                None => json!({}),
            },
            Self::LinkFarmerToProcessor { link } => json!(LinkArgs::from(link)),
            Self::GetSupplyChain { filter } => match filter {
                LinkFilter::All => json!({}),
                LinkFilter::Farmer(id) => json!({ "farmerId": id }),
                LinkFilter::Processor(id) => json!({ "processorId": id }),
            },
        }
    }

    /// Request body for the function endpoint
    pub fn request_body(&self) -> Value {
        json!({
            "path": self.path(),
            "args": self.args(),
            "format": "json",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let op = Operation::bulk_add(RecordKind::Farmer, vec![]);
        assert_eq!(op.path(), "farmers:bulkAddFarmers");
        assert!(op.is_mutation());

        let op = Operation::List {
            kind: RecordKind::AgroProcessor,
        };
        assert_eq!(op.path(), "agroProcessors:getAgroProcessors");
        assert!(!op.is_mutation());

        assert_eq!(
            Operation::delete(RecordKind::Farmer, RecordId::new("x")).path(),
            "farmers:deleteFarmer"
        );
        assert_eq!(
            Operation::DeleteAll {
                kind: RecordKind::AgroProcessor
            }
            .path(),
            "agroProcessors:deleteAll"
        );
        assert_eq!(Operation::GetAllVisits.path(), "visits:getAllVisits");
        assert_eq!(
            Operation::GetSupplyChain {
                filter: LinkFilter::All
            }
            .path(),
            "business:getSupplyChain"
        );
        assert!(
            !Operation::SearchFarmers {
                query: "a".to_string()
            }
            .is_mutation()
        );
    }

    #[test]
    fn test_bulk_add_body() {
        let mut draft = RecordDraft::new("Alice");
        draft.commodities = vec!["maize".to_string()];
        draft.date_of_visit = "2024-01-02".to_string();
        draft.ref_code = Some("F-1".to_string());
        draft.latitude = Some(-6.5);
        let body = Operation::bulk_add(RecordKind::Farmer, vec![draft.clone()]).request_body();

        assert_eq!(body["path"], "farmers:bulkAddFarmers");
        assert_eq!(body["format"], "json");
        let farmer = &body["args"]["farmers"][0];
        assert_eq!(farmer["name"], "Alice");
        assert_eq!(farmer["ref"], "F-1");
        assert_eq!(farmer["lat"], -6.5);
        assert_eq!(farmer["dateOfVisit"], "2024-01-02");
        assert!(farmer.get("refCode").is_none());
        assert!(farmer.get("remarks").is_none());

        draft.district = "Kilosa".to_string();
        let args = Operation::bulk_add(RecordKind::AgroProcessor, vec![draft]).args();
        let processor = &args["processors"][0];
        assert_eq!(processor["district"], "Kilosa");
        assert_eq!(processor["type"], "AgroProcessor");
        assert!(processor.get("lat").is_none());
    }

    #[test]
    fn test_update_sends_full_record() {
        let mut fields = RecordDraft::new("Alice");
        fields.district = "Mvomero".to_string();
        let args = Operation::Update {
            kind: RecordKind::Farmer,
            id: RecordId::new("r1"),
            fields,
        }
        .args();
        assert_eq!(args["id"], "r1");
        assert_eq!(args["name"], "Alice");
        assert_eq!(args["district"], "Mvomero");
        assert_eq!(args["commodities"], json!([]));
        assert!(args.get("patch").is_none());
    }

    #[test]
    fn test_optional_filters() {
        let args = Operation::GetAuditLogs { record_id: None }.args();
        assert_eq!(args, json!({}));

        let args = Operation::GetAuditLogs {
            record_id: Some(RecordId::new("r9")),
        }
        .args();
        assert_eq!(args, json!({ "recordId": "r9" }));

        let args = Operation::GetSupplyChain {
            filter: LinkFilter::Processor(RecordId::new("p1")),
        }
        .args();
        assert_eq!(args, json!({ "processorId": "p1" }));
    }

    #[test]
    fn test_visit_args() {
        let visit = NewVisit {
            related_id: RecordId::new("r1"),
            kind: RecordKind::AgroProcessor,
            date: "2024-03-01".to_string(),
            remarks: "Follow-up".to_string(),
        };
        let args = Operation::AddVisit { visit }.args();
        assert_eq!(
            args,
            json!({
                "relatedId": "r1",
                "type": "AgroProcessor",
                "date": "2024-03-01",
                "remarks": "Follow-up",
            })
        );
    }
}
