//! Domain types shared by the importer, the backends and the CLI

pub mod audit;
pub mod batch;
pub mod link;
pub mod record;
pub mod visit;

pub use audit::{AuditAction, AuditLogEntry};
pub use batch::ImportBatch;
pub use link::{LinkFilter, NewSupplyLink, SupplyLink};
pub use record::{
    Record, RecordDraft, RecordId, RecordKind, RecordPatch, join_commodities, split_commodities,
};
pub use visit::{NewVisit, Visit};
