//! Client for the hosted document database
//!
//! Functions are invoked over HTTP:
//! - mutations: `POST {url}/api/mutation`
//! - queries:   `POST {url}/api/query`
//!
//! with body `{"path": "<module>:<function>", "args": {...}, "format": "json"}`.
//! Responses are `{"status": "success", "value": ...}` or
//! `{"status": "error", "errorMessage": "..."}`.
//!
//! Queries are retried on any transient failure. Mutations are retried only
//! when the request never left this machine, since a 5xx or timeout may come
//! after the write was applied.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

use super::Backend;
use super::batch_log::BatchLog;
use super::error::{FunctionError, HttpStatusError};
use super::operations::Operation;
use super::resilience::{ResilienceConfig, RetryPolicy, RetryableError};
use super::wire::{self, AuditDocument, LinkDocument, RecordDocument, VisitDocument};
use crate::types::{
    AuditLogEntry, ImportBatch, LinkFilter, NewSupplyLink, NewVisit, Record, RecordDraft,
    RecordId, RecordKind, RecordPatch, SupplyLink, Visit,
};

#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    resilience: ResilienceConfig,
    retry: RetryPolicy,
    batches: BatchLog,
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        resilience: ResilienceConfig,
        batches: BatchLog,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("Backend URL must start with http:// or https://, got '{}'", base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(resilience.timeout)
            .user_agent(concat!("agrotrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            retry: RetryPolicy::new(resilience.retry.clone()),
            resilience,
            batches,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, operation: &Operation) -> String {
        let kind = if operation.is_mutation() { "mutation" } else { "query" };
        format!("{}/api/{}", self.base_url, kind)
    }

    /// Execute an operation, retrying failures that are safe to resend
    pub async fn execute(&self, operation: &Operation) -> Result<Value> {
        let url = self.endpoint(operation);
        let body = operation.request_body();
        let path = operation.path();
        let started = Instant::now();

        let result = if operation.is_mutation() {
            self.retry
                .execute_if(&path, |e| e.is_unsent(), || self.send(&url, &path, &body))
                .await
        } else {
            self.retry
                .execute(&path, || self.send(&url, &path, &body))
                .await
        };

        let elapsed = started.elapsed();
        if self.resilience.monitoring.request_logging {
            debug!(
                "{} {} in {:.0}ms ({})",
                operation.operation_type(),
                path,
                elapsed.as_secs_f64() * 1000.0,
                if result.is_ok() { "ok" } else { "failed" }
            );
        }
        if elapsed > self.resilience.monitoring.slow_request_threshold {
            warn!("Slow backend call: {} took {:.1}s", path, elapsed.as_secs_f64());
        }

        result
    }

    async fn execute_as<T: DeserializeOwned>(&self, operation: &Operation) -> Result<T> {
        let value = self.execute(operation).await?;
        serde_json::from_value(value)
            .with_context(|| format!("Unexpected response shape from {}", operation.path()))
    }

    /// Functions that answer with a row count
    async fn execute_count(&self, operation: &Operation) -> Result<usize> {
        let count: f64 = self.execute_as(operation).await?;
        Ok(count.max(0.0) as usize)
    }

    async fn send(&self, url: &str, path: &str, body: &Value) -> Result<Value> {
        let mut request = self.http.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach backend at {}", url))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read backend response")?;

        if !status.is_success() {
            return Err(HttpStatusError {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        parse_response(path, &text)
    }
}

/// Extract the value from a function response envelope
pub fn parse_response(path: &str, text: &str) -> Result<Value> {
    let envelope: Value = serde_json::from_str(text)
        .with_context(|| format!("Backend returned invalid JSON for {}", path))?;

    match envelope.get("status").and_then(Value::as_str) {
        Some("success") => Ok(envelope.get("value").cloned().unwrap_or(Value::Null)),
        Some("error") => {
            let message = envelope
                .get("errorMessage")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(FunctionError {
                path: path.to_string(),
                message,
            }
            .into())
        }
        other => Err(anyhow!(
            "Backend response for {} has unexpected status {:?}",
            path,
            other
        )),
    }
}

fn newest_first(visits: &mut [Visit]) {
    visits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn insert_records(&self, kind: RecordKind, drafts: &[RecordDraft]) -> Result<Vec<RecordId>> {
        let unstored: HashSet<&str> = drafts
            .iter()
            .flat_map(|d| wire::unstored_fields(kind, d))
            .collect();
        if !unstored.is_empty() {
            let mut names: Vec<&str> = unstored.into_iter().collect();
            names.sort_unstable();
            warn!(
                "The hosted {} table has no place for {}; those values are dropped",
                kind.table_name(),
                names.join(", ")
            );
        }

        let ids: Vec<RecordId> = self
            .execute_as(&Operation::bulk_add(kind, drafts.to_vec()))
            .await?;

        // bulkAddAgroProcessors records its own visits; bulkAddFarmers does not
        if kind == RecordKind::Farmer && ids.len() == drafts.len() {
            for (id, draft) in ids.iter().zip(drafts) {
                let Some(visit) = NewVisit::from_draft(id, kind, draft) else {
                    continue;
                };
                if let Err(e) = self.execute(&Operation::AddVisit { visit }).await {
                    warn!("Failed to record visit for farmer {}: {:#}", id, e);
                }
            }
        }

        Ok(ids)
    }

    async fn get_record(&self, kind: RecordKind, id: &RecordId) -> Result<Option<Record>> {
        let records = self.list_records(kind).await?;
        Ok(records.into_iter().find(|r| r.id == *id))
    }

    async fn list_records(&self, kind: RecordKind) -> Result<Vec<Record>> {
        let documents: Vec<RecordDocument> = self.execute_as(&Operation::List { kind }).await?;
        Ok(documents.into_iter().map(|d| d.into_record(kind)).collect())
    }

    async fn search_records(&self, kind: RecordKind, query: &str) -> Result<Vec<Record>> {
        match kind {
            RecordKind::Farmer => {
                let documents: Vec<RecordDocument> = self
                    .execute_as(&Operation::SearchFarmers {
                        query: query.trim().to_string(),
                    })
                    .await?;
                Ok(documents.into_iter().map(|d| d.into_record(kind)).collect())
            }
            // No hosted search for processors
            RecordKind::AgroProcessor => {
                let records = self.list_records(kind).await?;
                Ok(records
                    .into_iter()
                    .filter(|r| r.fields.matches_name(query))
                    .collect())
            }
        }
    }

    async fn update_record(&self, kind: RecordKind, id: &RecordId, patch: &RecordPatch) -> Result<Record> {
        let unsupported = wire::unsupported_patch_fields(kind, patch);
        if !unsupported.is_empty() {
            bail!(
                "The hosted {} table cannot update {}",
                kind.table_name(),
                unsupported.join(", ")
            );
        }

        let Some(mut record) = self.get_record(kind, id).await? else {
            bail!("{} '{}' not found", kind, id);
        };
        patch.apply(&mut record.fields);

        self.execute(&Operation::Update {
            kind,
            id: id.clone(),
            fields: record.fields.clone(),
        })
        .await?;

        record.updated_at = Utc::now();
        Ok(record)
    }

    async fn delete_record(&self, kind: RecordKind, id: &RecordId) -> Result<()> {
        self.execute(&Operation::delete(kind, id.clone())).await?;
        Ok(())
    }

    async fn bulk_delete(&self, kind: RecordKind, ids: &[RecordId]) -> Result<usize> {
        let existing: HashSet<RecordId> = self
            .list_records(kind)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        let present: Vec<RecordId> = ids
            .iter()
            .filter(|id| existing.contains(*id))
            .cloned()
            .collect();
        if present.len() < ids.len() {
            debug!("{} of {} ids no longer exist", ids.len() - present.len(), ids.len());
        }
        if present.is_empty() {
            return Ok(0);
        }

        // Answers null
        self.execute(&Operation::bulk_delete(kind, present.clone()))
            .await?;
        Ok(present.len())
    }

    async fn delete_recent(&self, kind: RecordKind, minutes: u64) -> Result<usize> {
        self.execute_count(&Operation::DeleteRecent { kind, minutes })
            .await
    }

    async fn delete_all(&self, kind: RecordKind) -> Result<usize> {
        self.execute_count(&Operation::DeleteAll { kind }).await
    }

    async fn create_visit(&self, visit: &NewVisit) -> Result<Visit> {
        if self.get_record(visit.kind, &visit.related_id).await?.is_none() {
            bail!("{} '{}' not found", visit.kind, visit.related_id);
        }

        self.execute(&Operation::AddVisit {
            visit: visit.clone(),
        })
        .await?;

        // addVisit answers null; read the visit back
        let visits = self.list_visits(Some(&visit.related_id)).await?;
        visits
            .into_iter()
            .find(|v| v.kind == visit.kind && v.date == visit.date && v.remarks == visit.remarks)
            .ok_or_else(|| anyhow!("Visit was recorded but could not be read back"))
    }

    async fn update_visit(&self, id: &str, date: &str, remarks: &str) -> Result<()> {
        self.execute(&Operation::UpdateVisit {
            id: id.to_string(),
            date: date.trim().to_string(),
            remarks: remarks.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn delete_visit(&self, id: &str) -> Result<()> {
        self.execute(&Operation::DeleteVisit { id: id.to_string() })
            .await?;
        Ok(())
    }

    async fn list_visits(&self, related_id: Option<&RecordId>) -> Result<Vec<Visit>> {
        let operation = match related_id {
            Some(id) => Operation::GetVisits {
                related_id: id.clone(),
            },
            None => Operation::GetAllVisits,
        };
        let documents: Vec<VisitDocument> = self.execute_as(&operation).await?;
        let mut visits: Vec<Visit> = documents
            .into_iter()
            .filter_map(VisitDocument::into_visit)
            .collect();
        newest_first(&mut visits);
        Ok(visits)
    }

    async fn list_audit_log(&self, record_id: Option<&RecordId>, limit: usize) -> Result<Vec<AuditLogEntry>> {
        let documents: Vec<AuditDocument> = self
            .execute_as(&Operation::GetAuditLogs {
                record_id: record_id.cloned(),
            })
            .await?;
        let mut entries = documents
            .into_iter()
            .map(AuditDocument::into_entry)
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn link_supplier(&self, link: &NewSupplyLink) -> Result<SupplyLink> {
        let id: String = self
            .execute_as(&Operation::LinkFarmerToProcessor { link: link.clone() })
            .await?;
        Ok(SupplyLink {
            id,
            farmer_id: link.farmer_id.clone(),
            processor_id: link.processor_id.clone(),
            commodity: link.commodity.trim().to_string(),
            volume: link.volume.clone().filter(|v| !v.trim().is_empty()),
            date: link.date.trim().to_string(),
            created_at: Utc::now(),
        })
    }

    async fn list_supply_links(&self, filter: &LinkFilter) -> Result<Vec<SupplyLink>> {
        let documents: Vec<LinkDocument> = self
            .execute_as(&Operation::GetSupplyChain {
                filter: filter.clone(),
            })
            .await?;
        Ok(documents.into_iter().map(LinkDocument::into_link).collect())
    }

    async fn save_import_batch(&self, batch: &ImportBatch) -> Result<()> {
        self.batches.save(batch).await
    }

    async fn last_import_batch(&self) -> Result<Option<ImportBatch>> {
        self.batches.latest().await
    }

    async fn mark_batch_undone(&self, id: Uuid) -> Result<()> {
        self.batches.mark_undone(id).await
    }
}
