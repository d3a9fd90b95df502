//! Append-only audit log

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::types::{AuditAction, AuditLogEntry, Record, RecordId, RecordKind};

/// Record a mutation. Runs on the caller's connection so it commits or rolls
/// back together with the change it describes.
pub async fn append(
    conn: &mut SqliteConnection,
    action: AuditAction,
    record_id: &RecordId,
    kind: RecordKind,
    before: Option<&Record>,
    after: Option<&Record>,
) -> Result<()> {
    let before_json = before.map(serde_json::to_string).transpose()?;
    let after_json = after.map(serde_json::to_string).transpose()?;

    sqlx::query(
        "INSERT INTO audit_log (action, table_name, record_id, before_json, after_json, timestamp)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(action.as_str())
    .bind(kind.table_name())
    .bind(record_id.as_str())
    .bind(before_json)
    .bind(after_json)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .context("Failed to append audit entry")?;

    Ok(())
}

fn parse_snapshot(raw: Option<String>) -> Result<Option<Value>> {
    raw.map(|s| serde_json::from_str(&s).context("Invalid audit snapshot"))
        .transpose()
}

/// Entries newest first
pub async fn list(
    pool: &SqlitePool,
    record_id: Option<&RecordId>,
    limit: usize,
) -> Result<Vec<AuditLogEntry>> {
    let limit = limit as i64;
    let rows = match record_id {
        Some(id) => {
            sqlx::query(
                "SELECT id, action, table_name, record_id, before_json, after_json, timestamp
                 FROM audit_log WHERE record_id = ? ORDER BY id DESC LIMIT ?",
            )
            .bind(id.as_str())
            .bind(limit)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT id, action, table_name, record_id, before_json, after_json, timestamp
                 FROM audit_log ORDER BY id DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list audit log")?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let action: String = row.try_get("action")?;
        entries.push(AuditLogEntry {
            id: row.try_get::<i64, _>("id")?.to_string(),
            action: AuditAction::parse(&action)
                .ok_or_else(|| anyhow!("Unknown audit action '{}'", action))?,
            table_name: row.try_get("table_name")?,
            record_id: RecordId(row.try_get("record_id")?),
            before: parse_snapshot(row.try_get("before_json")?)?,
            after: parse_snapshot(row.try_get("after_json")?)?,
            timestamp: row.try_get("timestamp")?,
        });
    }

    Ok(entries)
}
