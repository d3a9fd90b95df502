//! Import batches, the unit of undo

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::types::{ImportBatch, RecordId, RecordKind};

pub async fn save(pool: &SqlitePool, batch: &ImportBatch) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;
    let batch_id = batch.id.to_string();

    sqlx::query(
        "INSERT INTO import_batches (id, kind, source, failure, created_at, undone_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&batch_id)
    .bind(batch.kind.tag())
    .bind(&batch.source)
    .bind(&batch.failure)
    .bind(batch.created_at)
    .bind(batch.undone_at)
    .execute(&mut *tx)
    .await
    .context("Failed to save import batch")?;

    for (position, record_id) in batch.record_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO import_batch_members (batch_id, position, record_id) VALUES (?, ?, ?)",
        )
        .bind(&batch_id)
        .bind(position as i64)
        .bind(record_id.as_str())
        .execute(&mut *tx)
        .await
        .context("Failed to save import batch member")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

/// Most recent batch that has not been undone
pub async fn latest(pool: &SqlitePool) -> Result<Option<ImportBatch>> {
    let row = sqlx::query(
        "SELECT id, kind, source, failure, created_at, undone_at FROM import_batches
         WHERE undone_at IS NULL ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
    .context("Failed to get latest import batch")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let id_text: String = row.try_get("id")?;
    let kind_tag: String = row.try_get("kind")?;

    let members: Vec<(String,)> = sqlx::query_as(
        "SELECT record_id FROM import_batch_members WHERE batch_id = ? ORDER BY position",
    )
    .bind(&id_text)
    .fetch_all(pool)
    .await
    .context("Failed to get import batch members")?;

    Ok(Some(ImportBatch {
        id: Uuid::parse_str(&id_text).with_context(|| format!("Invalid batch id '{}'", id_text))?,
        kind: RecordKind::from_tag(&kind_tag)
            .ok_or_else(|| anyhow!("Unknown record kind '{}' in database", kind_tag))?,
        source: row.try_get("source")?,
        record_ids: members.into_iter().map(|(id,)| RecordId(id)).collect(),
        created_at: row.try_get("created_at")?,
        undone_at: row.try_get("undone_at")?,
        failure: row.try_get("failure")?,
    }))
}

pub async fn mark_undone(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query(
        "UPDATE import_batches SET undone_at = ? WHERE id = ? AND undone_at IS NULL",
    )
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await
    .context("Failed to mark import batch undone")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("Import batch {} not found or already undone", id);
    }
    Ok(())
}
