//! Visit history rows

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::types::{NewVisit, RecordId, RecordKind, Visit};

fn visit_from_row(row: &SqliteRow) -> Result<Visit> {
    let kind_tag: String = row.try_get("kind")?;
    Ok(Visit {
        id: row.try_get("id")?,
        related_id: RecordId(row.try_get("related_id")?),
        kind: RecordKind::from_tag(&kind_tag)
            .ok_or_else(|| anyhow!("Unknown visit type '{}' in database", kind_tag))?,
        date: row.try_get("date")?,
        remarks: row.try_get("remarks")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn insert(conn: &mut SqliteConnection, visit: &NewVisit) -> Result<Visit> {
    let stored = Visit {
        id: Uuid::new_v4().to_string(),
        related_id: visit.related_id.clone(),
        kind: visit.kind,
        date: visit.date.clone(),
        remarks: visit.remarks.clone(),
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO visits (id, related_id, kind, date, remarks, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&stored.id)
    .bind(stored.related_id.as_str())
    .bind(stored.kind.tag())
    .bind(&stored.date)
    .bind(&stored.remarks)
    .bind(stored.created_at)
    .execute(&mut *conn)
    .await
    .context("Failed to insert visit")?;

    Ok(stored)
}

/// Visits newest first, optionally for one record
pub async fn list(pool: &SqlitePool, related_id: Option<&RecordId>) -> Result<Vec<Visit>> {
    let rows = match related_id {
        Some(id) => {
            sqlx::query(
                "SELECT id, related_id, kind, date, remarks, created_at FROM visits
                 WHERE related_id = ? ORDER BY rowid DESC",
            )
            .bind(id.as_str())
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT id, related_id, kind, date, remarks, created_at FROM visits
                 ORDER BY rowid DESC",
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list visits")?;

    rows.iter().map(visit_from_row).collect()
}

async fn fetch(pool: &SqlitePool, id: &str) -> Result<Option<Visit>> {
    let row = sqlx::query(
        "SELECT id, related_id, kind, date, remarks, created_at FROM visits WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get visit")?;

    row.as_ref().map(visit_from_row).transpose()
}

/// Replace the date and remarks of a visit
pub async fn update(pool: &SqlitePool, id: &str, date: &str, remarks: &str) -> Result<Visit> {
    let result = sqlx::query("UPDATE visits SET date = ?, remarks = ? WHERE id = ?")
        .bind(date)
        .bind(remarks)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update visit")?;
    if result.rows_affected() == 0 {
        bail!("Visit '{}' not found", id);
    }

    fetch(pool, id)
        .await?
        .ok_or_else(|| anyhow!("Visit '{}' not found", id))
}

pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM visits WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete visit")?;
    if result.rows_affected() == 0 {
        bail!("Visit '{}' not found", id);
    }
    Ok(())
}

pub async fn delete_for_record(conn: &mut SqliteConnection, related_id: &RecordId) -> Result<u64> {
    let result = sqlx::query("DELETE FROM visits WHERE related_id = ?")
        .bind(related_id.as_str())
        .execute(&mut *conn)
        .await
        .context("Failed to delete visits")?;
    Ok(result.rows_affected())
}
