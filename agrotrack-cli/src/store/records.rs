//! Record rows and their audited mutations

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{audit, links, visits};
use crate::types::{AuditAction, NewVisit, Record, RecordDraft, RecordId, RecordKind, RecordPatch};

const RECORD_COLUMNS: &str = "id, kind, name, business_name, ref_code, address, contact, district, \
     commodities, quantities, email, date_of_visit, status, remarks, latitude, longitude, \
     created_at, updated_at";

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let kind_tag: String = row.try_get("kind")?;
    let kind = RecordKind::from_tag(&kind_tag)
        .ok_or_else(|| anyhow!("Unknown record kind '{}' in database", kind_tag))?;
    let commodities_json: String = row.try_get("commodities")?;
    let commodities: Vec<String> = serde_json::from_str(&commodities_json)
        .with_context(|| format!("Invalid commodities column: {}", commodities_json))?;

    Ok(Record {
        id: RecordId(row.try_get("id")?),
        kind,
        fields: RecordDraft {
            name: row.try_get("name")?,
            business_name: row.try_get("business_name")?,
            ref_code: row.try_get("ref_code")?,
            address: row.try_get("address")?,
            contact: row.try_get("contact")?,
            district: row.try_get("district")?,
            commodities,
            quantities: row.try_get("quantities")?,
            email: row.try_get("email")?,
            date_of_visit: row.try_get("date_of_visit")?,
            status: row.try_get("status")?,
            remarks: row.try_get("remarks")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Fetch one record
pub async fn fetch(
    conn: &mut SqliteConnection,
    kind: RecordKind,
    id: &RecordId,
) -> Result<Option<Record>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM records WHERE id = ? AND kind = ?",
        RECORD_COLUMNS
    ))
    .bind(id.as_str())
    .bind(kind.tag())
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to get record")?;

    row.as_ref().map(record_from_row).transpose()
}

/// List all records of a kind in insertion order
pub async fn list(pool: &SqlitePool, kind: RecordKind) -> Result<Vec<Record>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM records WHERE kind = ? ORDER BY rowid",
        RECORD_COLUMNS
    ))
    .bind(kind.tag())
    .fetch_all(pool)
    .await
    .context("Failed to list records")?;

    rows.iter().map(record_from_row).collect()
}

/// Records whose name or business name contains `query`, ignoring case
pub async fn search(pool: &SqlitePool, kind: RecordKind, query: &str) -> Result<Vec<Record>> {
    let records = list(pool, kind).await?;
    Ok(records
        .into_iter()
        .filter(|record| record.fields.matches_name(query))
        .collect())
}

async fn write(conn: &mut SqliteConnection, record: &Record) -> Result<()> {
    let fields = &record.fields;
    sqlx::query(
        r#"
        INSERT INTO records (
            id, kind, name, business_name, ref_code, address, contact, district,
            commodities, quantities, email, date_of_visit, status, remarks,
            latitude, longitude, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            business_name = excluded.business_name,
            ref_code = excluded.ref_code,
            address = excluded.address,
            contact = excluded.contact,
            district = excluded.district,
            commodities = excluded.commodities,
            quantities = excluded.quantities,
            email = excluded.email,
            date_of_visit = excluded.date_of_visit,
            status = excluded.status,
            remarks = excluded.remarks,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(record.id.as_str())
    .bind(record.kind.tag())
    .bind(&fields.name)
    .bind(&fields.business_name)
    .bind(&fields.ref_code)
    .bind(&fields.address)
    .bind(&fields.contact)
    .bind(&fields.district)
    .bind(serde_json::to_string(&fields.commodities)?)
    .bind(&fields.quantities)
    .bind(&fields.email)
    .bind(&fields.date_of_visit)
    .bind(&fields.status)
    .bind(&fields.remarks)
    .bind(fields.latitude)
    .bind(fields.longitude)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut *conn)
    .await
    .context("Failed to write record")?;

    Ok(())
}

/// Insert drafts in one transaction, with their audit entries and visits
pub async fn insert_many(
    pool: &SqlitePool,
    kind: RecordKind,
    drafts: &[RecordDraft],
) -> Result<Vec<RecordId>> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;
    let mut ids = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let now = Utc::now();
        let record = Record {
            id: RecordId(Uuid::new_v4().to_string()),
            kind,
            fields: draft.clone(),
            created_at: now,
            updated_at: now,
        };
        write(&mut tx, &record).await?;
        audit::append(&mut tx, AuditAction::Create, &record.id, kind, None, Some(&record)).await?;

        if let Some(visit) = NewVisit::from_draft(&record.id, kind, draft) {
            visits::insert(&mut tx, &visit).await?;
        }
        ids.push(record.id);
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(ids)
}

/// Apply a patch and audit the before/after state
pub async fn update(
    pool: &SqlitePool,
    kind: RecordKind,
    id: &RecordId,
    patch: &RecordPatch,
) -> Result<Record> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let before = fetch(&mut tx, kind, id)
        .await?
        .ok_or_else(|| anyhow!("{} record '{}' not found", kind, id))?;

    let mut after = before.clone();
    patch.apply(&mut after.fields);
    after.updated_at = Utc::now();

    write(&mut tx, &after).await?;
    audit::append(&mut tx, AuditAction::Update, id, kind, Some(&before), Some(&after)).await?;

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(after)
}

async fn remove(conn: &mut SqliteConnection, kind: RecordKind, id: &RecordId) -> Result<bool> {
    let Some(before) = fetch(conn, kind, id).await? else {
        return Ok(false);
    };

    visits::delete_for_record(conn, id).await?;
    links::delete_for_record(conn, id).await?;
    sqlx::query("DELETE FROM records WHERE id = ?")
        .bind(id.as_str())
        .execute(&mut *conn)
        .await
        .context("Failed to delete record")?;
    audit::append(conn, AuditAction::Delete, id, kind, Some(&before), None).await?;

    Ok(true)
}

/// Delete one record and its visits
pub async fn delete(pool: &SqlitePool, kind: RecordKind, id: &RecordId) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;
    if !remove(&mut tx, kind, id).await? {
        anyhow::bail!("{} record '{}' not found", kind, id);
    }
    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

/// Delete many records in one transaction, skipping ids already gone
pub async fn delete_many(pool: &SqlitePool, kind: RecordKind, ids: &[RecordId]) -> Result<usize> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;
    let mut deleted = 0;
    for id in ids {
        if remove(&mut tx, kind, id).await? {
            deleted += 1;
        }
    }
    tx.commit().await.context("Failed to commit transaction")?;
    Ok(deleted)
}

/// Delete every record of a kind, or only those created at or after `since`.
/// Returns the number deleted.
pub async fn purge(
    pool: &SqlitePool,
    kind: RecordKind,
    since: Option<DateTime<Utc>>,
) -> Result<usize> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let rows = sqlx::query("SELECT id, created_at FROM records WHERE kind = ? ORDER BY rowid")
        .bind(kind.tag())
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list records")?;

    let mut deleted = 0;
    for row in rows {
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        if since.is_some_and(|since| created_at < since) {
            continue;
        }
        let id = RecordId(row.try_get("id")?);
        if remove(&mut tx, kind, &id).await? {
            deleted += 1;
        }
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(deleted)
}
