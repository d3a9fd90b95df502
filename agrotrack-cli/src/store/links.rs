//! Supply-chain link rows

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::types::{LinkFilter, NewSupplyLink, RecordId, SupplyLink};

const LINK_COLUMNS: &str = "id, farmer_id, processor_id, commodity, volume, date, created_at";

fn link_from_row(row: &SqliteRow) -> Result<SupplyLink> {
    Ok(SupplyLink {
        id: row.try_get("id")?,
        farmer_id: RecordId(row.try_get("farmer_id")?),
        processor_id: RecordId(row.try_get("processor_id")?),
        commodity: row.try_get("commodity")?,
        volume: row.try_get("volume")?,
        date: row.try_get("date")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn insert(conn: &mut SqliteConnection, link: &NewSupplyLink) -> Result<SupplyLink> {
    let stored = SupplyLink {
        id: Uuid::new_v4().to_string(),
        farmer_id: link.farmer_id.clone(),
        processor_id: link.processor_id.clone(),
        commodity: link.commodity.trim().to_string(),
        volume: link.volume.clone().filter(|v| !v.trim().is_empty()),
        date: link.date.trim().to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO supply_links (id, farmer_id, processor_id, commodity, volume, date, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&stored.id)
    .bind(stored.farmer_id.as_str())
    .bind(stored.processor_id.as_str())
    .bind(&stored.commodity)
    .bind(&stored.volume)
    .bind(&stored.date)
    .bind(stored.created_at)
    .execute(&mut *conn)
    .await
    .context("Failed to insert supply link")?;

    Ok(stored)
}

/// Links in creation order
pub async fn list(pool: &SqlitePool, filter: &LinkFilter) -> Result<Vec<SupplyLink>> {
    let rows = match filter {
        LinkFilter::All => {
            sqlx::query(&format!("SELECT {} FROM supply_links ORDER BY rowid", LINK_COLUMNS))
                .fetch_all(pool)
                .await
        }
        LinkFilter::Farmer(id) => {
            sqlx::query(&format!(
                "SELECT {} FROM supply_links WHERE farmer_id = ? ORDER BY rowid",
                LINK_COLUMNS
            ))
            .bind(id.as_str())
            .fetch_all(pool)
            .await
        }
        LinkFilter::Processor(id) => {
            sqlx::query(&format!(
                "SELECT {} FROM supply_links WHERE processor_id = ? ORDER BY rowid",
                LINK_COLUMNS
            ))
            .bind(id.as_str())
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list supply links")?;

    rows.iter().map(link_from_row).collect()
}

/// Drop every link that mentions a record, on either side
pub async fn delete_for_record(conn: &mut SqliteConnection, record_id: &RecordId) -> Result<u64> {
    let result = sqlx::query("DELETE FROM supply_links WHERE farmer_id = ? OR processor_id = ?")
        .bind(record_id.as_str())
        .bind(record_id.as_str())
        .execute(&mut *conn)
        .await
        .context("Failed to delete supply links")?;
    Ok(result.rows_affected())
}
