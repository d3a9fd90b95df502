//! Undo the most recent import

use anyhow::Result;
use colored::*;
use log::{info, warn};

use super::UndoArgs;
use crate::cli::context::AppContext;
use crate::cli::output::confirm;

pub async fn handle_undo_command(args: UndoArgs, ctx: &AppContext) -> Result<()> {
    let backend = ctx.backend().await?;

    let Some(batch) = backend.last_import_batch().await? else {
        println!("Nothing to undo: no import batches on record.");
        return Ok(());
    };

    println!(
        "Last import: {} {} records from {} at {}",
        batch.record_ids.len().to_string().bold(),
        batch.kind,
        batch.source.cyan(),
        batch.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(failure) = &batch.failure {
        println!("  {} {}", "partial import:".yellow(), failure);
    }

    if !confirm(&format!("Delete these {} records?", batch.record_ids.len()), args.yes)? {
        println!("Cancelled.");
        return Ok(());
    }

    let deleted = backend.bulk_delete(batch.kind, &batch.record_ids).await?;
    backend.mark_batch_undone(batch.id).await?;

    let missing = batch.record_ids.len().saturating_sub(deleted);
    if missing > 0 {
        warn!("{} records of batch {} were already gone", missing, batch.id);
    }
    info!("Undid import batch {}", batch.id);

    println!(
        "{} Removed {} of {} records.",
        "✓".green(),
        deleted.to_string().bold(),
        batch.record_ids.len()
    );
    Ok(())
}
