//! Import command handler

use anyhow::{Result, bail};
use colored::*;

use super::ImportArgs;
use crate::cli::context::AppContext;
use crate::cli::output::{Table, confirm, print_json};
use crate::import::pipeline::PreparedImport;
use crate::import::{HeaderPolicy, ImportReport, SheetSelection, prepare_import, run_import};
use crate::types::join_commodities;

/// Records shown by a dry run
const PREVIEW_ROWS: usize = 10;

pub async fn handle_import_command(args: ImportArgs, ctx: &AppContext) -> Result<()> {
    if !args.file.exists() {
        bail!("File does not exist: {}", args.file.display());
    }

    let mut options = ctx.config.import_options(args.kind)?;
    options.sheets = match (&args.sheet, args.all_sheets) {
        (Some(name), _) => SheetSelection::Named(name.clone()),
        (None, true) => SheetSelection::All,
        (None, false) => SheetSelection::Auto(args.kind),
    };
    options.dry_run = args.dry_run;
    if args.strict_headers {
        options.header_policy = HeaderPolicy::Strict;
    }
    if let Some(size) = args.batch_size {
        options.batch_size = size as usize;
    }
    if let Some(rows) = args.header_rows {
        options.header_scan_rows = rows;
    }

    if !args.json {
        println!(
            "Importing {} records from {}{}",
            args.kind.to_string().cyan(),
            args.file.display().to_string().bold(),
            if args.dry_run { " (dry run)".yellow().to_string() } else { String::new() }
        );
    }

    if args.dry_run {
        let PreparedImport { report, records } = prepare_import(&args.file, &options)?;
        if args.json {
            return print_json(&report);
        }
        print_report(&report);
        print_preview(&records);
        return Ok(());
    }

    let backend = ctx.backend().await?;
    if args.replace {
        let prompt = format!(
            "Delete every existing {} record before importing?",
            args.kind.to_string().to_lowercase()
        );
        if !confirm(&prompt, args.yes)? {
            println!("Cancelled.");
            return Ok(());
        }
        let removed = backend.delete_all(args.kind).await?;
        if !args.json {
            println!("Removed {} existing records", removed);
        }
    }
    let report = run_import(backend.as_ref(), &args.file, &options).await?;

    if args.json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    if let Some(failure) = report.upload.as_ref().and_then(|u| u.failure.as_ref()) {
        bail!(
            "Import incomplete: {}. {} records were committed; run `agrotrack undo` to remove them",
            failure,
            report.imported()
        );
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!();
    for sheet in &report.sheets {
        if let Some(error) = &sheet.error {
            println!("  {} {}: {}", "✗".red(), sheet.name.bold(), error.red());
            continue;
        }
        let header = match sheet.header_row {
            Some(row) if sheet.header_fallback => format!("header row {} (fallback)", row + 1).yellow(),
            Some(row) => format!("header row {}", row + 1).normal(),
            None => "empty".dimmed(),
        };
        println!(
            "  {} {}: {} of {} rows accepted, {}",
            "•".cyan(),
            sheet.name.bold(),
            sheet.accepted,
            sheet.rows_read,
            header
        );
    }

    println!();
    println!("  Accepted: {}", report.accepted.to_string().green().bold());
    let skipped = report.skipped.total();
    if skipped == 0 {
        println!("  Skipped:  0");
    } else {
        let breakdown = report
            .skipped
            .breakdown()
            .iter()
            .map(|(reason, count)| format!("{} {}", count, reason))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  Skipped:  {} ({})", skipped.to_string().yellow(), breakdown);
    }

    if let Some(upload) = &report.upload {
        let imported = upload.ids.len().to_string();
        println!(
            "  Imported: {} in {} batch(es)",
            if upload.is_complete() { imported.green().bold() } else { imported.yellow().bold() },
            upload.batches_submitted
        );
        if let Some(failure) = &upload.failure {
            println!("  {} {}", "Failed:".red().bold(), failure);
        }
    }
    if let Some(batch_id) = report.batch_id {
        println!("  Batch:    {} (undo with `agrotrack undo`)", batch_id.to_string().dimmed());
    }
}

fn print_preview(records: &[crate::types::RecordDraft]) {
    if records.is_empty() {
        return;
    }
    println!();
    let mut table = Table::new(["Name", "District", "Commodities", "Contact", "Visit date"]);
    for record in records.iter().take(PREVIEW_ROWS) {
        table.push([
            record.name.clone(),
            record.district.clone(),
            join_commodities(&record.commodities),
            record.contact.clone(),
            record.date_of_visit.clone(),
        ]);
    }
    table.print();
    if records.len() > PREVIEW_ROWS {
        println!("{}", format!("… and {} more", records.len() - PREVIEW_ROWS).dimmed());
    }
}
