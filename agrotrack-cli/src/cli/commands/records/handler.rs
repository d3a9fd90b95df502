//! Record CRUD and export handlers

use anyhow::{Result, bail};
use colored::*;

use super::{FieldArgs, RecordsCommands};
use crate::api::Backend;
use crate::cli::context::AppContext;
use crate::cli::output::{OutputFormat, Table, confirm, print_csv, print_json};
use crate::services::export_records;
use crate::types::{Record, RecordDraft, RecordId, RecordKind, RecordPatch, join_commodities};

const CSV_HEADERS: &[&str] = &[
    "id",
    "name",
    "business_name",
    "ref_code",
    "address",
    "contact",
    "district",
    "commodities",
    "quantities",
    "email",
    "date_of_visit",
    "status",
    "remarks",
    "latitude",
    "longitude",
    "created_at",
    "updated_at",
];

pub async fn handle_records_command(command: RecordsCommands, ctx: &AppContext) -> Result<()> {
    let backend = ctx.backend().await?;
    let backend = backend.as_ref();

    match command {
        RecordsCommands::List {
            kind,
            district,
            commodity,
            format,
        } => {
            let records = backend.list_records(kind).await?;
            let records = filter_records(records, district.as_deref(), commodity.as_deref());
            print_records(kind, &records, format)
        }
        RecordsCommands::Search {
            kind,
            query,
            format,
        } => {
            if query.trim().is_empty() {
                bail!("Search query must not be empty");
            }
            let records = backend.search_records(kind, &query).await?;
            print_records(kind, &records, format)
        }
        RecordsCommands::Show { kind, id } => show_record(backend, kind, &RecordId(id)).await,
        RecordsCommands::Add { kind, fields } => add_record(backend, kind, fields).await,
        RecordsCommands::Update { kind, id, fields } => {
            let patch = checked_patch(kind, fields)?;
            if patch.is_empty() {
                bail!("Nothing to update: pass at least one field option");
            }
            let record = backend.update_record(kind, &RecordId(id), &patch).await?;
            println!("{} Updated {} '{}'", "✓".green(), kind, record.display_name());
            Ok(())
        }
        RecordsCommands::Delete { kind, id } => {
            backend.delete_record(kind, &RecordId(id.clone())).await?;
            println!("{} Deleted {} {}", "✓".green(), kind, id);
            Ok(())
        }
        RecordsCommands::Purge {
            kind,
            minutes,
            all,
            yes,
        } => {
            let deleted = purge_records(backend, kind, minutes, all, yes).await?;
            if let Some(deleted) = deleted {
                println!("{} Deleted {} {} records", "✓".green(), deleted.to_string().bold(), kind);
            } else {
                println!("Cancelled.");
            }
            Ok(())
        }
        RecordsCommands::Export { kind, output } => {
            let records = backend.list_records(kind).await?;
            let written = export_records(kind, &records, &output)?;
            println!(
                "{} Exported {} {} records to {}",
                "✓".green(),
                written,
                kind,
                output.display().to_string().bold()
            );
            Ok(())
        }
    }
}

fn checked_patch(kind: RecordKind, fields: FieldArgs) -> Result<RecordPatch> {
    if kind == RecordKind::Farmer && fields.business_name.is_some() {
        bail!("--business-name only applies to agro-processors");
    }
    Ok(fields.into_patch())
}

async fn add_record(backend: &dyn Backend, kind: RecordKind, fields: FieldArgs) -> Result<()> {
    let patch = checked_patch(kind, fields)?;
    let mut draft = RecordDraft::default();
    patch.apply(&mut draft);
    if draft.name.is_empty() {
        bail!("--name is required");
    }

    let ids = backend.insert_records(kind, std::slice::from_ref(&draft)).await?;
    let Some(id) = ids.first() else {
        bail!("Backend returned no id for the new record");
    };
    println!("{} Created {} '{}' ({})", "✓".green(), kind, draft.name, id);
    if draft.has_visit() {
        println!("  Visit recorded for {}", draft.date_of_visit);
    }
    Ok(())
}

/// `None` when the prompt is declined
async fn purge_records(
    backend: &dyn Backend,
    kind: RecordKind,
    minutes: Option<u64>,
    all: bool,
    yes: bool,
) -> Result<Option<usize>> {
    let label = kind.to_string().to_lowercase();
    let prompt = match (minutes, all) {
        (Some(minutes), _) => format!(
            "Delete every {} record created in the last {} minutes?",
            label, minutes
        ),
        (None, true) => format!("Delete ALL {} records?", label),
        (None, false) => bail!("Pass --minutes N or --all"),
    };
    if !confirm(&prompt, yes)? {
        return Ok(None);
    }

    let deleted = match minutes {
        Some(minutes) => backend.delete_recent(kind, minutes).await?,
        None => backend.delete_all(kind).await?,
    };
    Ok(Some(deleted))
}

async fn show_record(backend: &dyn Backend, kind: RecordKind, id: &RecordId) -> Result<()> {
    let Some(record) = backend.get_record(kind, id).await? else {
        bail!("{} record '{}' not found", kind, id);
    };
    let f = &record.fields;

    println!("{} {}", record.display_name().bold(), format!("({})", record.id).dimmed());
    let optional = |v: &Option<String>| v.clone().unwrap_or_default();
    let coords = match (f.latitude, f.longitude) {
        (Some(lat), Some(lon)) => format!("{}, {}", lat, lon),
        _ => String::new(),
    };
    let mut rows = vec![("Name", f.name.clone())];
    if kind == RecordKind::AgroProcessor {
        rows.push(("Business name", optional(&f.business_name)));
    }
    rows.extend([
        ("Ref", optional(&f.ref_code)),
        ("Address", f.address.clone()),
        ("Contact", f.contact.clone()),
        ("Email", f.email.clone()),
        ("District", f.district.clone()),
        ("Commodities", join_commodities(&f.commodities)),
        ("Quantities", f.quantities.clone()),
        ("Status", f.status.clone()),
        ("Date of visit", f.date_of_visit.clone()),
        ("Remarks", f.remarks.clone()),
        ("Coordinates", coords),
        ("Created", record.created_at.to_rfc3339()),
        ("Updated", record.updated_at.to_rfc3339()),
    ]);
    for (label, value) in rows.into_iter().filter(|(_, v)| !v.is_empty()) {
        println!("  {:<14} {}", format!("{}:", label).cyan(), value);
    }

    let visits = backend.list_visits(Some(&record.id)).await?;
    if !visits.is_empty() {
        println!();
        println!("  {}", "Visits".bold());
        for visit in visits {
            println!("  {}  {}", visit.date, visit.remarks.dimmed());
        }
    }
    Ok(())
}

fn filter_records(records: Vec<Record>, district: Option<&str>, commodity: Option<&str>) -> Vec<Record> {
    records
        .into_iter()
        .filter(|r| {
            district.is_none_or(|d| r.fields.district.trim().eq_ignore_ascii_case(d.trim()))
        })
        .filter(|r| {
            commodity.is_none_or(|c| {
                r.fields
                    .commodities
                    .iter()
                    .any(|have| have.eq_ignore_ascii_case(c.trim()))
            })
        })
        .collect()
}

fn print_records(kind: RecordKind, records: &[Record], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(records),
        OutputFormat::Csv => {
            let rows: Vec<Vec<String>> = records.iter().map(csv_row).collect();
            print_csv(CSV_HEADERS, &rows)
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No {} records.", kind.to_string().to_lowercase());
                return Ok(());
            }
            let mut table = Table::new(["ID", "Name", "District", "Commodities", "Contact", "Visit date"]);
            for record in records {
                table.push([
                    record.id.to_string(),
                    record.display_name().to_string(),
                    record.fields.district.clone(),
                    join_commodities(&record.fields.commodities),
                    record.fields.contact.clone(),
                    record.fields.date_of_visit.clone(),
                ]);
            }
            table.print();
            println!("{}", format!("{} records", records.len()).dimmed());
            Ok(())
        }
    }
}

fn csv_row(record: &Record) -> Vec<String> {
    let f = &record.fields;
    let number = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
    vec![
        record.id.to_string(),
        f.name.clone(),
        f.business_name.clone().unwrap_or_default(),
        f.ref_code.clone().unwrap_or_default(),
        f.address.clone(),
        f.contact.clone(),
        f.district.clone(),
        join_commodities(&f.commodities),
        f.quantities.clone(),
        f.email.clone(),
        f.date_of_visit.clone(),
        f.status.clone(),
        f.remarks.clone(),
        number(f.latitude),
        number(f.longitude),
        record.created_at.to_rfc3339(),
        record.updated_at.to_rfc3339(),
    ]
}
