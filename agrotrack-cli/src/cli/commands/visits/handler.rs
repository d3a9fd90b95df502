//! Visit history handlers

use anyhow::{Result, bail};
use colored::*;

use super::VisitsCommands;
use crate::api::Backend;
use crate::cli::context::AppContext;
use crate::cli::output::{OutputFormat, Table, print_csv, print_json};
use crate::types::{NewVisit, RecordId};

pub async fn handle_visits_command(command: VisitsCommands, ctx: &AppContext) -> Result<()> {
    let backend = ctx.backend().await?;

    match command {
        VisitsCommands::List { record, format } => {
            let record = record.map(RecordId);
            let visits = backend.list_visits(record.as_ref()).await?;
            match format {
                OutputFormat::Json => print_json(&visits),
                OutputFormat::Csv => {
                    let rows: Vec<Vec<String>> = visits
                        .iter()
                        .map(|v| {
                            vec![
                                v.id.clone(),
                                v.related_id.to_string(),
                                v.kind.tag().to_string(),
                                v.date.clone(),
                                v.remarks.clone(),
                                v.created_at.to_rfc3339(),
                            ]
                        })
                        .collect();
                    print_csv(&["id", "related_id", "type", "date", "remarks", "created_at"], &rows)
                }
                OutputFormat::Table => {
                    if visits.is_empty() {
                        println!("No visits.");
                        return Ok(());
                    }
                    let mut table = Table::new(["Date", "Type", "Record", "Remarks"]);
                    for visit in &visits {
                        table.push([
                            visit.date.clone(),
                            visit.kind.to_string(),
                            visit.related_id.to_string(),
                            visit.remarks.clone(),
                        ]);
                    }
                    table.print();
                    Ok(())
                }
            }
        }
        VisitsCommands::Add {
            kind,
            record,
            date,
            remarks,
        } => {
            let date = date.trim().to_string();
            if date.is_empty() {
                bail!("--date must not be empty");
            }
            let visit = backend
                .create_visit(&NewVisit {
                    related_id: RecordId(record),
                    kind,
                    date,
                    remarks: remarks.trim().to_string(),
                })
                .await?;
            println!(
                "{} Visit on {} recorded for {} {}",
                "✓".green(),
                visit.date.bold(),
                kind,
                visit.related_id
            );
            Ok(())
        }
        VisitsCommands::Update { id, date, remarks } => {
            let (date, remarks) = update_visit(backend.as_ref(), &id, date, remarks).await?;
            println!("{} Visit {} now on {} ({})", "✓".green(), id, date.bold(), remarks.dimmed());
            Ok(())
        }
        VisitsCommands::Delete { id } => {
            backend.delete_visit(&id).await?;
            println!("{} Deleted visit {}", "✓".green(), id);
            Ok(())
        }
    }
}

/// Apply the given values, keeping the current ones for what is not given.
/// Returns the stored date and remarks.
async fn update_visit(
    backend: &dyn Backend,
    id: &str,
    date: Option<String>,
    remarks: Option<String>,
) -> Result<(String, String)> {
    if date.is_none() && remarks.is_none() {
        bail!("Nothing to update: pass --date or --remarks");
    }
    let Some(current) = backend
        .list_visits(None)
        .await?
        .into_iter()
        .find(|v| v.id == id)
    else {
        bail!("Visit '{}' not found", id);
    };

    let date = date.map(|d| d.trim().to_string()).unwrap_or(current.date);
    if date.is_empty() {
        bail!("--date must not be empty");
    }
    let remarks = remarks.map(|r| r.trim().to_string()).unwrap_or(current.remarks);

    backend.update_visit(id, &date, &remarks).await?;
    Ok((date, remarks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteBackend;
    use crate::types::{RecordDraft, RecordKind};

    #[tokio::test]
    async fn test_update_keeps_unset_values() {
        let backend = SqliteBackend::in_memory().await.unwrap();
        let ids = backend
            .insert_records(RecordKind::Farmer, &[RecordDraft::new("Alice")])
            .await
            .unwrap();
        let visit = backend
            .create_visit(&NewVisit {
                related_id: ids[0].clone(),
                kind: RecordKind::Farmer,
                date: "2024-03-01".to_string(),
                remarks: "First call".to_string(),
            })
            .await
            .unwrap();

        let (date, remarks) = update_visit(&backend, &visit.id, Some("2024-03-08".to_string()), None)
            .await
            .unwrap();
        assert_eq!(date, "2024-03-08");
        assert_eq!(remarks, "First call");

        let stored = backend.list_visits(Some(&ids[0])).await.unwrap();
        assert_eq!(stored[0].date, "2024-03-08");
        assert_eq!(stored[0].remarks, "First call");

        assert!(update_visit(&backend, &visit.id, None, None).await.is_err());
        assert!(update_visit(&backend, "missing", Some("x".into()), None).await.is_err());
    }
}
