//! Supply-chain link handlers

use anyhow::{Result, bail};
use chrono::Utc;
use colored::*;
use std::collections::HashMap;

use super::LinksCommands;
use crate::api::Backend;
use crate::cli::context::AppContext;
use crate::cli::output::{OutputFormat, Table, print_csv, print_json};
use crate::types::{LinkFilter, NewSupplyLink, RecordId, RecordKind};

pub async fn handle_links_command(command: LinksCommands, ctx: &AppContext) -> Result<()> {
    let backend = ctx.backend().await?;
    let backend = backend.as_ref();

    match command {
        LinksCommands::Add {
            farmer,
            processor,
            commodity,
            volume,
            date,
        } => {
            if commodity.trim().is_empty() {
                bail!("--commodity must not be empty");
            }
            let link = NewSupplyLink {
                farmer_id: RecordId(farmer),
                processor_id: RecordId(processor),
                commodity,
                volume,
                date: date.unwrap_or_else(|| Utc::now().date_naive().to_string()),
            };
            let link = backend.link_supplier(&link).await?;
            println!(
                "{} Farmer {} supplies {} to processor {} ({})",
                "✓".green(),
                link.farmer_id,
                link.commodity.bold(),
                link.processor_id,
                link.id.dimmed()
            );
            Ok(())
        }
        LinksCommands::List {
            farmer,
            processor,
            format,
        } => {
            let filter = match (farmer, processor) {
                (Some(id), _) => LinkFilter::Farmer(RecordId(id)),
                (None, Some(id)) => LinkFilter::Processor(RecordId(id)),
                (None, None) => LinkFilter::All,
            };
            let links = backend.list_supply_links(&filter).await?;
            match format {
                OutputFormat::Json => print_json(&links),
                OutputFormat::Csv => {
                    let rows: Vec<Vec<String>> = links
                        .iter()
                        .map(|l| {
                            vec![
                                l.id.clone(),
                                l.farmer_id.to_string(),
                                l.processor_id.to_string(),
                                l.commodity.clone(),
                                l.volume.clone().unwrap_or_default(),
                                l.date.clone(),
                            ]
                        })
                        .collect();
                    print_csv(&["id", "farmer_id", "processor_id", "commodity", "volume", "date"], &rows)
                }
                OutputFormat::Table => {
                    if links.is_empty() {
                        println!("No supply links.");
                        return Ok(());
                    }
                    let names = record_names(backend).await?;
                    let name = |id: &RecordId| names.get(id).cloned().unwrap_or_else(|| id.to_string());
                    let mut table = Table::new(["Date", "Farmer", "Processor", "Commodity", "Volume"]);
                    for link in &links {
                        table.push([
                            link.date.clone(),
                            name(&link.farmer_id),
                            name(&link.processor_id),
                            link.commodity.clone(),
                            link.volume.clone().unwrap_or_default(),
                        ]);
                    }
                    table.print();
                    Ok(())
                }
            }
        }
    }
}

/// Display names of every record, keyed by id
async fn record_names(backend: &dyn Backend) -> Result<HashMap<RecordId, String>> {
    let mut names = HashMap::new();
    for kind in [RecordKind::Farmer, RecordKind::AgroProcessor] {
        for record in backend.list_records(kind).await? {
            names.insert(record.id.clone(), record.display_name().to_string());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteBackend;
    use crate::types::RecordDraft;

    #[tokio::test]
    async fn test_record_names() {
        let backend = SqliteBackend::in_memory().await.unwrap();
        let farmers = backend
            .insert_records(RecordKind::Farmer, &[RecordDraft::new("Alice")])
            .await
            .unwrap();
        let mut mill = RecordDraft::new("Juma");
        mill.business_name = Some("Kilimo Mills".to_string());
        let processors = backend
            .insert_records(RecordKind::AgroProcessor, &[mill])
            .await
            .unwrap();

        let names = record_names(&backend).await.unwrap();
        assert_eq!(names[&farmers[0]], "Alice");
        assert_eq!(names[&processors[0]], "Kilimo Mills");
    }
}
