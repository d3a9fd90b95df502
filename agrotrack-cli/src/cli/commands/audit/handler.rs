//! Audit log handler

use anyhow::Result;
use colored::*;
use serde_json::Value;

use super::AuditCommands;
use crate::cli::context::AppContext;
use crate::cli::output::{OutputFormat, Table, print_csv, print_json};
use crate::types::{AuditAction, AuditLogEntry, RecordId};

pub async fn handle_audit_command(command: AuditCommands, ctx: &AppContext) -> Result<()> {
    let backend = ctx.backend().await?;

    let AuditCommands::List {
        record,
        limit,
        format,
    } = command;
    let record = record.map(RecordId);
    let entries = backend.list_audit_log(record.as_ref(), limit).await?;

    match format {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Csv => {
            let rows: Vec<Vec<String>> = entries
                .iter()
                .map(|e| {
                    let snapshot = |v: &Option<Value>| v.as_ref().map(Value::to_string).unwrap_or_default();
                    vec![
                        e.id.to_string(),
                        e.timestamp.to_rfc3339(),
                        e.action.to_string(),
                        e.table_name.clone(),
                        e.record_id.to_string(),
                        snapshot(&e.before),
                        snapshot(&e.after),
                    ]
                })
                .collect();
            print_csv(
                &["id", "timestamp", "action", "table", "record_id", "before", "after"],
                &rows,
            )
        }
        OutputFormat::Table => {
            if entries.is_empty() {
                println!("No audit entries.");
                return Ok(());
            }
            let mut table = Table::new(["When", "Action", "Table", "Record", "Changes"]);
            for entry in &entries {
                table.push([
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    entry.action.to_string(),
                    entry.table_name.clone(),
                    entry.record_id.to_string(),
                    describe_changes(entry),
                ]);
            }
            table.print();
            println!("{}", format!("{} entries", entries.len()).dimmed());
            Ok(())
        }
    }
}

/// Field names that differ between the before and after snapshots
fn changed_fields(before: &Value, after: &Value) -> Vec<String> {
    let (Some(before), Some(after)) = (before.as_object(), after.as_object()) else {
        return Vec::new();
    };
    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();
    keys.into_iter()
        .filter(|k| k.as_str() != "updatedAt" && before.get(*k) != after.get(*k))
        .cloned()
        .collect()
}

fn describe_changes(entry: &AuditLogEntry) -> String {
    match (entry.action, &entry.before, &entry.after) {
        (AuditAction::Update, Some(before), Some(after)) => changed_fields(before, after).join(", "),
        (AuditAction::Create, _, Some(after)) | (AuditAction::Delete, Some(after), _) => after
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
