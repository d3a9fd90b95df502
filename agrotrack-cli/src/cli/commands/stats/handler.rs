//! Analytics handler

use anyhow::Result;
use colored::*;
use std::collections::BTreeMap;

use super::{StatsArgs, StatsFormat};
use crate::cli::context::AppContext;
use crate::cli::output::{Table, print_json};
use crate::services::{Summary, summarize};

pub async fn handle_stats_command(args: StatsArgs, ctx: &AppContext) -> Result<()> {
    let backend = ctx.backend().await?;
    let records = backend.list_records(args.kind).await?;
    let visits = backend.list_visits(None).await?;
    let summary = summarize(args.kind, &records, &visits);

    if args.format == StatsFormat::Json {
        return print_json(&summary);
    }

    println!("{} records: {}", summary.kind, summary.total.to_string().bold());
    println!("  with a visit date:  {}", summary.with_visit_date);
    println!("  with coordinates:   {}", summary.with_coordinates);

    print_breakdown("District", &summary.by_district, args.top);
    print_breakdown("Commodity", &summary.by_commodity, args.top);
    print_breakdown("Status", &summary.by_status, args.top);

    if !summary.visits_per_month.is_empty() {
        println!();
        let mut table = Table::new(["Month", "Visits"]);
        for (month, count) in &summary.visits_per_month {
            table.push([month.clone(), count.to_string()]);
        }
        table.print();
    }
    Ok(())
}

fn print_breakdown(label: &str, counts: &BTreeMap<String, usize>, top: usize) {
    if counts.is_empty() {
        return;
    }
    println!();
    let ranked = Summary::ranked(counts);
    let mut table = Table::new([label, "Count"]);
    for (name, count) in ranked.iter().take(top) {
        table.push([name.to_string(), count.to_string()]);
    }
    table.print();
    if ranked.len() > top {
        println!("{}", format!("… {} more", ranked.len() - top).dimmed());
    }
}
