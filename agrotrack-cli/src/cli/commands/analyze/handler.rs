//! Workbook analysis handler

use anyhow::Result;
use colored::*;

use super::AnalyzeArgs;
use crate::cli::output::{Table, print_json};
use crate::import::analyze_workbook;
use crate::import::reader::SheetRole;

pub fn handle_analyze_command(args: AnalyzeArgs) -> Result<()> {
    let scan_rows = usize::try_from(args.header_rows).unwrap_or(usize::MAX);
    let analysis = analyze_workbook(&args.file, scan_rows)?;
    if args.json {
        return print_json(&analysis);
    }

    println!("{} ({} sheets)", analysis.source.bold(), analysis.sheets.len());
    println!();

    let mut table = Table::new(["Sheet", "Kind", "Header row", "Data rows", "Headers"]);
    for sheet in &analysis.sheets {
        let kind = match sheet.role {
            SheetRole::Farmer => "farmer",
            SheetRole::AgroProcessor => "agro-processor",
            SheetRole::Summary => "summary",
        };
        let header = sheet
            .header_row
            .map(|row| (row + 1).to_string())
            .unwrap_or_else(|| "not found".to_string());
        table.push([
            sheet.name.clone(),
            kind.to_string(),
            header,
            sheet.data_rows.to_string(),
            sheet.headers.join(", "),
        ]);
    }
    table.print();

    for sheet in analysis.sheets.iter().filter(|s| s.header_row.is_none()) {
        if sheet.role != SheetRole::Summary {
            println!(
                "{} No 'Name' column in the first {} rows of '{}'",
                "!".yellow(),
                scan_rows,
                sheet.name
            );
        }
    }

    println!();
    println!("  Farmers to import:         {}", analysis.farmers.to_string().green().bold());
    println!("  Agro-processors to import: {}", analysis.processors.to_string().green().bold());
    Ok(())
}
