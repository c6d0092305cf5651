//! Registry commands: generate, lookup, redeem, list, stats, export, clear.

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;

use codes::CodeService;
use codes::model::{CodeEntry, CodeStatus, RedeemOutcome};
use codes::service::ListFilter;
use codes::sheet::SheetPage;
use voucher_core::ListParams;

/// Exit status of `voucher redeem` for each outcome.
pub fn redeem_status(outcome: &RedeemOutcome) -> u8 {
    match outcome {
        RedeemOutcome::Redeemed { .. } => 0,
        RedeemOutcome::AlreadyUsed { .. } => 3,
        RedeemOutcome::NotFound { .. } => 4,
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn entry_header() -> String {
    format!(
        "{:<14} {:<7} {:<26} {:<26} {}",
        "CODE", "STATUS", "CREATED", "USED", "BATCH"
    )
}

fn entry_row(e: &CodeEntry) -> String {
    let used = e.used_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into());
    format!(
        "{:<14} {:<7} {:<26} {:<26} {}",
        e.id,
        e.status.as_str(),
        e.created_at.to_rfc3339(),
        used,
        e.batch_id
    )
}

/// Text grid for one sheet page: one line per row, cells padded to width.
pub fn render_page(page: &SheetPage, columns: usize) -> String {
    let width = page.cells.iter().map(|c| c.id.len()).max().unwrap_or(0);
    let rows = page.cells.iter().map(|c| c.row + 1).max().unwrap_or(0);
    let mut grid = vec![vec![String::new(); columns]; rows];
    for cell in &page.cells {
        if cell.column < columns {
            grid[cell.row][cell.column] = cell.id.clone();
        }
    }

    let mut out = format!("Page {}\n", page.number);
    for row in grid {
        let line: Vec<String> = row.iter().map(|id| format!("{:<width$}", id)).collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

pub async fn generate(
    svc: &CodeService,
    count: Option<usize>,
    batch: Option<String>,
    json: bool,
) -> Result<ExitCode> {
    let batch = svc.generate(count, batch).await?;
    if json {
        print_json(&batch)?;
    } else {
        println!("Batch {} ({} codes)", batch.batch_id, batch.codes.len());
        for entry in &batch.codes {
            println!("{}", entry.id);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn lookup(svc: &CodeService, code: &str, json: bool) -> Result<ExitCode> {
    let Some(entry) = svc.lookup(code).await? else {
        eprintln!("Code {} not found.", code.trim());
        return Ok(ExitCode::from(4));
    };
    if json {
        print_json(&entry)?;
    } else {
        println!("Code:      {}", entry.id);
        println!("Status:    {}", entry.status);
        println!("Created:   {}", entry.created_at.to_rfc3339());
        match entry.used_at {
            Some(t) => println!("Used:      {}", t.to_rfc3339()),
            None => println!("Used:      -"),
        }
        println!("Batch:     {}", entry.batch_id);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn redeem(svc: &CodeService, code: &str, json: bool) -> Result<ExitCode> {
    let outcome = svc.redeem(code).await?;
    if json {
        print_json(&outcome)?;
    } else {
        match &outcome {
            RedeemOutcome::Redeemed { entry } => {
                println!("Code {} redeemed.", entry.id);
            }
            RedeemOutcome::AlreadyUsed { id, used_at } => {
                println!("Code {} was already used at {}.", id, used_at.to_rfc3339());
            }
            RedeemOutcome::NotFound { id } => {
                println!("Code {} not found.", id);
            }
        }
    }
    Ok(ExitCode::from(redeem_status(&outcome)))
}

pub async fn list(
    svc: &CodeService,
    status: Option<String>,
    batch: Option<String>,
    params: ListParams,
    json: bool,
) -> Result<ExitCode> {
    let status = status
        .as_deref()
        .map(str::parse::<CodeStatus>)
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let filter = ListFilter {
        status,
        batch_id: batch,
    };
    let page = svc.list(&filter, &params).await?;
    if json {
        print_json(&page)?;
    } else {
        println!("{}", entry_header());
        for entry in &page.items {
            println!("{}", entry_row(entry));
        }
        println!(
            "({} of {} shown, offset {})",
            page.items.len(),
            page.total,
            params.offset
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn stats(svc: &CodeService, json: bool) -> Result<ExitCode> {
    let stats = svc.stats().await?;
    if json {
        print_json(&stats)?;
    } else {
        println!("Total:     {}", stats.total);
        println!("Unused:    {}", stats.unused);
        println!("Used:      {}", stats.used);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn export(
    svc: &CodeService,
    batch: Option<String>,
    limit: usize,
    json: bool,
) -> Result<ExitCode> {
    let pages = svc.export_sheet(batch.as_deref(), limit).await?;
    if json {
        print_json(&pages)?;
    } else if pages.is_empty() {
        println!("No unused codes to export.");
    } else {
        let columns = svc.layout().columns;
        for page in &pages {
            println!("{}", render_page(page, columns));
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn clear(svc: &CodeService, yes: bool) -> Result<ExitCode> {
    if !yes {
        let stats = svc.stats().await?;
        eprint!(
            "Delete all {} codes ({} used)? This cannot be undone. [y/N]: ",
            stats.total, stats.used
        );
        std::io::stderr().flush()?;
        let mut s = String::new();
        std::io::stdin().read_line(&mut s)?;
        if !s.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }
    svc.clear_all().await?;
    println!("Registry cleared.");
    Ok(ExitCode::SUCCESS)
}
