//! Logs command - view and manage the event log

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use flashline_core::services::logging::now_ms;
use flashline_core::services::{EntryPoint, LoggingService};

use super::get_flashline_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let flashline_dir = get_flashline_dir()?;
    std::fs::create_dir_all(&flashline_dir)?;
    LoggingService::new(&flashline_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .context("Failed to open event log")
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List { limit, errors, json } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Entry", "Event", "Context", "Error"]);

            for entry in &entries {
                let context = [entry.command.as_deref(), entry.source.as_deref()]
                    .iter()
                    .filter_map(|&s| s)
                    .collect::<Vec<_>>()
                    .join(", ");

                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.entry_point.clone(),
                    entry.event.clone(),
                    context,
                    entry.error_message.clone().unwrap_or_default(),
                ]);
            }

            println!("{}", table);
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let cutoff_ms = now_ms() - Duration::days(older_than_days).num_milliseconds();

            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete logs older than {} days?", older_than_days))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = service.delete_before(cutoff_ms)?;

            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                println!("Deleted {} log entries", deleted);
            }
        }
        LogsCommands::Stats { json } => {
            let stats = service.stats()?;
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total_entries": stats.total,
                        "error_count": stats.errors,
                        "by_event": stats.by_event,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    })
                );
                return Ok(());
            }

            println!("{}", "Log Statistics".bold());
            println!("  Total entries: {}", stats.total);
            println!("  Errors: {}", stats.errors);
            println!("  Database: {}", db_path.display());
            println!("  Size: {} bytes", size_bytes);

            if !stats.by_event.is_empty() {
                println!();
                let mut table = output::create_table();
                table.set_header(vec!["Event", "Count"]);
                for (event, count) in &stats.by_event {
                    table.add_row(vec![event.clone(), count.to_string()]);
                }
                println!("{}", table);
            }
        }
    }

    Ok(())
}
