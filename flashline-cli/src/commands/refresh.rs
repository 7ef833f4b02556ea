//! Refresh command - reload stale pages once or on an interval

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use flashline_core::services::{LogEvent, LoggingService, RefreshSummary, SyncService};

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(watch: bool, every_minutes: u64, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    if !watch {
        let summary = ctx.sync_service.refresh_stale_pages(Utc::now())?;
        record(&logger, ctx.sync_service.source_name(), &summary);
        return print_summary(&summary, json);
    }

    if every_minutes == 0 {
        anyhow::bail!("--every-minutes must be at least 1");
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(watch_loop(
        Arc::clone(&ctx.sync_service),
        logger,
        Duration::from_secs(every_minutes * 60),
        json,
    ))
}

async fn watch_loop(
    sync: Arc<SyncService>,
    logger: Option<LoggingService>,
    period: Duration,
    json: bool,
) -> Result<()> {
    let mut interval = tokio::time::interval(period);
    let source = sync.source_name().to_string();

    if !json {
        output::info(&format!(
            "Refreshing every {} minute(s); press Ctrl-C to stop",
            period.as_secs() / 60
        ));
    }

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let sync = Arc::clone(&sync);
                let cycle = tokio::task::spawn_blocking(move || sync.refresh_stale_pages(Utc::now()))
                    .await
                    .context("Refresh task panicked")?;

                match cycle {
                    Ok(summary) => {
                        record(&logger, &source, &summary);
                        print_summary(&summary, json)?;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "refresh cycle failed");
                        log_event(
                            &logger,
                            LogEvent::new("refresh_failed")
                                .with_source(source.as_str())
                                .with_command("refresh --watch")
                                .with_error(e.user_message())
                                .with_error_details(e.to_string()),
                        );
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if !json {
                    println!();
                    output::info("Stopped");
                }
                return Ok(());
            }
        }
    }
}

fn record(logger: &Option<LoggingService>, source: &str, summary: &RefreshSummary) {
    log_event(
        logger,
        LogEvent::new("refresh_cycle")
            .with_source(source)
            .with_command("refresh"),
    );
    for failure in &summary.failed {
        log_event(
            logger,
            LogEvent::new("reload_failed")
                .with_source(source)
                .with_command("refresh")
                .with_error(failure.error.as_str()),
        );
    }
}

fn print_summary(summary: &RefreshSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
        return Ok(());
    }

    let stamp = Utc::now().format("%H:%M:%S").to_string();
    if summary.checked == 0 {
        println!("{} {}", stamp.dimmed(), "No pages due for a refresh");
        return Ok(());
    }

    let changed = summary.reloaded.iter().filter(|r| r.changed()).count();
    println!(
        "{} {} page(s) due: {} reloaded ({} changed), {} skipped, {} failed",
        stamp.dimmed(),
        summary.checked,
        summary.reloaded.len(),
        changed,
        summary.skipped_unauthorized,
        summary.failed.len()
    );
    for failure in &summary.failed {
        println!("  {} {}: {}", "Error:".red(), failure.page_id, failure.error);
    }

    Ok(())
}
