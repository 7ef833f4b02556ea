//! Pages command - subscribe to, reload and remove Notion pages

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use flashline_core::services::{LogEvent, ReloadOutcome};

use super::{current_user, get_context, get_logger, log_event, logged, Identity};
use crate::output;

/// Pages shown per list page
const PER_PAGE: usize = 10;

#[derive(Subcommand)]
pub enum PagesCommands {
    /// List subscribed pages
    List {
        /// Page of results (starting at 1)
        #[arg(long, default_value = "1")]
        page: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Subscribe to a Notion page by link or id
    Add {
        link: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reload a page from Notion now
    Reload {
        /// Page id or Notion link
        page: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Unsubscribe from a page and delete its flashcards
    Remove {
        /// Page id or Notion link
        page: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(identity: &Identity, command: PagesCommands) -> Result<()> {
    let ctx = get_context()?;
    let user = current_user(&ctx, identity)?;
    let logger = get_logger();
    let source = ctx.sync_service.source_name().to_string();

    match command {
        PagesCommands::List { page, json } => {
            let list = ctx.page_service.list_pages(user.id, page, PER_PAGE)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
                return Ok(());
            }

            if list.pages.is_empty() {
                if list.total == 0 {
                    println!("No pages yet. Add one with 'fl pages add <link>'.");
                } else {
                    output::warning(&format!(
                        "Page {} is empty ({} pages of results)",
                        list.page_number,
                        list.total_pages()
                    ));
                }
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["ID", "Title", "Notion page", "Last reload"]);
            for p in &list.pages {
                table.add_row(vec![
                    p.id.to_string(),
                    p.title.clone(),
                    p.external_id.clone(),
                    output::format_time(p.last_reloaded_at),
                ]);
            }
            println!("{}", table);
            println!(
                "{}",
                format!(
                    "Page {} of {} ({} total)",
                    list.page_number,
                    list.total_pages(),
                    list.total
                )
                .dimmed()
            );
        }
        PagesCommands::Add { link, json } => {
            let outcome = logged(
                &logger,
                "page_added",
                "pages add",
                ctx.page_service.add_page(user.id, &link),
            )?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }

            output::success(&format!("Added \"{}\"", outcome.page.title));
            print_reload(&outcome.reload);
        }
        PagesCommands::Reload { page, json } => {
            let page = ctx.page_service.resolve_page(user.id, &page)?;
            let outcome = ctx.sync_service.reload_page(user.id, page.id);

            let outcome = match outcome {
                Ok(outcome) => {
                    log_event(
                        &logger,
                        LogEvent::new("page_reloaded")
                            .with_source(&source)
                            .with_command("pages reload"),
                    );
                    outcome
                }
                Err(e) => {
                    log_event(
                        &logger,
                        LogEvent::new("reload_failed")
                            .with_source(&source)
                            .with_command("pages reload")
                            .with_error(e.user_message())
                            .with_error_details(e.to_string()),
                    );
                    return Err(anyhow::anyhow!(e.user_message()));
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }

            output::success(&format!("Reloaded \"{}\"", page.title));
            print_reload(&outcome);
        }
        PagesCommands::Remove { page, force } => {
            let page = ctx.page_service.resolve_page(user.id, &page)?;

            if !force {
                println!(
                    "\n{}",
                    format!("This will remove \"{}\" and all of its flashcards.", page.title)
                        .yellow()
                );
                println!("{}\n", "Study progress on those cards is lost.".dimmed());

                if !Confirm::new()
                    .with_prompt("Are you sure?")
                    .default(false)
                    .interact()?
                {
                    println!("{}\n", "Cancelled".dimmed());
                    return Ok(());
                }
            }

            logged(
                &logger,
                "page_removed",
                "pages remove",
                ctx.page_service.delete_page(user.id, page.id),
            )?;
            println!("\n{} Removed \"{}\"\n", "✓".green(), page.title);
        }
    }

    Ok(())
}

fn print_reload(outcome: &ReloadOutcome) {
    println!(
        "  {} new, {} updated, {} deleted",
        outcome.inserted, outcome.updated, outcome.deleted
    );

    if !outcome.warnings.is_empty() {
        output::warning(&format!(
            "  {} tagged block(s) skipped:",
            outcome.warnings.len()
        ));
        for warning in &outcome.warnings {
            println!("    {} {}", warning.block_id.dimmed(), warning.reason);
        }
    }

    if !outcome.is_complete() {
        output::warning(&format!(
            "  Some changes could not be saved ({}); they will be retried on the next reload",
            outcome.failures.join(", ")
        ));
    }
}
