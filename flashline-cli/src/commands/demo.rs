//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use flashline_core::adapters::demo::demo_page_ids;
use flashline_core::config::Config;
use flashline_core::services::LogEvent;
use flashline_core::Error;

use super::{current_user, get_context, get_flashline_dir, get_logger, log_event, Identity};

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode and subscribe to the sample pages
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off,
    /// Show demo mode status
    Status,
}

pub fn run(identity: &Identity, command: Option<DemoCommands>) -> Result<()> {
    let flashline_dir = get_flashline_dir()?;
    std::fs::create_dir_all(&flashline_dir)?;
    let mut config = Config::load(&flashline_dir)?;

    match command {
        Some(DemoCommands::On) => {
            config.enable_demo_mode();
            config.save(&flashline_dir)?;

            let added = populate(identity)?;
            log_event(&get_logger(), LogEvent::new("demo_enabled").with_source("demo"));

            println!("{}", "Demo mode enabled".green());
            if added > 0 {
                println!("Added {} sample page(s). Run 'fl study start' to try them.", added);
            }
            Ok(())
        }
        Some(DemoCommands::Off) => {
            config.disable_demo_mode();
            config.save(&flashline_dir)?;
            log_event(&get_logger(), LogEvent::new("demo_disabled"));
            // Demo data lives in its own database and is kept for next time
            println!("{}", "Demo mode disabled".yellow());
            Ok(())
        }
        Some(DemoCommands::Status) | None => {
            if config.demo_mode {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
            Ok(())
        }
    }
}

/// Subscribe the current identity to every sample page it doesn't have yet
fn populate(identity: &Identity) -> Result<usize> {
    let ctx = get_context()?;
    let user = current_user(&ctx, identity)?;

    let mut added = 0;
    for page_id in demo_page_ids() {
        match ctx.page_service.add_page(user.id, page_id) {
            Ok(_) => added += 1,
            Err(Error::LimitExceeded(reason)) => {
                tracing::debug!(page_id, %reason, "sample page not added");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(added)
}
