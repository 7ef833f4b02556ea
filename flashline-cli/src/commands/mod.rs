//! CLI command implementations

pub mod demo;
pub mod login;
pub mod logs;
pub mod pages;
pub mod refresh;
pub mod status;
pub mod study;

use std::path::PathBuf;

use anyhow::{Context, Result};
use flashline_core::services::{EntryPoint, LogEvent, LoggingService};
use flashline_core::{FlashlineContext, User};

/// Chat identity the CLI acts as
pub struct Identity {
    pub chat_id: i64,
    pub first_name: String,
}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let flashline_dir = get_flashline_dir().ok()?;
    std::fs::create_dir_all(&flashline_dir).ok()?;
    LoggingService::new(&flashline_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!(error = %e, "failed to write event log");
        }
    }
}

/// Get the flashline directory from environment or default
pub fn get_flashline_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("FLASHLINE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".flashline"))
        .context("Could not find home directory; set FLASHLINE_DIR")
}

/// Open the flashline context
pub fn get_context() -> Result<FlashlineContext> {
    let flashline_dir = get_flashline_dir()?;

    std::fs::create_dir_all(&flashline_dir)
        .with_context(|| format!("Failed to create flashline directory: {:?}", flashline_dir))?;

    FlashlineContext::new(&flashline_dir).context("Failed to initialize flashline context")
}

/// Resolve the acting user, registering the chat identity on first use
pub fn current_user(ctx: &FlashlineContext, identity: &Identity) -> Result<User> {
    ctx.session_service
        .get_or_register(identity.chat_id, &identity.first_name)
        .context("Failed to resolve user")
}

/// Run a core call, writing an error event on failure
pub fn logged<T>(
    logger: &Option<LoggingService>,
    event: &str,
    command: &str,
    result: flashline_core::Result<T>,
) -> Result<T> {
    match result {
        Ok(value) => {
            log_event(logger, LogEvent::new(event).with_command(command));
            Ok(value)
        }
        Err(e) => {
            log_event(
                logger,
                LogEvent::new(format!("{}_failed", event))
                    .with_command(command)
                    .with_error(e.user_message())
                    .with_error_details(e.to_string()),
            );
            Err(anyhow::anyhow!(e.user_message()))
        }
    }
}
