//! Login command - connect a Notion workspace

use anyhow::Result;
use colored::Colorize;
use flashline_core::services::LogEvent;
use flashline_core::NotionCredential;

use super::{current_user, get_context, get_logger, log_event, logged, Identity};
use crate::output;

pub fn run(identity: &Identity, token: Option<String>, code: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    let user = current_user(&ctx, identity)?;
    let logger = get_logger();

    if let Some(token) = token {
        logged(
            &logger,
            "login",
            "login --token",
            ctx.session_service
                .set_credential(user.id, NotionCredential::from_token(token)),
        )?;
        output::success("Notion integration token saved");
        return Ok(());
    }

    if let Some(code) = code {
        let user = logged(
            &logger,
            "login",
            "login --code",
            ctx.session_service
                .complete_authorization(&user.id.to_string(), &code, &ctx.oauth),
        )?;
        let workspace = user
            .credential
            .and_then(|c| c.workspace_name)
            .unwrap_or_else(|| "your workspace".to_string());
        output::success(&format!("Connected to {}", workspace));
        return Ok(());
    }

    let url = logged(
        &logger,
        "login_started",
        "login",
        ctx.session_service.login_url(user.id, &ctx.oauth),
    )?;

    println!("{}", "Open this link to grant Flashline access to your pages:".bold());
    println!();
    println!("  {}", url);
    println!();
    println!(
        "{}",
        "Then run 'fl login --code <code>' with the code from the redirect.".dimmed()
    );
    Ok(())
}

pub fn run_logout(identity: &Identity) -> Result<()> {
    let ctx = get_context()?;
    let user = current_user(&ctx, identity)?;

    if !user.is_authorized() {
        output::warning("Not logged in");
        return Ok(());
    }

    ctx.session_service.clear_credential(user.id)?;
    log_event(&get_logger(), LogEvent::new("logout").with_command("logout"));
    output::success("Notion credential removed");
    Ok(())
}
