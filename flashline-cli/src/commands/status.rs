//! Status command - show pages, cards and study progress

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{current_user, get_context, Identity};

pub fn run(identity: &Identity, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user = current_user(&ctx, identity)?;
    let status = ctx.status_service.get_status(user.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", format!("Flashline status for {}", status.first_name).bold());
    if ctx.config.demo_mode {
        println!("{}", "Demo mode is on".yellow());
    }
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let notion = match (status.authorized, &status.workspace_name) {
        (true, Some(name)) => name.clone(),
        (true, None) => "connected".to_string(),
        (false, _) => "not connected".to_string(),
    };
    table.add_row(vec!["Notion", &notion]);
    table.add_row(vec![
        "Pages",
        &format!("{} / {}", status.pages, status.max_pages),
    ]);
    table.add_row(vec!["Flashcards", &status.flashcards.to_string()]);
    table.add_row(vec![
        "Active",
        &format!("{} / {}", status.active, status.max_active),
    ]);
    table.add_row(vec!["Graduated", &status.graduated.to_string()]);
    table.add_row(vec![
        "Study mode",
        if status.study_mode { "on" } else { "off" },
    ]);

    println!("{}", table);

    if !status.authorized && !ctx.config.demo_mode {
        println!();
        println!("{}", "Run 'fl login' to connect Notion.".dimmed());
    }

    Ok(())
}
