//! Study command - work through the active set

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use flashline_core::services::{AnswerOutcome, LogEvent, LoggingService};
use flashline_core::{Flashcard, Grade, OperationResult};
use uuid::Uuid;

use super::{current_user, get_context, get_logger, log_event, logged, Identity};
use crate::output;

#[derive(Subcommand)]
pub enum StudyCommands {
    /// Enter study mode and show the first card
    Start,
    /// Leave study mode
    Stop,
    /// Show the next card to review
    Next {
        /// Also print the back of the card
        #[arg(long)]
        reveal: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Grade your recall of a card (easy, hard, yes, no)
    Answer {
        /// Card id shown by 'fl study next'
        card: String,
        grade: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(identity: &Identity, command: StudyCommands) -> Result<()> {
    let ctx = get_context()?;
    let user = current_user(&ctx, identity)?;
    let logger = get_logger();
    let threshold = ctx.config.limits.graduation_threshold;

    match command {
        StudyCommands::Start => {
            logged(
                &logger,
                "study_started",
                "study start",
                ctx.study_service.start_study(user.id),
            )?;
            output::success("Study mode on");
            println!();
            match ctx.study_service.next_card(user.id)? {
                Some(card) => print_card(&card, threshold, false),
                None => print_exhausted(),
            }
        }
        StudyCommands::Stop => {
            logged(
                &logger,
                "study_stopped",
                "study stop",
                ctx.study_service.stop_study(user.id),
            )?;
            output::info("Study mode off");
        }
        StudyCommands::Next { reveal, json } => {
            let card = ctx.study_service.next_card(user.id)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&card)?);
                return Ok(());
            }

            match card {
                Some(card) => print_card(&card, threshold, reveal),
                None => print_exhausted(),
            }
        }
        StudyCommands::Answer { card, grade, json } => {
            let card_id = Uuid::parse_str(card.trim())
                .with_context(|| format!("'{}' is not a card id", card))?;
            let grade: Grade = grade.parse().map_err(|e: flashline_core::Error| {
                anyhow::anyhow!(e.user_message())
            })?;

            let result = ctx.study_service.record_answer(user.id, card_id, grade);

            if json {
                let report: OperationResult<AnswerOutcome> = result.into();
                let failed = !report.success;
                log_answer(&logger, report.error.as_deref());
                println!("{}", serde_json::to_string_pretty(&report)?);
                if failed {
                    anyhow::bail!("Answer was not recorded");
                }
                return Ok(());
            }

            let outcome = logged(&logger, "card_answered", "study answer", result)?;

            println!(
                "{} {}",
                format!("Recorded '{}':", outcome.grade).bold(),
                output::mastery_bar(outcome.mastery, threshold)
            );
            if outcome.graduated {
                output::success("Card graduated");
            }
        }
    }

    Ok(())
}

/// Event for a JSON answer, mirroring what `logged` writes
fn answer_event(error: Option<&str>) -> LogEvent {
    let event = match error {
        None => LogEvent::new("card_answered"),
        Some(message) => LogEvent::new("card_answered_failed").with_error(message),
    };
    event.with_command("study answer --json")
}

fn log_answer(logger: &Option<LoggingService>, error: Option<&str>) {
    log_event(logger, answer_event(error));
}

fn print_card(card: &Flashcard, threshold: f64, reveal: bool) {
    println!("{}", card.front.bold());
    if reveal {
        println!("{}", card.back.cyan());
    }
    println!();
    println!(
        "{}  {}",
        output::mastery_bar(card.mastery, threshold),
        format!("fl study answer {} <easy|hard|yes|no>", card.id).dimmed()
    );
}

fn print_exhausted() {
    output::info("No cards left to study. Add pages or edit your notes to get more.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_answer_events_match_plain_ones() {
        let ok = answer_event(None);
        assert_eq!(ok.event, "card_answered");
        assert_eq!(ok.command.as_deref(), Some("study answer --json"));
        assert!(ok.error_message.is_none());

        let failed = answer_event(Some("Not found: flashcard"));
        assert_eq!(failed.event, "card_answered_failed");
        assert_eq!(failed.error_message.as_deref(), Some("Not found: flashcard"));
    }
}
