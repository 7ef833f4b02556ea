//! Output formatting utilities

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Local time for display, or "never"
pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "never".to_string(),
    }
}

/// Mastery as a short bar, e.g. `■■□ 1.0`
pub fn mastery_bar(mastery: f64, threshold: f64) -> String {
    let steps = (threshold / 0.5).ceil().max(1.0) as usize;
    let filled = ((mastery / 0.5).floor() as usize).min(steps);
    format!(
        "{}{} {:.1}",
        "■".repeat(filled),
        "□".repeat(steps - filled),
        mastery
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mastery_bar() {
        assert_eq!(mastery_bar(0.0, 1.5), "□□□ 0.0");
        assert_eq!(mastery_bar(1.0, 1.5), "■■□ 1.0");
        assert_eq!(mastery_bar(2.5, 1.5), "■■■ 2.5");
    }

    #[test]
    fn test_format_time_never() {
        assert_eq!(format_time(None), "never");
    }
}
