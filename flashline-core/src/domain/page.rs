//! Page domain model
//!
//! A page is one Notion page a user subscribed to. Its flashcards are
//! rebuilt from the page's blocks on every reload.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Title used until the source reports one
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    /// Notion page id, 32 lowercase hex digits
    pub external_id: String,
    pub user_id: Uuid,
    pub title: String,
    pub last_reloaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Page {
    pub fn new(user_id: Uuid, external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: external_id.into(),
            user_id,
            title: title.into(),
            last_reloaded_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the page is due for a scheduled refresh
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        match self.last_reloaded_at {
            Some(at) => at < cutoff,
            None => true,
        }
    }
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^https?://(?:www\.)?[A-Za-z0-9.-]*notion\.(?:so|site)/(?:[^?#]*[/-])?([0-9a-fA-F]{32})(?:[?#].*)?$",
        )
        .expect("page link regex is valid")
    })
}

/// Extract a normalized Notion page id from a link or a raw id
///
/// Accepts `https://www.notion.so/Some-Title-<32 hex>` style links (also
/// `notion.site` and workspace-prefixed paths), bare 32-hex ids and dashed
/// UUIDs.
pub fn parse_page_reference(input: &str) -> Result<String> {
    let input = input.trim();

    if let Some(caps) = link_regex().captures(input) {
        return Ok(caps[1].to_lowercase());
    }

    let compact: String = input.chars().filter(|c| *c != '-').collect();
    if compact.len() == 32 && compact.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(compact.to_lowercase());
    }

    Err(Error::validation(format!("Invalid Notion page link: {}", input)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ID: &str = "c1ede68fd209478ab1ac96f277a405e0";

    #[test]
    fn test_parse_standard_link() {
        let link = format!("https://www.notion.so/Where-to-get-page-link-{}", ID);
        assert_eq!(parse_page_reference(&link).unwrap(), ID);
    }

    #[test]
    fn test_parse_workspace_link_with_query() {
        let link = format!("https://www.notion.so/acme/Biology-{}?pvs=4", ID);
        assert_eq!(parse_page_reference(&link).unwrap(), ID);
    }

    #[test]
    fn test_parse_public_site_link() {
        let link = format!("https://bloom-eyebrow-74f.notion.site/Page-{}", ID.to_uppercase());
        assert_eq!(parse_page_reference(&link).unwrap(), ID);
    }

    #[test]
    fn test_parse_bare_and_dashed_ids() {
        assert_eq!(parse_page_reference(ID).unwrap(), ID);
        assert_eq!(
            parse_page_reference("c1ede68f-d209-478a-b1ac-96f277a405e0").unwrap(),
            ID
        );
    }

    #[test]
    fn test_reject_garbage() {
        assert!(parse_page_reference("hello").is_err());
        assert!(parse_page_reference("https://example.com/page-123").is_err());
        assert!(parse_page_reference("").is_err());
    }

    #[test]
    fn test_staleness() {
        let mut page = Page::new(Uuid::new_v4(), ID, "Biology");
        let now = Utc::now();
        assert!(page.is_stale(now));

        page.last_reloaded_at = Some(now - Duration::hours(4));
        assert!(page.is_stale(now - Duration::hours(3)));

        page.last_reloaded_at = Some(now - Duration::hours(1));
        assert!(!page.is_stale(now - Duration::hours(3)));
    }
}
