//! Content parser - turns page blocks into flashcard candidates
//!
//! A bulleted list item becomes a card when its text carries the marker:
//! `🧩 front::back`. Everything else on the page is ignored.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Block, BlockKind, FlashcardCandidate, RichText};

/// Separator between the front and back of a card
pub const SEPARATOR: &str = "::";

/// A marker-tagged block that could not be turned into a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub block_id: String,
    pub reason: String,
}

/// Candidates plus the blocks that were skipped as malformed
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub candidates: Vec<FlashcardCandidate>,
    pub warnings: Vec<ParseWarning>,
}

/// Stateless block parser
#[derive(Debug, Clone)]
pub struct ContentParser {
    marker: String,
}

impl ContentParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Parse the blocks of one page
    ///
    /// Output order follows block order. When a block id occurs more than
    /// once only the first occurrence is considered.
    pub fn parse(&self, page_id: Uuid, user_id: Uuid, blocks: &[Block]) -> ParseOutput {
        let mut output = ParseOutput::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for block in blocks {
            if !seen.insert(block.id.as_str()) {
                continue;
            }

            let parsed = match &block.kind {
                BlockKind::BulletedListItem { rich_text } => {
                    self.parse_bullet(&block.id, rich_text)
                }
                BlockKind::Unsupported { .. } => Ok(None),
            };

            match parsed {
                Ok(Some((front, back))) => output.candidates.push(FlashcardCandidate {
                    block_id: block.id.clone(),
                    page_id,
                    user_id,
                    front,
                    back,
                }),
                Ok(None) => {}
                Err(Error::MalformedContent { block_id, reason }) => {
                    tracing::warn!(%page_id, block_id = %block_id, "skipping malformed flashcard: {}", reason);
                    output.warnings.push(ParseWarning { block_id, reason });
                }
                Err(other) => {
                    tracing::warn!(%page_id, block_id = %block.id, "skipping block: {}", other);
                    output.warnings.push(ParseWarning {
                        block_id: block.id.clone(),
                        reason: other.to_string(),
                    });
                }
            }
        }

        output
    }

    /// `Ok(None)` for ordinary bullets, `Ok(Some((front, back)))` for cards
    fn parse_bullet(&self, block_id: &str, rich_text: &[RichText]) -> Result<Option<(String, String)>> {
        let text: String = rich_text.iter().map(|run| run.plain_text.as_str()).collect();
        if !text.contains(&self.marker) {
            return Ok(None);
        }

        let body = text.replace(&self.marker, "");
        let parts: Vec<&str> = body.split(SEPARATOR).collect();
        let malformed = |reason: &str| Error::MalformedContent {
            block_id: block_id.to_string(),
            reason: reason.to_string(),
        };

        match parts.as_slice() {
            [front, back] => {
                let (front, back) = (front.trim(), back.trim());
                if front.is_empty() {
                    Err(malformed("front side is empty"))
                } else if back.is_empty() {
                    Err(malformed("back side is empty"))
                } else {
                    Ok(Some((front.to_string(), back.to_string())))
                }
            }
            [_] => Err(malformed("missing '::' separator")),
            _ => Err(malformed("more than one '::' separator")),
        }
    }
}
