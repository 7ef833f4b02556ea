//! Flashcard domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted flashcard
///
/// `(page_id, block_id)` is the identity used by reconciliation; `id` is the
/// local handle referenced from a user's active set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: Uuid,
    pub page_id: Uuid,
    pub user_id: Uuid,
    /// Notion block the card was parsed from
    pub block_id: String,
    pub front: String,
    pub back: String,
    /// Non-negative mastery score; cards at or above the graduation
    /// threshold leave active study
    pub mastery: f64,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl Flashcard {
    /// Materialize a parsed candidate as a brand-new card
    pub fn from_candidate(candidate: FlashcardCandidate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            page_id: candidate.page_id,
            user_id: candidate.user_id,
            block_id: candidate.block_id,
            front: candidate.front,
            back: candidate.back,
            mastery: 0.0,
            created_at: now,
            edited_at: None,
        }
    }

    pub fn is_graduated(&self, threshold: f64) -> bool {
        self.mastery >= threshold
    }

    /// True if the candidate carries different text than this card
    pub fn content_differs(&self, candidate: &FlashcardCandidate) -> bool {
        self.front != candidate.front || self.back != candidate.back
    }
}

/// A flashcard parsed from a block but not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardCandidate {
    pub block_id: String,
    pub page_id: Uuid,
    pub user_id: Uuid,
    pub front: String,
    pub back: String,
}
