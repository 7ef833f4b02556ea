//! Reconciliation of parsed candidates against stored flashcards

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Flashcard, FlashcardCandidate};

/// Changes needed to make a page's stored cards match its content
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub to_insert: Vec<Flashcard>,
    pub to_update: Vec<Flashcard>,
    pub to_delete: Vec<Uuid>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Diff candidates against the cards currently stored for the same page
///
/// Cards are matched by block id. Matched cards keep their id, mastery and
/// creation time; only changed text is carried into `to_update`.
pub fn reconcile(
    candidates: Vec<FlashcardCandidate>,
    existing: Vec<Flashcard>,
    now: DateTime<Utc>,
) -> ReconcilePlan {
    let mut working: HashMap<String, Flashcard> = existing
        .into_iter()
        .map(|card| (card.block_id.clone(), card))
        .collect();

    let mut plan = ReconcilePlan::default();

    for candidate in candidates {
        match working.remove(&candidate.block_id) {
            None => plan.to_insert.push(Flashcard::from_candidate(candidate, now)),
            Some(mut card) => {
                if card.content_differs(&candidate) {
                    card.front = candidate.front;
                    card.back = candidate.back;
                    card.edited_at = Some(now);
                    plan.to_update.push(card);
                }
            }
        }
    }

    let mut leftover: Vec<Flashcard> = working.into_values().collect();
    leftover.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    plan.to_delete = leftover.into_iter().map(|card| card.id).collect();

    plan
}
