//! Study service - active set scheduling and answer grading
//!
//! Each user studies from a small active set of cards. `next_card` keeps the
//! set topped up from cards below the graduation threshold and always picks
//! the least-mastered member; `record_answer` moves the mastery score and
//! drops cards from the set once they graduate.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::Limits;
use crate::domain::result::{Error, Result};
use crate::domain::{Flashcard, Grade, User};
use crate::ports::Repository;
use crate::services::UserLocks;

/// Maps a grade onto a new mastery score
pub trait GradingPolicy: Send + Sync {
    fn apply(&self, mastery: f64, grade: Grade) -> f64;
}

/// `yes` adds half a point, `no` resets to zero, `easy` and `hard` keep the score
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryGrading;

impl BinaryGrading {
    pub const STEP: f64 = 0.5;
}

impl GradingPolicy for BinaryGrading {
    fn apply(&self, mastery: f64, grade: Grade) -> f64 {
        match grade {
            Grade::Yes => mastery + Self::STEP,
            Grade::No => 0.0,
            Grade::Easy | Grade::Hard => mastery,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub card_id: Uuid,
    pub grade: Grade,
    pub previous_mastery: f64,
    pub mastery: f64,
    /// Mastery reached the graduation threshold; an active card leaves the set
    pub graduated: bool,
}

pub struct StudyService {
    repository: Arc<dyn Repository>,
    locks: UserLocks,
    limits: Limits,
    grading: Box<dyn GradingPolicy>,
}

impl StudyService {
    pub fn new(repository: Arc<dyn Repository>, locks: UserLocks, limits: Limits) -> Self {
        Self::with_grading(repository, locks, limits, Box::new(BinaryGrading))
    }

    pub fn with_grading(
        repository: Arc<dyn Repository>,
        locks: UserLocks,
        limits: Limits,
        grading: Box<dyn GradingPolicy>,
    ) -> Self {
        Self {
            repository,
            locks,
            limits,
            grading,
        }
    }

    fn load_user(&self, user_id: Uuid) -> Result<User> {
        self.repository
            .get_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("user {}", user_id)))
    }

    pub fn start_study(&self, user_id: Uuid) -> Result<()> {
        self.locks.with_user(user_id, || {
            self.load_user(user_id)?;
            self.repository.set_study_mode(user_id, true)
        })
    }

    pub fn stop_study(&self, user_id: Uuid) -> Result<()> {
        self.locks.with_user(user_id, || {
            self.load_user(user_id)?;
            self.repository.set_study_mode(user_id, false)
        })
    }

    /// Pick the next card to show
    ///
    /// Returns `None` when the user has nothing left below the threshold;
    /// study mode is switched off in that case.
    pub fn next_card(&self, user_id: Uuid) -> Result<Option<Flashcard>> {
        self.locks.with_user(user_id, || {
            let user = self.load_user(user_id)?;

            // Drop ids that no longer resolve to one of the user's cards
            let resolved = self
                .repository
                .get_user_flashcards_by_ids(user_id, &user.active_cards)?;
            let mut active: Vec<Flashcard> = user
                .active_cards
                .iter()
                .filter_map(|id| resolved.iter().find(|c| c.id == *id).cloned())
                .collect();

            let capacity = self.limits.max_active_cards.saturating_sub(active.len());
            if capacity > 0 {
                let exclude: Vec<Uuid> = active.iter().map(|c| c.id).collect();
                let admitted = self.repository.get_eligible_flashcards(
                    user_id,
                    self.limits.graduation_threshold,
                    &exclude,
                    capacity,
                )?;
                active.extend(admitted);
            }

            let ids: Vec<Uuid> = active.iter().map(|c| c.id).collect();
            if ids != user.active_cards {
                self.repository.set_active_cards(user_id, &ids)?;
            }

            let next = active
                .into_iter()
                .min_by(|a, b| a.mastery.total_cmp(&b.mastery).then(a.id.cmp(&b.id)));

            if next.is_none() && user.study_mode {
                tracing::debug!(%user_id, "no cards left, leaving study mode");
                self.repository.set_study_mode(user_id, false)?;
            }

            Ok(next)
        })
    }

    /// Grade the user's recall of a card
    pub fn record_answer(&self, user_id: Uuid, card_id: Uuid, grade: Grade) -> Result<AnswerOutcome> {
        self.locks.with_user(user_id, || {
            let user = self.load_user(user_id)?;
            let card = self
                .repository
                .get_flashcard(card_id)?
                .filter(|c| c.user_id == user_id)
                .ok_or_else(|| Error::not_found(format!("flashcard {}", card_id)))?;

            let mastery = self.grading.apply(card.mastery, grade).max(0.0);
            if mastery != card.mastery {
                self.repository.set_mastery(card_id, mastery)?;
            }

            let graduated = mastery >= self.limits.graduation_threshold;
            if graduated && user.is_active(card_id) {
                let remaining: Vec<Uuid> = user
                    .active_cards
                    .iter()
                    .copied()
                    .filter(|id| *id != card_id)
                    .collect();
                self.repository.set_active_cards(user_id, &remaining)?;
            }

            Ok(AnswerOutcome {
                card_id,
                grade,
                previous_mastery: card.mastery,
                mastery,
                graduated,
            })
        })
    }
}
