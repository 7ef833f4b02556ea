//! Status service - per-user study summary

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::Limits;
use crate::domain::result::{Error, Result};
use crate::ports::Repository;

pub struct StatusService {
    repository: Arc<dyn Repository>,
    limits: Limits,
}

impl StatusService {
    pub fn new(repository: Arc<dyn Repository>, limits: Limits) -> Self {
        Self { repository, limits }
    }

    pub fn get_status(&self, user_id: Uuid) -> Result<StatusSummary> {
        let user = self
            .repository
            .get_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("user {}", user_id)))?;
        let pages = self.repository.count_pages(user_id)?;
        let (flashcards, graduated) = self
            .repository
            .count_flashcards(user_id, self.limits.graduation_threshold)?;

        Ok(StatusSummary {
            first_name: user.first_name.clone(),
            authorized: user.is_authorized(),
            workspace_name: user.credential.and_then(|c| c.workspace_name),
            study_mode: user.study_mode,
            pages,
            max_pages: self.limits.max_pages,
            flashcards,
            active: user.active_cards.len(),
            max_active: self.limits.max_active_cards,
            graduated,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub first_name: String,
    pub authorized: bool,
    pub workspace_name: Option<String>,
    pub study_mode: bool,
    pub pages: usize,
    pub max_pages: usize,
    pub flashcards: usize,
    pub active: usize,
    pub max_active: usize,
    pub graduated: usize,
}
