//! Sync service - reload pages from the content source into flashcards

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{NotionCredential, Page, User};
use crate::ports::{ContentSource, Repository};
use crate::services::parser::{ContentParser, ParseWarning};
use crate::services::reconcile::{reconcile, ReconcilePlan};
use crate::services::UserLocks;

/// What a single page reload changed
#[derive(Debug, Clone, Serialize)]
pub struct ReloadOutcome {
    pub page_id: Uuid,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Marker-tagged blocks that were skipped as malformed
    pub warnings: Vec<ParseWarning>,
    /// Change classes that failed to apply; empty on a clean reload
    pub failures: Vec<String>,
}

impl ReloadOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn changed(&self) -> bool {
        self.inserted + self.updated + self.deleted > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshFailure {
    pub page_id: Uuid,
    pub error: String,
}

/// Result of one scheduled refresh cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshSummary {
    /// Pages that were due for a refresh
    pub checked: usize,
    pub reloaded: Vec<ReloadOutcome>,
    /// Pages whose owner has no Notion credential
    pub skipped_unauthorized: usize,
    pub failed: Vec<RefreshFailure>,
}

/// Sync service for page reloads and scheduled refresh
pub struct SyncService {
    repository: Arc<dyn Repository>,
    source: Arc<dyn ContentSource>,
    parser: ContentParser,
    locks: UserLocks,
    refresh_interval: Duration,
    /// Demo content ignores credentials
    demo_mode: bool,
}

impl SyncService {
    pub fn new(
        repository: Arc<dyn Repository>,
        source: Arc<dyn ContentSource>,
        parser: ContentParser,
        locks: UserLocks,
        refresh_interval: Duration,
        demo_mode: bool,
    ) -> Self {
        Self {
            repository,
            source,
            parser,
            locks,
            refresh_interval,
            demo_mode,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Credential to use for `user`, or `SourceUnauthorized`
    pub(crate) fn credential_for(&self, user: &User) -> Result<NotionCredential> {
        match &user.credential {
            Some(credential) if user.is_authorized() => Ok(credential.clone()),
            _ if self.demo_mode => Ok(NotionCredential::from_token("")),
            _ => Err(Error::SourceUnauthorized(
                "No Notion access token; log in first".to_string(),
            )),
        }
    }

    /// Reload one of the user's pages
    pub fn reload_page(&self, user_id: Uuid, page_id: Uuid) -> Result<ReloadOutcome> {
        self.locks.with_user(user_id, || {
            let user = self
                .repository
                .get_user(user_id)?
                .ok_or_else(|| Error::not_found(format!("user {}", user_id)))?;
            let page = self
                .repository
                .get_page(page_id)?
                .filter(|p| p.user_id == user_id)
                .ok_or_else(|| Error::not_found(format!("page {}", page_id)))?;

            self.reload_locked(&user, &page, Utc::now())
        })
    }

    /// Reload a page; the caller holds the owner's lock
    ///
    /// A fetch failure returns before anything is written. Once the fetch
    /// succeeded, the title is brought up to date, then deletes, inserts and
    /// updates are applied independently and failed classes are reported in
    /// the outcome.
    pub(crate) fn reload_locked(
        &self,
        user: &User,
        page: &Page,
        now: DateTime<Utc>,
    ) -> Result<ReloadOutcome> {
        let credential = self.credential_for(user)?;
        let title = self.source.fetch_title(&credential, &page.external_id)?;
        let blocks = self.source.fetch_blocks(&credential, &page.external_id)?;

        if title != page.title {
            self.repository.set_page_title(page.id, &title)?;
        }

        let parsed = self.parser.parse(page.id, user.id, &blocks);
        let existing = self.repository.get_flashcards_by_page(page.id)?;
        let plan = reconcile(parsed.candidates, existing, now);

        tracing::debug!(
            page_id = %page.id,
            insert = plan.to_insert.len(),
            update = plan.to_update.len(),
            delete = plan.to_delete.len(),
            "reconcile plan"
        );

        let mut outcome = ReloadOutcome {
            page_id: page.id,
            inserted: 0,
            updated: 0,
            deleted: 0,
            warnings: parsed.warnings,
            failures: Vec::new(),
        };
        self.apply_plan(user, plan, &mut outcome);

        if outcome.is_complete() {
            self.repository.set_page_reloaded(page.id, now)?;
        } else {
            tracing::warn!(page_id = %page.id, failures = ?outcome.failures, "reload applied partially");
        }

        Ok(outcome)
    }

    fn apply_plan(&self, user: &User, plan: ReconcilePlan, outcome: &mut ReloadOutcome) {
        if !plan.to_delete.is_empty() {
            match self.delete_cards(user, &plan.to_delete) {
                Ok(()) => outcome.deleted = plan.to_delete.len(),
                Err(e) => outcome.failures.push(format!("delete: {}", e)),
            }
        }

        if !plan.to_insert.is_empty() {
            match self.repository.insert_flashcards(&plan.to_insert) {
                Ok(()) => outcome.inserted = plan.to_insert.len(),
                Err(e) => outcome.failures.push(format!("insert: {}", e)),
            }
        }

        for card in &plan.to_update {
            match self.repository.update_flashcard_content(card) {
                Ok(()) => outcome.updated += 1,
                Err(e) => outcome.failures.push(format!("update {}: {}", card.id, e)),
            }
        }
    }

    /// Delete cards and drop them from the owner's active set
    fn delete_cards(&self, user: &User, ids: &[Uuid]) -> Result<()> {
        self.repository.delete_flashcards(ids)?;

        // Re-read: the user row may have changed since the caller loaded it
        let current = self
            .repository
            .get_user(user.id)?
            .unwrap_or_else(|| user.clone());
        let remaining: Vec<Uuid> = current
            .active_cards
            .iter()
            .copied()
            .filter(|id| !ids.contains(id))
            .collect();
        if remaining.len() != current.active_cards.len() {
            self.repository.set_active_cards(user.id, &remaining)?;
        }
        Ok(())
    }

    /// Reload every page not refreshed within the refresh interval
    ///
    /// Failures are collected per page and never stop the cycle.
    pub fn refresh_stale_pages(&self, now: DateTime<Utc>) -> Result<RefreshSummary> {
        let cutoff = now - self.refresh_interval;
        let pages = self.repository.get_stale_pages(cutoff)?;

        let mut summary = RefreshSummary {
            checked: pages.len(),
            ..RefreshSummary::default()
        };

        for page in pages {
            let result = self.locks.with_user(page.user_id, || {
                let user = self
                    .repository
                    .get_user(page.user_id)?
                    .ok_or_else(|| Error::not_found(format!("user {}", page.user_id)))?;
                if !user.is_authorized() && !self.demo_mode {
                    return Ok(None);
                }
                // The listing was taken before the lock; the page may be gone
                let current = self
                    .repository
                    .get_page(page.id)?
                    .filter(|p| p.user_id == page.user_id)
                    .ok_or_else(|| Error::not_found(format!("page {}", page.id)))?;
                self.reload_locked(&user, &current, now).map(Some)
            });

            match result {
                Ok(Some(outcome)) => summary.reloaded.push(outcome),
                Ok(None) => summary.skipped_unauthorized += 1,
                Err(e) => {
                    tracing::warn!(page_id = %page.id, "scheduled reload failed: {}", e);
                    summary.failed.push(RefreshFailure {
                        page_id: page.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            reloaded = summary.reloaded.len(),
            skipped = summary.skipped_unauthorized,
            failed = summary.failed.len(),
            "refresh cycle finished"
        );

        Ok(summary)
    }
}
