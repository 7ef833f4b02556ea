//! Page service - page subscriptions per user

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Limits;
use crate::domain::result::{Error, Result};
use crate::domain::{parse_page_reference, Page, UNTITLED};
use crate::ports::Repository;
use crate::services::{ReloadOutcome, SyncService, UserLocks};

/// A newly added page and its first reload
#[derive(Debug, Clone, Serialize)]
pub struct AddPageOutcome {
    pub page: Page,
    pub reload: ReloadOutcome,
}

/// One page of a user's page list
#[derive(Debug, Clone, Serialize)]
pub struct PageList {
    pub pages: Vec<Page>,
    /// 1-based
    pub page_number: usize,
    pub per_page: usize,
    pub total: usize,
}

impl PageList {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.per_page.max(1))
    }
}

pub struct PageService {
    repository: Arc<dyn Repository>,
    sync: Arc<SyncService>,
    locks: UserLocks,
    limits: Limits,
}

impl PageService {
    pub fn new(
        repository: Arc<dyn Repository>,
        sync: Arc<SyncService>,
        locks: UserLocks,
        limits: Limits,
    ) -> Self {
        Self {
            repository,
            sync,
            locks,
            limits,
        }
    }

    /// Subscribe the user to a Notion page and load its cards
    ///
    /// Nothing is persisted when the page is a duplicate, the cap is reached
    /// or the content source cannot be read.
    pub fn add_page(&self, user_id: Uuid, link: &str) -> Result<AddPageOutcome> {
        let external_id = parse_page_reference(link)?;

        self.locks.with_user(user_id, || {
            let user = self
                .repository
                .get_user(user_id)?
                .ok_or_else(|| Error::not_found(format!("user {}", user_id)))?;

            if self
                .repository
                .get_page_by_external_id(user_id, &external_id)?
                .is_some()
            {
                return Err(Error::limit_exceeded("This page has already been added"));
            }

            let count = self.repository.count_pages(user_id)?;
            if count >= self.limits.max_pages {
                return Err(Error::limit_exceeded(format!(
                    "Page limit reached ({} of {})",
                    count, self.limits.max_pages
                )));
            }

            // The first reload fills in the real title
            let page = Page::new(user_id, external_id.as_str(), UNTITLED);
            self.repository.insert_page(&page)?;

            match self.sync.reload_locked(&user, &page, Utc::now()) {
                Ok(reload) => {
                    let page = self.repository.get_page(page.id)?.unwrap_or(page);
                    Ok(AddPageOutcome { page, reload })
                }
                Err(e) => {
                    tracing::warn!(page_id = %page.id, "first reload failed, removing page: {}", e);
                    self.repository.delete_page(page.id)?;
                    Err(e)
                }
            }
        })
    }

    /// Unsubscribe from a page, deleting its cards
    pub fn delete_page(&self, user_id: Uuid, page_id: Uuid) -> Result<Page> {
        self.locks.with_user(user_id, || {
            let user = self
                .repository
                .get_user(user_id)?
                .ok_or_else(|| Error::not_found(format!("user {}", user_id)))?;
            let page = self.owned_page(user_id, page_id)?;

            let card_ids: Vec<Uuid> = self
                .repository
                .get_flashcards_by_page(page.id)?
                .into_iter()
                .map(|c| c.id)
                .collect();

            self.repository.delete_page(page.id)?;

            let remaining: Vec<Uuid> = user
                .active_cards
                .iter()
                .copied()
                .filter(|id| !card_ids.contains(id))
                .collect();
            if remaining.len() != user.active_cards.len() {
                self.repository.set_active_cards(user_id, &remaining)?;
            }

            Ok(page)
        })
    }

    /// List the user's pages, most recently reloaded first
    pub fn list_pages(&self, user_id: Uuid, page_number: usize, per_page: usize) -> Result<PageList> {
        if page_number == 0 {
            return Err(Error::validation("Page numbers start at 1"));
        }
        if per_page == 0 {
            return Err(Error::validation("Page size must be at least 1"));
        }

        let total = self.repository.count_pages(user_id)?;
        let pages = self
            .repository
            .list_pages(user_id, (page_number - 1) * per_page, per_page)?;

        Ok(PageList {
            pages,
            page_number,
            per_page,
            total,
        })
    }

    /// Find one of the user's pages by internal id, Notion link or Notion id
    pub fn resolve_page(&self, user_id: Uuid, reference: &str) -> Result<Page> {
        if let Ok(id) = Uuid::parse_str(reference.trim()) {
            if let Ok(page) = self.owned_page(user_id, id) {
                return Ok(page);
            }
        }

        let external_id = parse_page_reference(reference)?;
        self.repository
            .get_page_by_external_id(user_id, &external_id)?
            .ok_or_else(|| Error::not_found(format!("page {}", reference.trim())))
    }

    fn owned_page(&self, user_id: Uuid, page_id: Uuid) -> Result<Page> {
        self.repository
            .get_page(page_id)?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| Error::not_found(format!("page {}", page_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{card_blocks, page_ref, Harness};

    fn service(h: &Harness) -> PageService {
        PageService::new(
            Arc::clone(&h.repository),
            Arc::clone(&h.sync),
            h.locks.clone(),
            h.limits,
        )
    }

    #[test]
    fn test_add_page_loads_cards() {
        let h = Harness::new();
        let user = h.authorized_user(1);
        h.source.set_page(&page_ref(1), "Biology", card_blocks("b", 3));

        let outcome = service(&h).add_page(user.id, &page_ref(1)).unwrap();

        assert_eq!(outcome.page.title, "Biology");
        assert_eq!(outcome.reload.inserted, 3);
        assert!(outcome.page.last_reloaded_at.is_some());
    }

    #[test]
    fn test_add_page_accepts_links() {
        let h = Harness::new();
        let user = h.authorized_user(1);
        let id = page_ref(7);
        h.source.set_page(&id, "Linked", card_blocks("b", 1));

        let link = format!("https://www.notion.so/Linked-{}?pvs=4", id);
        let outcome = service(&h).add_page(user.id, &link).unwrap();
        assert_eq!(outcome.page.external_id, id);
    }

    #[test]
    fn test_duplicate_page_rejected() {
        let h = Harness::new();
        let user = h.authorized_user(1);
        h.source.set_page(&page_ref(1), "Biology", card_blocks("b", 1));
        let pages = service(&h);

        pages.add_page(user.id, &page_ref(1)).unwrap();
        let err = pages.add_page(user.id, &page_ref(1)).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
        assert_eq!(h.repository.count_pages(user.id).unwrap(), 1);
    }

    #[test]
    fn test_unauthorized_user_rejected() {
        let h = Harness::new();
        let user = crate::domain::User::new(5, "NoToken");
        h.repository.insert_user(&user).unwrap();
        h.source.set_page(&page_ref(1), "Biology", card_blocks("b", 1));

        let err = service(&h).add_page(user.id, &page_ref(1)).unwrap_err();
        assert!(matches!(err, Error::SourceUnauthorized(_)));
        assert_eq!(h.repository.count_pages(user.id).unwrap(), 0);
    }

    #[test]
    fn test_source_outage_leaves_no_page() {
        let h = Harness::new();
        let user = h.authorized_user(1);
        h.source.set_page(&page_ref(1), "Biology", card_blocks("b", 1));
        h.source.set_failing(true);

        let err = service(&h).add_page(user.id, &page_ref(1)).unwrap_err();
        assert!(err.is_source_error());
        assert_eq!(h.repository.count_pages(user.id).unwrap(), 0);
    }

    #[test]
    fn test_delete_page_prunes_active_set() {
        let h = Harness::new();
        let user = h.authorized_user(1);
        h.source.set_page(&page_ref(1), "One", card_blocks("a", 2));
        h.source.set_page(&page_ref(2), "Two", card_blocks("b", 2));
        let pages = service(&h);

        let one = pages.add_page(user.id, &page_ref(1)).unwrap().page;
        let two = pages.add_page(user.id, &page_ref(2)).unwrap().page;
        let mut active: Vec<Uuid> = h
            .repository
            .get_flashcards_by_page(one.id)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        let keep = h.repository.get_flashcards_by_page(two.id).unwrap()[0].id;
        active.push(keep);
        h.repository.set_active_cards(user.id, &active).unwrap();

        pages.delete_page(user.id, one.id).unwrap();

        assert_eq!(h.user(user.id).active_cards, vec![keep]);
        assert!(h.repository.get_flashcards_by_page(one.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_other_users_page_not_found() {
        let h = Harness::new();
        let owner = h.authorized_user(1);
        let other = h.authorized_user(2);
        h.source.set_page(&page_ref(1), "One", card_blocks("a", 1));
        let pages = service(&h);
        let page = pages.add_page(owner.id, &page_ref(1)).unwrap().page;

        let err = pages.delete_page(other.id, page.id).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_list_pages_paginates() {
        let h = Harness::new();
        let user = h.authorized_user(1);
        let pages = service(&h);
        for n in 1..=3 {
            h.source.set_page(&page_ref(n), &format!("Page {}", n), vec![]);
            pages.add_page(user.id, &page_ref(n)).unwrap();
        }

        let first = pages.list_pages(user.id, 1, 2).unwrap();
        assert_eq!(first.pages.len(), 2);
        assert_eq!(first.total, 3);
        assert_eq!(first.total_pages(), 2);

        let second = pages.list_pages(user.id, 2, 2).unwrap();
        assert_eq!(second.pages.len(), 1);

        assert!(matches!(pages.list_pages(user.id, 0, 2), Err(Error::Validation(_))));
    }

    #[test]
    fn test_resolve_page_by_id_or_link() {
        let h = Harness::new();
        let user = h.authorized_user(1);
        h.source.set_page(&page_ref(1), "One", vec![]);
        let pages = service(&h);
        let page = pages.add_page(user.id, &page_ref(1)).unwrap().page;

        assert_eq!(pages.resolve_page(user.id, &page.id.to_string()).unwrap().id, page.id);
        assert_eq!(pages.resolve_page(user.id, &page_ref(1)).unwrap().id, page.id);
        assert!(matches!(
            pages.resolve_page(user.id, &page_ref(9)),
            Err(Error::NotFound(_))
        ));
    }
}
