//! Repository port - persistence abstraction
//!
//! Three logical collections (users, pages, flashcards), each supporting
//! point lookup, filtered find, insert, field-level update and delete by
//! predicate. Implementations must keep `(user_id, external_id)` unique for
//! pages and `(page_id, block_id)` unique for flashcards.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Flashcard, NotionCredential, Page, User};

/// Database repository abstraction
///
/// Methods are blocking; callers are expected to serialize per-user
/// read-modify-write sequences themselves (see `UserLocks`).
pub trait Repository: Send + Sync {
    // === Users ===

    /// Insert a new user
    fn insert_user(&self, user: &User) -> Result<()>;

    /// Get user by internal ID
    fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Get user by chat platform identity
    fn get_user_by_chat_id(&self, chat_id: i64) -> Result<Option<User>>;

    /// Store (or clear) the user's Notion credential
    fn set_credential(&self, user_id: Uuid, credential: Option<&NotionCredential>) -> Result<()>;

    /// Replace the user's active set
    fn set_active_cards(&self, user_id: Uuid, cards: &[Uuid]) -> Result<()>;

    /// Turn study mode on or off
    fn set_study_mode(&self, user_id: Uuid, enabled: bool) -> Result<()>;

    // === Pages ===

    /// Insert a page subscription
    fn insert_page(&self, page: &Page) -> Result<()>;

    /// Get page by internal ID
    fn get_page(&self, id: Uuid) -> Result<Option<Page>>;

    /// Get a user's page by Notion page ID
    fn get_page_by_external_id(&self, user_id: Uuid, external_id: &str) -> Result<Option<Page>>;

    /// List a user's pages, most recently reloaded first
    fn list_pages(&self, user_id: Uuid, offset: usize, limit: usize) -> Result<Vec<Page>>;

    /// Number of pages owned by a user
    fn count_pages(&self, user_id: Uuid) -> Result<usize>;

    /// Pages never reloaded or last reloaded before the cutoff
    fn get_stale_pages(&self, cutoff: DateTime<Utc>) -> Result<Vec<Page>>;

    /// Record a completed reload
    fn set_page_reloaded(&self, page_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Update the display title
    fn set_page_title(&self, page_id: Uuid, title: &str) -> Result<()>;

    /// Delete a page and all of its flashcards
    fn delete_page(&self, page_id: Uuid) -> Result<()>;

    // === Flashcards ===

    /// Get flashcard by internal ID
    fn get_flashcard(&self, id: Uuid) -> Result<Option<Flashcard>>;

    /// All flashcards parsed from one page
    fn get_flashcards_by_page(&self, page_id: Uuid) -> Result<Vec<Flashcard>>;

    /// Flashcards with the given IDs that belong to the user
    fn get_user_flashcards_by_ids(&self, user_id: Uuid, ids: &[Uuid]) -> Result<Vec<Flashcard>>;

    /// Under-threshold flashcards of a user, excluding `exclude`, oldest first
    fn get_eligible_flashcards(
        &self,
        user_id: Uuid,
        threshold: f64,
        exclude: &[Uuid],
        limit: usize,
    ) -> Result<Vec<Flashcard>>;

    /// Insert new flashcards
    fn insert_flashcards(&self, cards: &[Flashcard]) -> Result<()>;

    /// Overwrite front, back and edited_at; mastery is left untouched
    fn update_flashcard_content(&self, card: &Flashcard) -> Result<()>;

    /// Set the mastery coefficient of one card
    fn set_mastery(&self, card_id: Uuid, mastery: f64) -> Result<()>;

    /// Delete flashcards by ID
    fn delete_flashcards(&self, ids: &[Uuid]) -> Result<()>;

    // === Stats ===

    /// (total, graduated) flashcard counts for a user
    fn count_flashcards(&self, user_id: Uuid, threshold: f64) -> Result<(usize, usize)>;
}
