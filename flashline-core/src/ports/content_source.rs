//! Content source port
//!
//! Defines the interface for fetching page content from an external
//! knowledge base (Notion, built-in demo pages, test doubles).

use crate::domain::result::Result;
use crate::domain::{Block, NotionCredential};

/// Content source trait
///
/// Implementations fetch the blocks of one page. The sync service uses
/// this trait without knowing whether it talks to Notion or to demo data.
///
/// Failures are reported as `Error::SourceUnavailable` (network, 5xx, rate
/// limiting), `Error::SourceUnauthorized` (401/403) or `Error::NotFound`.
pub trait ContentSource: Send + Sync {
    /// Source name (e.g., "notion", "demo")
    fn name(&self) -> &str;

    /// Fetch the top-level blocks of a page, in document order
    fn fetch_blocks(&self, credential: &NotionCredential, page_id: &str) -> Result<Vec<Block>>;

    /// Fetch the display title of a page
    fn fetch_title(&self, credential: &NotionCredential, page_id: &str) -> Result<String>;
}

/// OAuth provider for granting access to a workspace
///
/// Hosting the redirect endpoint is left to the presentation layer; it
/// hands the returned `state` and `code` to the session service.
pub trait AuthorizationProvider: Send + Sync {
    /// URL the user opens to grant access; `state` comes back with the code
    fn authorize_url(&self, state: &str) -> Result<String>;

    /// Exchange an authorization code for a credential
    fn exchange_code(&self, code: &str) -> Result<NotionCredential>;
}
