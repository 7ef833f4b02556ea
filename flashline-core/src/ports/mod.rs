//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod content_source;
mod repository;

pub use content_source::{AuthorizationProvider, ContentSource};
pub use repository::Repository;
