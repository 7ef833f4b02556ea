//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod block;
mod flashcard;
mod grade;
pub mod page;
pub mod result;
mod user;

pub use block::{Block, BlockKind, RichText};
pub use flashcard::{Flashcard, FlashcardCandidate};
pub use grade::Grade;
pub use page::{parse_page_reference, Page, UNTITLED};
pub use user::{NotionCredential, User};
