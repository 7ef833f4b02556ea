//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notion access granted to a user
///
/// Either the result of the OAuth code exchange or an internal
/// integration token entered by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionCredential {
    pub access_token: String,
    pub workspace_id: Option<String>,
    pub workspace_name: Option<String>,
    pub workspace_icon: Option<String>,
    pub bot_id: Option<String>,
}

impl NotionCredential {
    /// Credential carrying only a token (internal integrations)
    pub fn from_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            workspace_id: None,
            workspace_name: None,
            workspace_icon: None,
            bot_id: None,
        }
    }
}

/// A person talking to the bot, identified by their chat account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Chat platform identity (unique)
    pub chat_id: i64,
    pub first_name: String,
    pub credential: Option<NotionCredential>,
    /// Flashcards currently under review, in admission order
    pub active_cards: Vec<Uuid>,
    pub study_mode: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(chat_id: i64, first_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            chat_id,
            first_name: first_name.into(),
            credential: None,
            active_cards: Vec::new(),
            study_mode: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// True once a non-empty Notion token is stored
    pub fn is_authorized(&self) -> bool {
        self.credential
            .as_ref()
            .map(|c| !c.access_token.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn is_active(&self, card_id: Uuid) -> bool {
        self.active_cards.contains(&card_id)
    }
}
