//! Session service - chat identities and Notion authorization
//!
//! Users are looked up from the repository on every request; nothing is
//! cached between calls.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{NotionCredential, User};
use crate::ports::{AuthorizationProvider, Repository};
use crate::services::UserLocks;

pub struct SessionService {
    repository: Arc<dyn Repository>,
    locks: UserLocks,
}

impl SessionService {
    pub fn new(repository: Arc<dyn Repository>, locks: UserLocks) -> Self {
        Self { repository, locks }
    }

    /// Return the user behind a chat identity, registering it on first contact
    pub fn get_or_register(&self, chat_id: i64, first_name: &str) -> Result<User> {
        if let Some(user) = self.repository.get_user_by_chat_id(chat_id)? {
            return Ok(user);
        }

        let user = User::new(chat_id, first_name);
        match self.repository.insert_user(&user) {
            Ok(()) => {
                tracing::info!(user_id = %user.id, "registered new user");
                Ok(user)
            }
            // Lost a race against a concurrent registration
            Err(e) => self.repository.get_user_by_chat_id(chat_id)?.ok_or(e),
        }
    }

    pub fn get_user(&self, chat_id: i64) -> Result<User> {
        self.repository
            .get_user_by_chat_id(chat_id)?
            .ok_or_else(|| Error::not_found(format!("chat {}", chat_id)))
    }

    pub fn is_authorized(&self, user_id: Uuid) -> Result<bool> {
        Ok(self
            .repository
            .get_user(user_id)?
            .map(|u| u.is_authorized())
            .unwrap_or(false))
    }

    /// Store a credential directly (internal integration tokens)
    pub fn set_credential(&self, user_id: Uuid, credential: NotionCredential) -> Result<()> {
        if credential.access_token.trim().is_empty() {
            return Err(Error::validation("Access token must not be empty"));
        }
        self.locks.with_user(user_id, || {
            self.repository.set_credential(user_id, Some(&credential))
        })
    }

    pub fn clear_credential(&self, user_id: Uuid) -> Result<()> {
        self.locks
            .with_user(user_id, || self.repository.set_credential(user_id, None))
    }

    /// Authorization URL for the user; the user id travels as OAuth state
    pub fn login_url(&self, user_id: Uuid, provider: &dyn AuthorizationProvider) -> Result<String> {
        provider.authorize_url(&user_id.to_string())
    }

    /// Finish the OAuth flow started by [`login_url`](Self::login_url)
    pub fn complete_authorization(
        &self,
        state: &str,
        code: &str,
        provider: &dyn AuthorizationProvider,
    ) -> Result<User> {
        let user_id = Uuid::parse_str(state.trim())
            .map_err(|_| Error::not_found(format!("authorization state {}", state)))?;
        if self.repository.get_user(user_id)?.is_none() {
            return Err(Error::not_found(format!("user {}", user_id)));
        }

        let credential = provider.exchange_code(code)?;
        self.set_credential(user_id, credential)?;

        self.repository
            .get_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("user {}", user_id)))
    }
}
