//! Test doubles shared by the service unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::config::{Limits, DEFAULT_MARKER};
use crate::domain::result::{Error, Result};
use crate::domain::{Block, NotionCredential, User};
use crate::ports::{ContentSource, Repository};
use crate::services::{ContentParser, SyncService, UserLocks};

/// In-memory content source whose pages can be edited between reloads
#[derive(Default)]
pub struct FakeSource {
    pages: Mutex<HashMap<String, (String, Vec<Block>)>>,
    failing: AtomicBool,
}

impl FakeSource {
    pub fn set_page(&self, external_id: &str, title: &str, blocks: Vec<Block>) {
        self.pages
            .lock()
            .unwrap()
            .insert(external_id.to_string(), (title.to_string(), blocks));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::SourceUnavailable("fake outage".to_string()));
        }
        Ok(())
    }
}

impl ContentSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn fetch_blocks(&self, _credential: &NotionCredential, page_id: &str) -> Result<Vec<Block>> {
        self.check()?;
        self.pages
            .lock()
            .unwrap()
            .get(page_id)
            .map(|(_, blocks)| blocks.clone())
            .ok_or_else(|| Error::not_found(page_id.to_string()))
    }

    fn fetch_title(&self, _credential: &NotionCredential, page_id: &str) -> Result<String> {
        self.check()?;
        self.pages
            .lock()
            .unwrap()
            .get(page_id)
            .map(|(title, _)| title.clone())
            .ok_or_else(|| Error::not_found(page_id.to_string()))
    }
}

pub struct Harness {
    pub repository: Arc<dyn Repository>,
    pub source: Arc<FakeSource>,
    pub locks: UserLocks,
    pub limits: Limits,
    pub sync: Arc<SyncService>,
}

impl Harness {
    pub fn new() -> Self {
        let repo = DuckDbRepository::in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let repository: Arc<dyn Repository> = Arc::new(repo);
        let source = Arc::new(FakeSource::default());
        let locks = UserLocks::new();
        let sync = Arc::new(SyncService::new(
            Arc::clone(&repository),
            source.clone(),
            ContentParser::new(DEFAULT_MARKER),
            locks.clone(),
            chrono::Duration::hours(3),
            false,
        ));

        Self {
            repository,
            source,
            locks,
            limits: Limits::default(),
            sync,
        }
    }

    /// Registered user holding a token
    pub fn authorized_user(&self, chat_id: i64) -> User {
        let mut user = User::new(chat_id, "Tester");
        user.credential = Some(NotionCredential::from_token("secret_test"));
        self.repository.insert_user(&user).unwrap();
        user
    }

    pub fn user(&self, id: Uuid) -> User {
        self.repository.get_user(id).unwrap().unwrap()
    }
}

/// 32-hex page id derived from a small number
pub fn page_ref(n: u32) -> String {
    format!("{:032x}", n)
}

pub fn card_blocks(prefix: &str, count: usize) -> Vec<Block> {
    (0..count)
        .map(|i| Block::bulleted(format!("{}-{}", prefix, i), format!("🧩 Q{}::A{}", i, i)))
        .collect()
}
