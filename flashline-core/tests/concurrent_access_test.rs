//! Concurrent access tests
//!
//! Several threads drive the same context at once, the way a chat bot
//! serving many updates would. Per-user operations must not lose updates.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;

use flashline_core::config::Config;
use flashline_core::domain::result::Result;
use flashline_core::domain::{Block, NotionCredential};
use flashline_core::ports::ContentSource;
use flashline_core::{FlashlineContext, Grade};

/// Number of concurrent threads
const THREAD_COUNT: usize = 6;

/// Serves the same page for every id
struct StaticSource {
    blocks: Vec<Block>,
}

impl ContentSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch_blocks(&self, _credential: &NotionCredential, _page_id: &str) -> Result<Vec<Block>> {
        Ok(self.blocks.clone())
    }

    fn fetch_title(&self, _credential: &NotionCredential, _page_id: &str) -> Result<String> {
        Ok("Static".to_string())
    }
}

fn context(dir: &TempDir, cards: usize) -> Arc<FlashlineContext> {
    let blocks = (0..cards)
        .map(|i| Block::bulleted(format!("b{}", i), format!("🧩 Q{}::A{}", i, i)))
        .collect();
    let ctx = FlashlineContext::with_source(
        dir.path(),
        Config::default(),
        Arc::new(StaticSource { blocks }),
    )
    .unwrap();
    Arc::new(ctx)
}

/// Test: concurrent first contact from the same chat registers one user
#[test]
fn test_concurrent_registration_yields_one_user() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, 0);
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ctx.session_service.get_or_register(77, "Ada").unwrap().id
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.iter().all(|id| *id == ids[0]));
}

/// Test: answers recorded concurrently for one card are all applied
#[test]
fn test_concurrent_answers_are_not_lost() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, 1);

    let user = ctx.session_service.get_or_register(1, "Ada").unwrap();
    ctx.session_service
        .set_credential(user.id, NotionCredential::from_token("secret_1"))
        .unwrap();
    ctx.page_service
        .add_page(user.id, "00000000000000000000000000000001")
        .unwrap();
    let card = ctx.study_service.next_card(user.id).unwrap().unwrap();

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ctx.study_service
                    .record_answer(user.id, card.id, Grade::Yes)
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = ctx.repository.get_flashcard(card.id).unwrap().unwrap();
    assert_eq!(stored.mastery, 0.5 * THREAD_COUNT as f64);
    assert!(ctx.repository.get_user(user.id).unwrap().unwrap().active_cards.is_empty());
}

/// Test: the page cap holds when many adds race for the last slots
#[test]
fn test_concurrent_adds_respect_page_cap() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, 2);
    let user = ctx.session_service.get_or_register(1, "Ada").unwrap();
    ctx.session_service
        .set_credential(user.id, NotionCredential::from_token("secret_1"))
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREAD_COUNT * 2));
    let added = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREAD_COUNT * 2)
        .map(|n| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            let added = Arc::clone(&added);
            thread::spawn(move || {
                barrier.wait();
                if ctx
                    .page_service
                    .add_page(user.id, &format!("{:032x}", n + 1))
                    .is_ok()
                {
                    added.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let max_pages = ctx.config.limits.max_pages;
    assert_eq!(added.load(Ordering::SeqCst), max_pages);
    assert_eq!(ctx.repository.count_pages(user.id).unwrap(), max_pages);
}

/// Test: study on one user and reloads on another proceed independently
#[test]
fn test_users_do_not_interfere() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, 3);

    let users: Vec<_> = (0..THREAD_COUNT as i64)
        .map(|chat| {
            let user = ctx.session_service.get_or_register(chat, "U").unwrap();
            ctx.session_service
                .set_credential(user.id, NotionCredential::from_token("secret_x"))
                .unwrap();
            ctx.page_service
                .add_page(user.id, "00000000000000000000000000000001")
                .unwrap();
            user
        })
        .collect();

    let barrier = Arc::new(Barrier::new(users.len()));
    let handles: Vec<_> = users
        .iter()
        .map(|user| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            let user_id = user.id;
            thread::spawn(move || {
                barrier.wait();
                ctx.study_service.start_study(user_id).unwrap();
                let mut answers = 0;
                while let Some(card) = ctx.study_service.next_card(user_id).unwrap() {
                    ctx.study_service
                        .record_answer(user_id, card.id, Grade::Yes)
                        .unwrap();
                    answers += 1;
                }
                answers
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 9);
    }
}
