//! Flashline Core - Notion-sourced flashcards and active-recall study
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (User, Page, Flashcard, Block, Grade)
//! - **ports**: Trait definitions for external dependencies (Repository, ContentSource)
//! - **services**: Parsing, reconciliation, scheduling, sessions, pages
//! - **adapters**: Concrete implementations (DuckDB, Notion, demo content)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::demo::DemoContentSource;
use adapters::duckdb::DuckDbRepository;
use adapters::notion::{NotionContentSource, NotionOAuth};
use config::Config;
use ports::{ContentSource, Repository};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{Block, Flashcard, Grade, NotionCredential, Page, User};

/// Main context for Flashline operations
///
/// Holds the repository, configuration and every service. All services
/// share one repository and one per-user lock registry.
pub struct FlashlineContext {
    pub config: Config,
    pub repository: Arc<dyn Repository>,
    pub session_service: SessionService,
    pub page_service: PageService,
    pub sync_service: Arc<SyncService>,
    pub study_service: StudyService,
    pub status_service: StatusService,
    pub oauth: NotionOAuth,
}

impl FlashlineContext {
    /// Open the flashline directory with the content source chosen by the
    /// configuration (demo pages in demo mode, Notion otherwise)
    pub fn new(flashline_dir: &Path) -> Result<Self> {
        let config = Config::load(flashline_dir)?;
        let source: Arc<dyn ContentSource> = if config.demo_mode {
            Arc::new(DemoContentSource::new())
        } else {
            Arc::new(NotionContentSource::new(config.notion.clone()))
        };
        Self::with_source(flashline_dir, config, source)
    }

    /// Open with an explicit content source
    pub fn with_source(
        flashline_dir: &Path,
        config: Config,
        source: Arc<dyn ContentSource>,
    ) -> Result<Self> {
        std::fs::create_dir_all(flashline_dir)?;

        let db_filename = if config.demo_mode {
            "demo.duckdb"
        } else {
            "flashline.duckdb"
        };
        let repo = DuckDbRepository::new(&flashline_dir.join(db_filename))?;
        repo.ensure_schema()?;
        let repository: Arc<dyn Repository> = Arc::new(repo);

        let locks = UserLocks::new();
        let limits = config.limits;

        let sync_service = Arc::new(SyncService::new(
            Arc::clone(&repository),
            source,
            ContentParser::new(config.marker.clone()),
            locks.clone(),
            config.refresh_interval(),
            config.demo_mode,
        ));
        let session_service = SessionService::new(Arc::clone(&repository), locks.clone());
        let page_service = PageService::new(
            Arc::clone(&repository),
            Arc::clone(&sync_service),
            locks.clone(),
            limits,
        );
        let study_service = StudyService::new(Arc::clone(&repository), locks, limits);
        let status_service = StatusService::new(Arc::clone(&repository), limits);
        let oauth = NotionOAuth::new(config.notion.clone());

        Ok(Self {
            config,
            repository,
            session_service,
            page_service,
            sync_service,
            study_service,
            status_service,
            oauth,
        })
    }
}
