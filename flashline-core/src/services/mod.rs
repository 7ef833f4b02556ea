//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod locks;
pub mod logging;
pub mod migration;
mod pages;
pub mod parser;
pub mod reconcile;
mod session;
mod status;
mod study;
mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use locks::UserLocks;
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{Migration, MigrationResult, MigrationService};
pub use pages::{AddPageOutcome, PageList, PageService};
pub use parser::{ContentParser, ParseOutput, ParseWarning};
pub use reconcile::{reconcile, ReconcilePlan};
pub use session::SessionService;
pub use status::{StatusService, StatusSummary};
pub use study::{AnswerOutcome, BinaryGrading, GradingPolicy, StudyService};
pub use sync::{RefreshFailure, RefreshSummary, ReloadOutcome, SyncService};
