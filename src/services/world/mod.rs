//! The active world directory and the swap pipeline that replaces it.

pub mod backup;
pub mod marker;
pub mod orchestrator;
pub mod staging;
pub mod store;

pub use backup::BackupEntry;
pub use orchestrator::{ExportedWorld, ImportOutcome, SwapOrchestrator, SwapPhase, SwapSettings};
pub use store::WorldStore;

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod store_tests;

#[cfg(test)]
#[path = "tests/backup_tests.rs"]
mod backup_tests;

#[cfg(test)]
#[path = "tests/marker_tests.rs"]
mod marker_tests;

#[cfg(test)]
#[path = "tests/staging_tests.rs"]
mod staging_tests;
