//! World lock for operations that read or mutate the world directory.
//!
//! Imports, exports and server start/stop all hold this lock so an export
//! never archives a tree that an import is renaming underneath it.
//! Imports queue for the lock; everything else fails fast with `WorldBusy`.

use crate::types::errors::WorldError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Grace period before a fail-fast acquisition gives up.
const BUSY_GRACE: Duration = Duration::from_millis(50);

/// Single mutual-exclusion lock scoped to the world directory.
/// Acquired by the orchestrator so callers can't forget it.
pub struct OperationLock {
    lock: Arc<Mutex<()>>,
}

impl OperationLock {
    pub fn new() -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
        }
    }
}

impl Default for OperationLock {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationLock {
    /// Wait until the lock is free. Queued waiters are served in FIFO order.
    ///
    /// Dropping the returned future before it resolves abandons the wait
    /// without side effects.
    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        self.lock.clone().lock_owned().await
    }

    /// Try to acquire the lock within a short grace period.
    /// Returns `WorldBusy` if another operation is in progress.
    pub async fn acquire_or_busy(&self) -> Result<OwnedMutexGuard<()>, WorldError> {
        match tokio::time::timeout(BUSY_GRACE, self.lock.clone().lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => Err(WorldError::WorldBusy(
                "Another world operation is in progress. Please retry.".to_string(),
            )),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

#[cfg(test)]
#[path = "tests/operation_lock_tests.rs"]
mod tests;
