//! Lifecycle control of the managed game server.
//!
//! [`ServiceController`] is the seam the orchestrator drives. Implementors
//! provide the raw query/stop/start requests; the provided `stop`/`start`
//! methods add idempotency and bounded polling on top.

mod systemctl;

pub use systemctl::SystemctlController;

use crate::types::errors::WorldError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Observed state of the managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Stopped,
    /// The query failed or timed out.
    Unknown,
}

impl ServiceState {
    /// Conservative reading: anything not confirmed stopped may be running.
    pub fn may_be_running(self) -> bool {
        !matches!(self, ServiceState::Stopped)
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
            ServiceState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Operator-requested lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn done_message(self) -> &'static str {
        match self {
            ServiceAction::Start => "Server started",
            ServiceAction::Stop => "Server stopped",
            ServiceAction::Restart => "Server restarted",
        }
    }
}

impl std::fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        };
        f.write_str(s)
    }
}

/// How long `stop`/`start` wait for the state change, and how often they look.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub deadline: Duration,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
            interval: Duration::from_millis(500),
        }
    }
}

#[async_trait]
pub trait ServiceController: Send + Sync {
    /// Identifier of the managed service, for logs and messages.
    fn name(&self) -> &str;

    fn poll_policy(&self) -> PollPolicy;

    /// Point-in-time query. Must return within a short bound; failures map
    /// to [`ServiceState::Unknown`].
    async fn state(&self) -> ServiceState;

    /// Ask the service to stop without waiting for it.
    async fn request_stop(&self) -> Result<(), String>;

    /// Ask the service to start without waiting for it.
    async fn request_start(&self) -> Result<(), String>;

    async fn is_running(&self) -> bool {
        self.state().await == ServiceState::Running
    }

    /// Stop and wait until the service reports stopped.
    /// Succeeds immediately when it already is.
    async fn stop(&self) -> Result<(), WorldError> {
        if self.state().await == ServiceState::Stopped {
            return Ok(());
        }

        self.request_stop()
            .await
            .map_err(|e| WorldError::ServiceStop(format!("{}: {e}", self.name())))?;

        if wait_for_state(self, ServiceState::Stopped).await {
            log::info!("Service '{}' stopped", self.name());
            Ok(())
        } else {
            Err(WorldError::ServiceStop(format!(
                "{} did not stop within {}s",
                self.name(),
                self.poll_policy().deadline.as_secs()
            )))
        }
    }

    /// Start and wait until the service reports running.
    /// Succeeds immediately when it already is.
    async fn start(&self) -> Result<(), WorldError> {
        if self.state().await == ServiceState::Running {
            return Ok(());
        }

        self.request_start()
            .await
            .map_err(|e| WorldError::ServiceStart(format!("{}: {e}", self.name())))?;

        if wait_for_state(self, ServiceState::Running).await {
            log::info!("Service '{}' started", self.name());
            Ok(())
        } else {
            Err(WorldError::ServiceStart(format!(
                "{} did not start within {}s",
                self.name(),
                self.poll_policy().deadline.as_secs()
            )))
        }
    }
}

/// Poll `state()` until it equals `want` or the policy deadline passes.
async fn wait_for_state<C>(controller: &C, want: ServiceState) -> bool
where
    C: ServiceController + ?Sized,
{
    let policy = controller.poll_policy();
    let deadline = Instant::now() + policy.deadline;

    loop {
        let state = controller.state().await;
        if state == want {
            return true;
        }
        if Instant::now() >= deadline {
            log::warn!(
                "Service '{}' still {} after {:?} (wanted {})",
                controller.name(),
                state,
                policy.deadline,
                want
            );
            return false;
        }
        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
