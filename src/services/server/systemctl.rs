use super::{PollPolicy, ServiceController, ServiceState};
use async_trait::async_trait;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Controls a systemd unit through `systemctl`.
pub struct SystemctlController {
    unit: String,
    query_timeout: Duration,
    policy: PollPolicy,
}

impl SystemctlController {
    pub fn new(unit: impl Into<String>, query_timeout: Duration, policy: PollPolicy) -> Self {
        Self {
            unit: unit.into(),
            query_timeout,
            policy,
        }
    }

    async fn systemctl(&self, args: &[&str], timeout: Duration) -> Result<Output, String> {
        let mut cmd = Command::new("systemctl");
        cmd.args(args).arg(&self.unit).kill_on_drop(true);

        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(format!("failed to run systemctl: {e}")),
            Err(_) => Err(format!(
                "systemctl {} timed out after {:?}",
                args.join(" "),
                timeout
            )),
        }
    }

    async fn request(&self, verb: &str) -> Result<(), String> {
        // --no-block: our own polling enforces the deadline
        let output = self
            .systemctl(&[verb, "--no-block"], self.query_timeout)
            .await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(format!("systemctl {verb} exited with {}: {stderr}", output.status))
        }
    }
}

/// Map `systemctl is-active` output to a state.
pub(crate) fn parse_is_active(stdout: &str) -> ServiceState {
    match stdout.trim() {
        "active" | "activating" | "reloading" | "deactivating" | "refreshing" => {
            ServiceState::Running
        }
        "inactive" | "failed" => ServiceState::Stopped,
        _ => ServiceState::Unknown,
    }
}

#[async_trait]
impl ServiceController for SystemctlController {
    fn name(&self) -> &str {
        &self.unit
    }

    fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    async fn state(&self) -> ServiceState {
        // is-active exits non-zero for inactive units, so only stdout matters
        match self.systemctl(&["is-active"], self.query_timeout).await {
            Ok(output) => parse_is_active(&String::from_utf8_lossy(&output.stdout)),
            Err(e) => {
                log::warn!("Status query for '{}' failed: {e}", self.unit);
                ServiceState::Unknown
            }
        }
    }

    async fn request_stop(&self) -> Result<(), String> {
        log::info!("Requesting stop of '{}'", self.unit);
        self.request("stop").await
    }

    async fn request_start(&self) -> Result<(), String> {
        log::info!("Requesting start of '{}'", self.unit);
        self.request("start").await
    }
}
