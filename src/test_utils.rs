use crate::commands::AppState;
use crate::services::config::AppConfig;
use crate::services::server::{PollPolicy, ServiceController, ServiceState};
use crate::services::world::{SwapOrchestrator, SwapSettings, WorldStore};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Write `(relative path, contents)` pairs under `root`, creating parents.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    fs::create_dir_all(root).unwrap();
    for (rel, contents) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

/// A finished tar containing the given files.
pub fn tar_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap()
}

/// One unterminated tar entry with `name` written verbatim into the header,
/// bypassing the builder's path validation.
pub fn raw_tar_entry(name: &str, data: &[u8]) -> Vec<u8> {
    let mut header = tar::Header::new_old();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_entry_type(tar::EntryType::Regular);
    header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
    header.set_cksum();

    let mut out = header.as_bytes().to_vec();
    out.extend_from_slice(data);
    let pad = (512 - data.len() % 512) % 512;
    out.resize(out.len() + pad, 0);
    out
}

/// Scriptable in-memory service for orchestrator tests.
pub struct FakeServiceController {
    state: Mutex<ServiceState>,
    calls: Mutex<Vec<&'static str>>,
    fail_stop: AtomicBool,
    ignore_stop: AtomicBool,
    fail_start: AtomicBool,
    ignore_start: AtomicBool,
    request_delay: Mutex<Duration>,
}

impl FakeServiceController {
    fn with_state(state: ServiceState) -> Self {
        Self {
            state: Mutex::new(state),
            calls: Mutex::new(Vec::new()),
            fail_stop: AtomicBool::new(false),
            ignore_stop: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            ignore_start: AtomicBool::new(false),
            request_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn running() -> Self {
        Self::with_state(ServiceState::Running)
    }

    pub fn stopped() -> Self {
        Self::with_state(ServiceState::Stopped)
    }

    pub fn unknown() -> Self {
        Self::with_state(ServiceState::Unknown)
    }

    pub fn fail_stop_requests(&self) {
        self.fail_stop.store(true, Ordering::SeqCst);
    }

    /// Accept stop requests but never actually stop.
    pub fn ignore_stop_requests(&self) {
        self.ignore_stop.store(true, Ordering::SeqCst);
    }

    pub fn fail_start_requests(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    /// Accept start requests but never actually start.
    pub fn ignore_start_requests(&self) {
        self.ignore_start.store(true, Ordering::SeqCst);
    }

    pub fn set_request_delay(&self, delay: Duration) {
        *self.request_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn current(&self) -> ServiceState {
        *self.state.lock().unwrap()
    }

    async fn handle(
        &self,
        call: &'static str,
        fail: &AtomicBool,
        ignore: &AtomicBool,
        to: ServiceState,
    ) -> Result<(), String> {
        self.calls.lock().unwrap().push(call);
        let delay = *self.request_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail.load(Ordering::SeqCst) {
            return Err(format!("{call} refused"));
        }
        if !ignore.load(Ordering::SeqCst) {
            *self.state.lock().unwrap() = to;
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceController for FakeServiceController {
    fn name(&self) -> &str {
        "fake-server"
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            deadline: Duration::from_millis(100),
            interval: Duration::from_millis(5),
        }
    }

    async fn state(&self) -> ServiceState {
        self.current()
    }

    async fn request_stop(&self) -> Result<(), String> {
        self.handle("stop", &self.fail_stop, &self.ignore_stop, ServiceState::Stopped)
            .await
    }

    async fn request_start(&self) -> Result<(), String> {
        self.handle("start", &self.fail_start, &self.ignore_start, ServiceState::Running)
            .await
    }
}

/// Router state over a fresh `world`/`backups`/`imports` layout in `root`.
pub fn test_state(root: &Path, controller: Arc<FakeServiceController>) -> AppState {
    let config = AppConfig {
        world_path: root.join("server").join("world"),
        backup_dir: root.join("backups"),
        temp_path: root.join("imports"),
        max_upload_bytes: 1024 * 1024,
        ..AppConfig::default()
    };
    let store = WorldStore::new(&config.world_path, &config.backup_dir, &config.temp_path);
    let controller: Arc<dyn ServiceController> = controller;
    AppState {
        orchestrator: Arc::new(SwapOrchestrator::new(
            store,
            controller,
            SwapSettings::default(),
        )),
        config: Arc::new(config),
    }
}
