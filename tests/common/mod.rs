#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tempfile::TempDir;
use worldkeeper_lib::commands::{self, AppState};
use worldkeeper_lib::services::config::AppConfig;
use worldkeeper_lib::services::server::{PollPolicy, ServiceController, ServiceState};
use worldkeeper_lib::services::world::{SwapOrchestrator, SwapSettings, WorldStore};

static INIT: Once = Once::new();

pub const BOUNDARY: &str = "worldkeeper-test-boundary";

pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// In-memory service that obeys every request immediately.
pub struct ScriptedService {
    state: Mutex<ServiceState>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedService {
    pub fn new(state: ServiceState) -> Self {
        Self {
            state: Mutex::new(state),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn current(&self) -> ServiceState {
        *self.state.lock().unwrap()
    }
}

#[async_trait]
impl ServiceController for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            deadline: Duration::from_millis(200),
            interval: Duration::from_millis(5),
        }
    }

    async fn state(&self) -> ServiceState {
        self.current()
    }

    async fn request_stop(&self) -> Result<(), String> {
        self.calls.lock().unwrap().push("stop");
        *self.state.lock().unwrap() = ServiceState::Stopped;
        Ok(())
    }

    async fn request_start(&self) -> Result<(), String> {
        self.calls.lock().unwrap().push("start");
        *self.state.lock().unwrap() = ServiceState::Running;
        Ok(())
    }
}

pub struct TestContext {
    pub tmp: TempDir,
    pub service: Arc<ScriptedService>,
    pub state: AppState,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_upload_limit(4 * 1024 * 1024)
    }

    pub fn with_upload_limit(limit: u64) -> Self {
        init_logger();
        let tmp = TempDir::new().unwrap();
        let config = AppConfig {
            world_path: tmp.path().join("server").join("world"),
            backup_dir: tmp.path().join("backups"),
            temp_path: tmp.path().join("imports"),
            max_upload_bytes: limit,
            ..AppConfig::default()
        };
        config.validate().unwrap();

        let store = WorldStore::new(&config.world_path, &config.backup_dir, &config.temp_path);
        store.ensure_dirs().unwrap();

        let service = Arc::new(ScriptedService::new(ServiceState::Running));
        let controller: Arc<dyn ServiceController> = service.clone();
        let orchestrator = Arc::new(SwapOrchestrator::new(
            store,
            controller,
            SwapSettings::default(),
        ));

        Self {
            tmp,
            service,
            state: AppState {
                orchestrator,
                config: Arc::new(config),
            },
        }
    }

    pub fn router(&self) -> axum::Router {
        commands::router(self.state.clone())
    }

    pub fn world(&self) -> PathBuf {
        self.state.config.world_path.clone()
    }

    pub fn backups(&self) -> PathBuf {
        self.state.config.backup_dir.clone()
    }

    pub fn temp(&self) -> PathBuf {
        self.state.config.temp_path.clone()
    }
}

pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    fs::create_dir_all(root).unwrap();
    for (rel, contents) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

pub fn read(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap()
}

pub fn entry_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

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

/// A `multipart/form-data` body with a single file part.
pub fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/x-tar\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/world/import")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, file_name, data)))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
