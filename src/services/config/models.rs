use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WORLD_PATH: &str = "/home/ubuntu/Minecraft/world";
pub const DEFAULT_BACKUP_DIR: &str = "/home/ubuntu/minecraft-backups";
pub const DEFAULT_TEMP_PATH: &str = "/tmp/minecraft-imports";
/// 500 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;
pub const DEFAULT_SERVICE_NAME: &str = "minecraft-server";
pub const DEFAULT_PORT: u16 = 3001;

/// Runtime settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub world_path: PathBuf,
    pub backup_dir: PathBuf,
    pub temp_path: PathBuf,
    pub max_upload_bytes: u64,
    pub service_name: String,
    /// Deadline for a stop or start to be observed.
    pub service_timeout: Duration,
    /// Bound on a single status query.
    pub service_query_timeout: Duration,
    pub service_start_retries: u32,
    pub world_marker: String,
    pub bind_addr: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            world_path: PathBuf::from(DEFAULT_WORLD_PATH),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            temp_path: PathBuf::from(DEFAULT_TEMP_PATH),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_timeout: Duration::from_secs(30),
            service_query_timeout: Duration::from_secs(5),
            service_start_retries: 0,
            world_marker: "level.dat".to_string(),
            bind_addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
