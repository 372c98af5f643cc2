pub mod models;

pub use models::*;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("{0}")]
    Inconsistent(String),
}

impl AppConfig {
    /// Read `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => log::info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("Ignoring unreadable .env file: {e}"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            world_path: get("WORLD_PATH").map(PathBuf::from).unwrap_or(defaults.world_path),
            backup_dir: get("BACKUP_DIR").map(PathBuf::from).unwrap_or(defaults.backup_dir),
            temp_path: get("TEMP_PATH").map(PathBuf::from).unwrap_or(defaults.temp_path),
            max_upload_bytes: parse_or(&get, "MAX_WORLD_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            service_name: get("SERVICE_NAME").unwrap_or(defaults.service_name),
            service_timeout: secs_or(&get, "SERVICE_TIMEOUT_SECS", defaults.service_timeout)?,
            service_query_timeout: secs_or(
                &get,
                "SERVICE_QUERY_TIMEOUT_SECS",
                defaults.service_query_timeout,
            )?,
            service_start_retries: parse_or(
                &get,
                "SERVICE_START_RETRIES",
                defaults.service_start_retries,
            )?,
            world_marker: get("WORLD_MARKER").unwrap_or(defaults.world_marker),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_or(&get, "PORT", defaults.port)?,
        })
    }

    /// Reject settings that would make an import unsafe or impossible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(invalid("MAX_WORLD_UPLOAD_BYTES", "0"));
        }
        if self.service_timeout.is_zero() {
            return Err(invalid("SERVICE_TIMEOUT_SECS", "0"));
        }
        if self.service_query_timeout.is_zero() {
            return Err(invalid("SERVICE_QUERY_TIMEOUT_SECS", "0"));
        }
        if self.service_name.trim().is_empty() {
            return Err(invalid("SERVICE_NAME", &self.service_name));
        }
        if self.world_marker.contains('/') || self.world_marker.contains('\\') {
            return Err(invalid("WORLD_MARKER", &self.world_marker));
        }
        if self.world_path.parent().is_none() {
            return Err(invalid("WORLD_PATH", &self.world_path.to_string_lossy()));
        }

        for (key, area) in [("BACKUP_DIR", &self.backup_dir), ("TEMP_PATH", &self.temp_path)] {
            if overlaps(&self.world_path, area) {
                return Err(ConfigError::Inconsistent(format!(
                    "WORLD_PATH '{}' must not be inside or equal to {key} '{}'",
                    self.world_path.display(),
                    area.display()
                )));
            }
            if area.starts_with(&self.world_path) {
                return Err(ConfigError::Inconsistent(format!(
                    "{key} '{}' must not be inside WORLD_PATH '{}'",
                    area.display(),
                    self.world_path.display()
                )));
            }
        }
        Ok(())
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

fn overlaps(world: &Path, area: &Path) -> bool {
    world == area || world.starts_with(area)
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, &raw)),
        None => Ok(default),
    }
}

fn secs_or<G>(get: &G, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, key, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
