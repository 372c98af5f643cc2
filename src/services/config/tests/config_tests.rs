use super::*;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults_when_unset() {
    let config = AppConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.max_upload_bytes, 524_288_000);
    assert_eq!(config.listen_addr(), "0.0.0.0:3001");
    assert!(config.validate().is_ok());
}

#[test]
fn test_overrides_are_parsed() {
    let config = AppConfig::from_lookup(lookup(&[
        ("WORLD_PATH", "/srv/mc/world"),
        ("BACKUP_DIR", "/srv/backups"),
        ("TEMP_PATH", "/srv/tmp"),
        ("MAX_WORLD_UPLOAD_BYTES", "1024"),
        ("SERVICE_NAME", "mc"),
        ("SERVICE_TIMEOUT_SECS", "60"),
        ("SERVICE_START_RETRIES", "2"),
        ("PORT", "8080"),
    ]))
    .unwrap();

    assert_eq!(config.world_path, PathBuf::from("/srv/mc/world"));
    assert_eq!(config.max_upload_bytes, 1024);
    assert_eq!(config.service_name, "mc");
    assert_eq!(config.service_timeout, Duration::from_secs(60));
    assert_eq!(config.service_start_retries, 2);
    assert_eq!(config.port, 8080);
    assert!(config.validate().is_ok());
}

#[test]
fn test_blank_value_keeps_default() {
    let config = AppConfig::from_lookup(lookup(&[("SERVICE_NAME", "  ")])).unwrap();
    assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
}

#[test]
fn test_unparsable_number_is_rejected() {
    let err = AppConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Invalid {
            key: "PORT",
            value: "http".to_string()
        }
    );
}

#[test]
fn test_zero_limits_are_rejected() {
    let config = AppConfig::from_lookup(lookup(&[("MAX_WORLD_UPLOAD_BYTES", "0")])).unwrap();
    assert!(config.validate().is_err());

    let config = AppConfig::from_lookup(lookup(&[("SERVICE_TIMEOUT_SECS", "0")])).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_marker_with_separator_is_rejected() {
    let config = AppConfig {
        world_marker: "data/level.dat".to_string(),
        ..AppConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { key: "WORLD_MARKER", .. })
    ));
}

#[test]
fn test_world_inside_scratch_area_is_rejected() {
    let config = AppConfig {
        world_path: PathBuf::from("/tmp/minecraft-imports/world"),
        ..AppConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Inconsistent(_))));

    let config = AppConfig {
        backup_dir: PathBuf::from("/home/ubuntu/Minecraft/world/backups"),
        ..AppConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Inconsistent(_))));
}
