use std::io::Write;

use super::models::AppConfig;

#[test]
fn test_default_config() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());

    assert_eq!(config.dispatch.chunk_size, 5);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.status.poll_interval_seconds, 5);
    assert_eq!(config.media.max_media_bytes, 16 * 1024 * 1024);
}

#[test]
fn test_config_from_partial_toml() {
    let toml_content = r#"
[channel]
base_url = "https://wa.example.com/api"
request_timeout_seconds = 10
send_timeout_seconds = 120

[dispatch]
chunk_size = 2
inter_chunk_delay_ms = 500
failure_cooldown_ms = 2000
"#;

    let config = AppConfig::from_toml(toml_content).unwrap();
    assert_eq!(config.channel.base_url, "https://wa.example.com/api");
    assert_eq!(config.dispatch.chunk_size, 2);
    // Sections left out fall back to defaults
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.observability.log_level, "info");
}

#[test]
fn test_invalid_chunk_size_rejected() {
    let toml_content = r#"
[dispatch]
chunk_size = 0
inter_chunk_delay_ms = 0
failure_cooldown_ms = 0
"#;

    let result = AppConfig::from_toml(toml_content);
    assert!(result.is_err());
}

#[test]
fn test_invalid_retry_window_rejected() {
    let mut config = AppConfig::default();
    config.retry.base_delay_ms = 10_000;
    config.retry.max_delay_ms = 1_000;
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_base_url_rejected() {
    let mut config = AppConfig::default();
    config.channel.base_url = "ftp://example.com".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_toml_roundtrip_preserves_values() {
    let mut config = AppConfig::default();
    config.dispatch.chunk_size = 7;

    let serialized = config.to_toml().unwrap();
    let parsed = AppConfig::from_toml(&serialized).unwrap();
    assert_eq!(parsed.dispatch.chunk_size, 7);
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[retry]
max_attempts = 4
base_delay_ms = 100
max_delay_ms = 1000
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let config = AppConfig::load(Some(&path)).unwrap();
    assert_eq!(config.retry.max_attempts, 4);
    assert_eq!(config.retry.max_delay_ms, 1000);
}

#[test]
fn test_load_missing_file_fails() {
    let result = AppConfig::load(Some("/nonexistent/bulk-sender.toml"));
    assert!(result.is_err());
}
