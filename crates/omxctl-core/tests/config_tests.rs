use omxctl_core::{ControlError, ControllerConfig, Destination};
use std::io::Write;
use std::time::Duration;

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
layer = 2
progress_interval_ms = 250

[confirm]
interval_ms = 20
max_attempts = 50

[retry]
adjust_attempts = 6
delay_ms = 5

[log]
level = "debug"
ansi = false
"#
    )
    .unwrap();

    let config = ControllerConfig::load(file.path()).unwrap();

    assert_eq!(config.layer, Some(2));
    assert_eq!(config.progress_interval(), Duration::from_millis(250));
    assert_eq!(config.confirm.interval(), Duration::from_millis(20));
    assert_eq!(config.confirm.max_attempts, 50);
    assert_eq!(config.retry.adjust_attempts, 6);
    assert_eq!(config.retry.lifecycle_attempts, 3);
    assert_eq!(config.retry.delay(), Duration::from_millis(5));
    // Untouched sections keep their defaults
    assert_eq!(config.cache.position_ttl(), Duration::from_secs(2));
    assert_eq!(config.log.level, "debug");
    assert!(!config.log.ansi);

    assert_eq!(
        Destination::new(config.layer).bus_name(),
        "org.mpris.MediaPlayer2.omxplayer_layer2"
    );
}

#[test]
fn test_load_rejects_zero_confirm_interval() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[confirm]\ninterval_ms = 0").unwrap();

    let result = ControllerConfig::load(file.path());
    assert!(matches!(result, Err(ControlError::Config(_))));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = ControllerConfig::load(dir.path().join("missing.toml"));
    assert!(matches!(result, Err(ControlError::Io(_))));
}

#[test]
fn test_load_malformed_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "layer = \"two\"").unwrap();

    let result = ControllerConfig::load(file.path());
    assert!(matches!(result, Err(ControlError::Toml(_))));
}

#[test]
fn test_config_serializes_to_json() {
    let config = ControllerConfig::default().with_layer(4);
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["layer"], 4);
    assert_eq!(json["confirm"]["max_attempts"], 300);
}
