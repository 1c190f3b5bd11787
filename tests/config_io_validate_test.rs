use chargebridge::config::{Config, MIN_RECONNECT_INTERVAL};
use std::fs;
use std::time::Duration;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.charger.ip_address = "10.0.0.5".to_string();
    cfg.charger.reconnect_interval_ms = 300_000;
    cfg.logging.file = Some(tmp_dir.path().join("logs").to_string_lossy().to_string());

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.charger, cfg.charger);
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn settings_ui_keys_are_accepted() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        b"charger:\n  ipAddress: 192.168.1.40\n  port: 503\n  unitId: 2\n  reconnectInterval: 0\n",
    )
    .unwrap();

    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.charger.ip_address, "192.168.1.40");
    assert_eq!(cfg.charger.port, 503);
    assert_eq!(cfg.charger.unit_id, 2);
    assert_eq!(cfg.charger.reconnect_interval_ms, 0);
    assert_eq!(cfg.charger.reconnect_interval(), MIN_RECONNECT_INTERVAL);
    assert_eq!(cfg.registers.max_charging_power, 8192);
    assert!(cfg.validate().is_ok());
}

#[test]
fn reconnect_interval_is_kept_above_the_floor() {
    let mut cfg = Config::default();
    cfg.charger.reconnect_interval_ms = 300_000;
    assert_eq!(cfg.charger.reconnect_interval(), Duration::from_secs(300));
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();
    cfg.charger.ip_address = "10.0.0.5".to_string();
    assert!(cfg.validate().is_ok());

    // Missing host
    let mut bad = cfg.clone();
    bad.charger.ip_address = "  ".to_string();
    assert!(bad.validate().is_err());

    // Invalid port
    bad = cfg.clone();
    bad.charger.port = 0;
    assert!(bad.validate().is_err());

    // Both commands on one register
    bad = cfg.clone();
    bad.registers.charging_control = bad.registers.max_charging_power;
    assert!(bad.validate().is_err());

    // Unknown log level
    bad = cfg.clone();
    bad.logging.level = "LOUD".to_string();
    assert!(bad.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn from_missing_file_is_an_io_error() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(tmp_dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{}", err).contains("I/O error"));
}
