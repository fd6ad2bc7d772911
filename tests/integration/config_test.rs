use std::fs;

use nvchart::CollectorConfig;
use tempfile::TempDir;

#[test]
fn test_config_default() {
    let config = CollectorConfig::default();
    assert!(!config.legacy);
    assert_eq!(config.mem_factor, 1);
}

#[test]
fn test_config_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nv.conf.json");
    fs::write(&path, r#"{ "legacy": true, "nvMemFactor": 2, "update_every": 5 }"#).unwrap();

    let config = CollectorConfig::load(&path).unwrap();
    assert!(config.legacy);
    assert_eq!(config.mem_factor, 2);
}

#[test]
fn test_config_bad_factor_falls_back() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nv.conf.json");
    fs::write(&path, r#"{ "nvMemFactor": "ddr" }"#).unwrap();

    let config = CollectorConfig::load(&path).unwrap();
    assert_eq!(config.mem_factor, 1);
}

#[test]
fn test_config_rejects_non_object() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nv.conf.json");
    fs::write(&path, "[1, 2]").unwrap();

    assert!(CollectorConfig::load(&path).is_err());
}

#[test]
fn test_config_missing_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    assert!(CollectorConfig::load(&temp_dir.path().join("absent.json")).is_err());
}
