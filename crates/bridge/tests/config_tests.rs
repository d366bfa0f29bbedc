//! Integration tests for configuration parsing
//!
//! Tests bridge configuration parsing, including:
//! - Full and partial documents
//! - Defaults for missing sections
//! - Invalid configuration handling
//! - Loading from disk

use std::io::Write;
use tempfile::NamedTempFile;
use usb_runtime::BridgeConfig;

const FULL_CONFIG: &str = r#"
[logging]
level = "trace"

[usb]
interface = 1
detach_kernel_driver = true
"#;

#[test]
fn test_full_config() {
    let config = BridgeConfig::from_toml_str(FULL_CONFIG).expect("Failed to parse config");

    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.usb.interface, 1);
    assert!(config.usb.detach_kernel_driver);
}

#[test]
fn test_missing_sections_use_defaults() {
    let config = BridgeConfig::from_toml_str("[usb]\ninterface = 2\n").expect("Failed to parse");

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.usb.interface, 2);
    assert!(!config.usb.detach_kernel_driver);
}

#[test]
fn test_missing_fields_use_defaults() {
    let config = BridgeConfig::from_toml_str("[logging]\n[usb]\n").expect("Failed to parse");
    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn test_interface_out_of_range() {
    let result = BridgeConfig::from_toml_str("[usb]\ninterface = 300\n");
    assert!(result.is_err());
}

#[test]
fn test_malformed_toml() {
    let result = BridgeConfig::from_toml_str("[usb\ninterface = 0");
    assert!(result.is_err());
}

#[test]
fn test_invalid_level_message_names_level() {
    let err = BridgeConfig::from_toml_str("[logging]\nlevel = \"loud\"\n").unwrap_err();
    assert!(format!("{:#}", err).contains("loud"));
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(FULL_CONFIG.as_bytes())
        .expect("Failed to write config");

    let config = BridgeConfig::load(file.path()).expect("Failed to load config");
    assert_eq!(config.usb.interface, 1);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("absent.toml");

    let err = BridgeConfig::load(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.toml"));
}

#[test]
fn test_roundtrip_through_toml() {
    let config = BridgeConfig::from_toml_str(FULL_CONFIG).unwrap();
    let serialized = toml::to_string(&config).expect("Failed to serialize");

    assert_eq!(BridgeConfig::from_toml_str(&serialized).unwrap(), config);
}
