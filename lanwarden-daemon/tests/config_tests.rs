//! Configuration tests from the daemon's point of view.
//!
//! File -> environment -> CLI precedence and the shipped example file.

use std::io::Write;

use clap::Parser;
use serial_test::serial;

use lanwarden_core::config::LanwardenConfig;
use lanwarden_daemon::cli::DaemonCli;

fn example_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("lanwarden.toml.example")
}

#[test]
fn test_example_config_is_valid() {
    // Given: The example config shipped with the repository
    let text = std::fs::read_to_string(example_path()).expect("example config");

    // When: Parsing and validating
    let config = LanwardenConfig::parse(&text).expect("example should parse");

    // Then: It validates and carries the documented defaults
    config.validate().expect("example should validate");
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.model.format, "tree");
    assert!(!config.metrics.enabled);
}

#[test]
fn test_default_config_survives_toml_roundtrip() {
    let config = LanwardenConfig::default();
    let text = toml::to_string(&config).expect("serialize");
    let parsed = LanwardenConfig::parse(&text).expect("re-parse");

    assert_eq!(parsed.capture.max_packets, config.capture.max_packets);
    assert_eq!(parsed.storage.database_path, config.storage.database_path);
    assert_eq!(parsed.alerts.channel_capacity, config.alerts.channel_capacity);
}

#[tokio::test]
#[serial]
async fn test_cli_overrides_beat_environment() {
    // Given: A file, an environment override and a CLI flag on the same key
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[general]\nlog_level = \"warn\"").unwrap();

    // SAFETY: serial test; no other test reads the environment concurrently.
    unsafe { std::env::set_var("LANWARDEN_GENERAL_LOG_LEVEL", "debug") };
    let loaded = LanwardenConfig::load(file.path()).await;
    unsafe { std::env::remove_var("LANWARDEN_GENERAL_LOG_LEVEL") };
    let mut config = loaded.unwrap();
    assert_eq!(config.general.log_level, "debug");

    // When: Applying CLI flags
    let cli = DaemonCli::parse_from(["lanwarden-daemon", "--log-level", "trace"]);
    cli.apply_overrides(&mut config);

    // Then: The CLI value wins
    assert_eq!(config.general.log_level, "trace");
    config.validate().unwrap();
}

#[tokio::test]
#[serial]
async fn test_invalid_environment_value_fails_validation() {
    let file = tempfile::NamedTempFile::new().unwrap();

    // SAFETY: serial test; no other test reads the environment concurrently.
    unsafe { std::env::set_var("LANWARDEN_SERVER_PORT", "0") };
    let result = LanwardenConfig::load(file.path()).await;
    unsafe { std::env::remove_var("LANWARDEN_SERVER_PORT") };

    let err = result.expect_err("port 0 with the API enabled is rejected");
    assert!(err.to_string().contains("server.port"), "got: {err}");
}
