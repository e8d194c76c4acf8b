//! Tests for the 'validate' command
//!
//! The validate command checks configuration file syntax and validity.

use test_utils::{ConfigBuilder, DriverKind, TestContext};
use volctl::config::load_config;

#[test]
fn test_validate_valid_config() {
    let ctx = TestContext::new();
    let result = load_config(ctx.write_config());
    assert!(result.is_ok(), "Valid config should pass validation");
}

#[test]
fn test_validate_invalid_toml() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file("config.toml", "invalid { toml content");
    assert!(load_config(&config_path).is_err(), "Invalid TOML should fail");
}

#[test]
fn test_validate_empty_config() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file("config.toml", "");
    assert!(load_config(&config_path).is_err());
}

#[test]
fn test_validate_default_driver_must_exist() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new()
            .add_driver("pxd", DriverKind::Null)
            .with_default_driver("ceph"),
    );
    assert!(load_config(ctx.write_config()).is_err());
}

#[test]
fn test_validate_orphan_policy_values() {
    let ctx = TestContext::new();
    let config_path = ctx.create_file(
        "config.toml",
        r#"
[global]
data_dir = "/tmp/volctl"

[credentials]
orphan_policy = "shred"
"#,
    );
    assert!(load_config(&config_path).is_err());
}
