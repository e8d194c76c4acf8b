//! Unit tests for configuration loading and validation

use test_utils::{ConfigBuilder, DriverKind, TestContext};
use volctl::config::{enabled_drivers, load_config, ConfigError};

#[test]
fn test_config_loading_valid() {
    let ctx = TestContext::new();
    let path = ctx.write_config();

    let loaded = load_config(&path);
    assert!(loaded.is_ok(), "Config should load successfully: {:?}", loaded.err());

    let loaded = loaded.unwrap();
    assert_eq!(loaded.default_driver.as_deref(), Some("pxd"));
    assert_eq!(loaded.drivers.len(), 2);
}

#[test]
fn test_config_missing_file() {
    let ctx = TestContext::new();
    let result = load_config(ctx.temp_dir().join("missing.toml"));
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}

#[test]
fn test_config_missing_data_dir() {
    let ctx = TestContext::new();
    let path = ctx.create_file("volctl.toml", "[global]\nnode_id = \"n1\"\n");
    assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_config_empty_node_id() {
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "volctl.toml",
        "[global]\ndata_dir = \"/tmp/volctl\"\nnode_id = \"  \"\n",
    );
    assert!(matches!(load_config(&path), Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_disabled_drivers_not_registered() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::standard().add_disabled_driver("old", DriverKind::KvBackup),
    );

    let names: Vec<&str> = enabled_drivers(ctx.config())
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["pxd", "pxd-sched"]);

    let plane = ctx.plane();
    assert!(!plane.registry().contains("old"));
    assert!(plane.registry().contains("pxd-sched"));
}

#[test]
fn test_lock_timeout_reaches_manager() {
    let ctx = TestContext::from_builder(ConfigBuilder::standard().with_lock_timeout_ms(750));
    let plane = ctx.plane();
    assert_eq!(plane.credentials().lock_timeout().as_millis(), 750);
}

#[test]
fn test_default_driver_served_by_sched_only() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new()
            .add_driver("pxd-sched", DriverKind::KvBackup)
            .with_default_driver("pxd"),
    );
    let loaded = load_config(ctx.write_config()).unwrap();
    assert_eq!(loaded.default_driver.as_deref(), Some("pxd"));

    assert!(ctx.plane().list_schedules(&ctx.request()).is_ok());
}

#[test]
fn test_default_driver_must_be_enabled() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new()
            .add_disabled_driver("pxd", DriverKind::Null)
            .with_default_driver("pxd"),
    );
    assert!(matches!(
        load_config(ctx.write_config()),
        Err(ConfigError::DriverNotFound(_))
    ));
}
