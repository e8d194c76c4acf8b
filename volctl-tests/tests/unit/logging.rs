//! Unit tests for logging setup
//!
//! The tracing subscriber is process-global, so installation is checked in
//! a single serial test.

use serial_test::serial;
use test_utils::TestContext;
use volctl::managers::logging::{init_logging, LoggingConfig};

#[test]
#[serial]
fn test_init_logging_once_per_process() {
    let ctx = TestContext::new();
    let log_dir = ctx.temp_dir().join("fresh-logs");

    let mut config = LoggingConfig::from_config(&ctx.config().global);
    config.log_directory = log_dir.clone();

    let guard = init_logging(&config).unwrap();
    assert!(log_dir.is_dir());

    // A second subscriber cannot be installed
    assert!(init_logging(&config).is_err());
    drop(guard);
}
