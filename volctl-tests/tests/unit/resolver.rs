//! Unit tests for driver resolution precedence

use rstest::rstest;
use std::sync::Arc;
use test_utils::null_registry;
use volctl::drivers::{DriverResolver, NullDriver, SCHED_DRIVER_SUFFIX};
use volctl::ControlError;

#[rstest]
#[case::caller_first(&["csi", "pxd", "pxd-sched"], Some("csi/1.4.0"), "csi")]
#[case::sched_second(&["pxd", "pxd-sched"], None, "pxd-sched")]
#[case::base_last(&["pxd"], None, "pxd")]
#[case::unknown_caller(&["pxd", "pxd-sched"], Some("curl/8.0"), "pxd-sched")]
#[case::empty_caller(&["pxd"], Some(""), "pxd")]
#[case::bare_caller(&["csi", "pxd"], Some("csi"), "csi")]
fn test_precedence(
    #[case] registered: &[&str],
    #[case] caller: Option<&str>,
    #[case] expected: &str,
) {
    let resolver = DriverResolver::new(null_registry(registered));
    let driver = resolver.resolve("pxd", caller).unwrap();
    assert_eq!(driver.name(), expected);
}

#[test]
fn test_sched_suffix() {
    assert_eq!(SCHED_DRIVER_SUFFIX, "-sched");
}

#[test]
fn test_nothing_registered() {
    let resolver = DriverResolver::new(null_registry(&[]));
    let err = resolver.resolve("pxd", None).unwrap_err();
    assert!(matches!(err, ControlError::DriverNotFound(_)));
    assert!(err.to_string().contains("pxd-sched"));
}

#[test]
fn test_caller_name_never_falls_back_to_prefix() {
    // "csi-driver" is not "csi"
    let resolver = DriverResolver::new(null_registry(&["csi", "pxd"]));
    assert_eq!(
        resolver.resolve("pxd", Some("csi-driver/1.0")).unwrap().name(),
        "pxd"
    );
}

#[test]
fn test_resolution_tracks_registry_between_calls() {
    let registry = null_registry(&["pxd"]);
    let resolver = DriverResolver::new(registry.clone());

    assert_eq!(resolver.resolve("pxd", Some("csi/1")).unwrap().name(), "pxd");

    registry.register(Arc::new(NullDriver::new("csi"))).unwrap();
    assert_eq!(resolver.resolve("pxd", Some("csi/1")).unwrap().name(), "csi");

    registry.unregister("csi");
    assert_eq!(resolver.resolve("pxd", Some("csi/1")).unwrap().name(), "pxd");
}
