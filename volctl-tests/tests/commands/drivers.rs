//! Tests for the 'drivers', 'routes' and 'versions' commands

use test_utils::{ConfigBuilder, DriverKind, TestContext};
use volctl::api::{find_route, routes, Method, Operation};
use volctl::drivers::Capability;

#[test]
fn test_drivers_listed_with_capabilities() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::standard().add_driver("csi", DriverKind::KvBackup),
    );

    let drivers = ctx.plane().list_drivers().data.unwrap();
    let names: Vec<&str> = drivers.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["csi", "pxd", "pxd-sched"]);

    assert_eq!(drivers[0].capabilities, vec![Capability::Backup]);
    assert!(drivers[1].capabilities.is_empty());
}

#[test]
fn test_versions() {
    let ctx = TestContext::new();
    assert_eq!(ctx.plane().versions().data.unwrap(), vec!["v1"]);
}

#[test]
fn test_route_table_covers_credential_surface() {
    let expected = [
        (Method::Get, "/v1/creds/listcreds", Operation::ListCredentials),
        (Method::Put, "/v1/creds/addcreds", Operation::AddCredential),
        (Method::Post, "/v1/creds/updatecreds", Operation::UpdateCredential),
        (Method::Delete, "/v1/creds/deletecreds", Operation::DeleteCredential),
    ];
    for (method, path, operation) in expected {
        assert_eq!(find_route(method, path).unwrap().operation, operation);
    }
}

#[test]
fn test_route_table_covers_schedule_surface() {
    let cloudsnap: Vec<_> = routes()
        .into_iter()
        .filter(|r| r.path.starts_with("/v1/osd-snapshot/cloudsnap/"))
        .map(|r| r.operation)
        .collect();

    for operation in [
        Operation::CreateSchedule,
        Operation::UpdateSchedule,
        Operation::ListSchedules,
        Operation::DeleteSchedule,
        Operation::CachedStatus,
        Operation::ChangeBackupState,
        Operation::CloudBackup,
    ] {
        assert!(cloudsnap.contains(&operation), "missing {:?}", operation);
    }
}
