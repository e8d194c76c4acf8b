//! Unit tests for the schedule lifecycle and capability stand-ins

use std::sync::Arc;
use test_utils::{add_kv_driver, null_registry, MemoryDocumentStore, RequestContext};
use volctl::drivers::{
    BackupDriver, Capability, DriverResolver, NotSupported, StatsDriver, VolumeDriver,
};
use volctl::managers::schedules::ScheduleManager;
use volctl::ControlError;

fn manager() -> (ScheduleManager, MemoryDocumentStore) {
    let registry = null_registry(&["pxd", "csi"]);
    let kv = MemoryDocumentStore::new();
    add_kv_driver(&registry, "pxd-sched", &kv);
    (ScheduleManager::new(DriverResolver::new(registry)), kv)
}

#[test]
fn test_create_list_delete() {
    let (manager, _) = manager();
    let ctx = RequestContext::new("pxd");

    let first = manager
        .create_schedule(&ctx, "vol1", "0 1 * * *", "cred", None)
        .unwrap();
    let second = manager
        .create_schedule(&ctx, "vol2", "30 4 * * 0", "cred", Some("7"))
        .unwrap();
    assert_ne!(first, second);

    let listed = manager.list_schedules(&ctx).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[&second].max_backups, Some(7));

    manager.delete_schedule(&ctx, &first).unwrap();
    manager.delete_schedule(&ctx, &first).unwrap();
    let listed = manager.list_schedules(&ctx).unwrap();
    assert_eq!(listed.len(), 1);
    assert!(!listed.contains_key(&first));
}

#[test]
fn test_update_unknown_schedule() {
    let (manager, _) = manager();
    let ctx = RequestContext::new("pxd");
    assert!(matches!(
        manager.update_schedule(&ctx, "nope", "0 1 * * *", "cred", None),
        Err(ControlError::NotFound(_))
    ));
}

#[test]
fn test_invalid_cron_rejected() {
    let (manager, _) = manager();
    let ctx = RequestContext::new("pxd");
    assert!(matches!(
        manager.create_schedule(&ctx, "vol1", "every day", "cred", None),
        Err(ControlError::InvalidArgument(_))
    ));
}

#[test]
fn test_schedules_persist_in_document_store() {
    let (manager, kv) = manager();
    let ctx = RequestContext::new("pxd");
    let id = manager
        .create_schedule(&ctx, "vol1", "0 1 * * *", "cred", None)
        .unwrap();

    let raw = kv.raw("pxd-sched/cloudsnap-schedules").unwrap();
    assert!(raw.contains(&id));
}

#[test]
fn test_status_is_pure_read() {
    let (manager, kv) = manager();
    let ctx = RequestContext::new("pxd");
    manager.cloud_backup(&ctx, "vol1", "cred", true).unwrap();

    let puts = kv.puts();
    for _ in 0..3 {
        assert_eq!(manager.cached_status(&ctx, "vol1", false).unwrap().len(), 1);
    }
    assert_eq!(kv.puts(), puts);
}

#[test]
fn test_state_machine() {
    let (manager, _) = manager();
    let ctx = RequestContext::new("pxd");

    assert!(matches!(
        manager.change_backup_state(&ctx, "vol1", "pause"),
        Err(ControlError::NotFound(_))
    ));

    manager.cloud_backup(&ctx, "vol1", "cred", false).unwrap();
    // A second backup while one is active is refused
    assert!(matches!(
        manager.cloud_backup(&ctx, "vol1", "cred", false),
        Err(ControlError::InvalidTransition { .. })
    ));

    manager.change_backup_state(&ctx, "vol1", "pause").unwrap();
    manager.change_backup_state(&ctx, "vol1", "resume").unwrap();
    manager.change_backup_state(&ctx, "vol1", "stop").unwrap();

    let err = manager.change_backup_state(&ctx, "vol1", "resume").unwrap_err();
    assert!(!err.to_string().is_empty());
    assert!(matches!(err, ControlError::InvalidTransition { .. }));

    assert!(matches!(
        manager.change_backup_state(&ctx, "vol1", "explode"),
        Err(ControlError::InvalidArgument(_))
    ));

    // A stopped backup no longer blocks a new one
    manager.cloud_backup(&ctx, "vol1", "cred", false).unwrap();
}

#[test]
fn test_declining_driver_reports_not_supported() {
    let (manager, _) = manager();
    let ctx = RequestContext::new("pxd").with_caller("csi/1.0");

    assert!(matches!(
        manager.create_schedule(&ctx, "vol1", "0 1 * * *", "cred", None),
        Err(ControlError::NotSupported)
    ));
    assert!(matches!(
        manager.cached_status(&ctx, "vol1", true),
        Err(ControlError::NotSupported)
    ));
}

#[test]
fn test_stand_in_is_stable() {
    let stand_in = NotSupported;
    for _ in 0..3 {
        let err = stand_in.list_backup_schedules().unwrap_err();
        assert!(err.is_cacheable());
    }
    // The one stand-in operation that succeeds
    assert!(stand_in.active_requests().unwrap().requests.is_empty());
}

#[test]
fn test_driver_capabilities() {
    let registry = null_registry(&["pxd"]);
    let kv = MemoryDocumentStore::new();
    add_kv_driver(&registry, "pxd-sched", &kv);

    let null: Arc<dyn VolumeDriver> = registry.get("pxd").unwrap();
    assert!(null.capabilities().is_empty());

    let sched = registry.get("pxd-sched").unwrap();
    assert_eq!(sched.capabilities(), vec![Capability::Backup]);
    assert!(!sched.supports(Capability::Io));
}
