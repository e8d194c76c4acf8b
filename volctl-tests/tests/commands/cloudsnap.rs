//! Tests for the 'cloudsnap' commands
//!
//! backup / status / change-state against the document-store driver.

use test_utils::{
    backup_request, finished_backup, s3_credential, ConfigBuilder, RequestContext, TestContext,
};
use volctl::api::{
    CloudVolumeRequest, DeleteSnapsRequest, ListSnapsRequest, RestoreRequest, StateChangeRequest,
    StatusRequest,
};
use volctl::drivers::{BackupOp, BackupState};

fn change(volume: &str, state: &str) -> StateChangeRequest {
    StateChangeRequest {
        volume_id: volume.to_string(),
        requested_state: state.to_string(),
    }
}

#[test]
fn test_backup_then_status() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let cred = plane.add_credential(s3_credential()).data.unwrap();

    assert!(plane.cloud_backup(&ctx.request(), &backup_request("vol-a", &cred)).is_ok());

    let status = plane
        .cached_status(
            &ctx.request(),
            &StatusRequest {
                volume_id: "vol-a".to_string(),
                local: false,
            },
        )
        .data
        .unwrap();
    assert_eq!(status.len(), 1);

    let entry = status.values().next().unwrap();
    assert_eq!(entry.status, BackupState::Active);
    assert_eq!(entry.credential_id, cred);
    assert_eq!(entry.node_id, "test-node");
}

#[test]
fn test_backup_needs_credential() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let response = plane.cloud_backup(&ctx.request(), &backup_request("vol-a", "ghost"));
    assert_eq!(response.error.unwrap().code, "not_found");
}

#[test]
fn test_local_filter_across_nodes() {
    let first = TestContext::new();
    let shared = first.config().global.data_dir.clone();
    let second = TestContext::from_builder(
        ConfigBuilder::standard()
            .with_node_id("other-node")
            .with_data_dir(&shared),
    );

    let cred = first.plane().add_credential(s3_credential()).data.unwrap();
    assert!(first
        .plane()
        .cloud_backup(&first.request(), &backup_request("vol-a", &cred))
        .is_ok());
    assert!(second
        .plane()
        .cloud_backup(&second.request(), &backup_request("vol-b", &cred))
        .is_ok());

    let all = StatusRequest::default();
    let local = StatusRequest {
        volume_id: String::new(),
        local: true,
    };

    let plane = second.plane();
    assert_eq!(plane.cached_status(&second.request(), &all).data.unwrap().len(), 2);

    let mine = plane.cached_status(&second.request(), &local).data.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine.values().next().unwrap().volume_id, "vol-b");
}

#[test]
fn test_state_transitions() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let cred = plane.add_credential(s3_credential()).data.unwrap();
    assert!(plane.cloud_backup(&ctx.request(), &backup_request("vol-a", &cred)).is_ok());

    assert!(plane.change_backup_state(&ctx.request(), &change("vol-a", "pause")).is_ok());

    let response = plane.change_backup_state(&ctx.request(), &change("vol-a", "pause"));
    let error = response.error.unwrap();
    assert_eq!(error.code, "invalid_transition");
    assert!(!error.message.is_empty());

    assert!(plane.change_backup_state(&ctx.request(), &change("vol-a", "resume")).is_ok());
    assert!(plane.change_backup_state(&ctx.request(), &change("vol-a", "cancel")).is_ok());

    let status = plane
        .cached_status(&ctx.request(), &StatusRequest::default())
        .data
        .unwrap();
    let entry = status.values().next().unwrap();
    assert_eq!(entry.status, BackupState::Stopped);
    assert!(entry.completed_time.is_some());
}

#[test]
fn test_change_state_unknown_volume() {
    let ctx = TestContext::new();
    let response = ctx
        .plane()
        .change_backup_state(&ctx.request(), &change("vol-z", "stop"));
    assert_eq!(response.error.unwrap().code, "not_found");
}

#[test]
fn test_restore_from_finished_backup() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let cred = plane.add_credential(s3_credential()).data.unwrap();
    ctx.record_backup("snap-full", finished_backup("vol-a", &cred, true, 120));
    ctx.record_backup("snap-incr", finished_backup("vol-a", &cred, false, 60));

    let every = ListSnapsRequest {
        all: true,
        ..Default::default()
    };
    let ids: Vec<String> = plane
        .list_cloud_snaps(&ctx.request(), &every)
        .data
        .unwrap()
        .into_iter()
        .map(|snap| snap.id)
        .collect();
    assert_eq!(ids, vec!["snap-full", "snap-incr"]);

    let newest = plane
        .list_cloud_snaps(&ctx.request(), &ListSnapsRequest::default())
        .data
        .unwrap();
    assert_eq!(newest.len(), 1);
    assert_eq!(newest[0].id, "snap-incr");

    let incr = CloudVolumeRequest {
        cloud_volume_id: "snap-incr".to_string(),
        credential_id: cred.clone(),
    };
    assert_eq!(
        plane.backup_catalog(&ctx.request(), &incr).data.unwrap(),
        vec!["snap-full", "snap-incr"]
    );
    assert_eq!(plane.backup_metadata(&ctx.request(), &incr).data.unwrap()["full"], "false");

    let restore = RestoreRequest {
        dest_volume_id: "vol-b".to_string(),
        cloud_volume_id: "snap-incr".to_string(),
        credential_id: cred.clone(),
        node_id: String::new(),
    };
    assert_eq!(plane.cloud_restore(&ctx.request(), &restore).data.unwrap(), "vol-b");

    let status = plane
        .cached_status(
            &ctx.request(),
            &StatusRequest {
                volume_id: "vol-b".to_string(),
                local: true,
            },
        )
        .data
        .unwrap();
    let entry = status.values().next().unwrap();
    assert_eq!(entry.op, BackupOp::Restore);
    assert_eq!(entry.status, BackupState::Active);

    let delete = DeleteSnapsRequest {
        src_volume_id: "vol-a".to_string(),
        credential_id: cred,
    };
    assert!(plane.delete_cloud_snaps(&ctx.request(), &delete).is_ok());
    assert!(plane
        .list_cloud_snaps(&ctx.request(), &every)
        .data
        .unwrap()
        .is_empty());
}

#[test]
fn test_snap_operations_resolve_driver_first() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let lookup = CloudVolumeRequest {
        cloud_volume_id: "snap".to_string(),
        credential_id: "ghost".to_string(),
    };

    // "pxd/1.0" reaches the declining base driver
    let declining = ctx.request().with_caller("pxd/1.0");
    assert_eq!(
        plane.backup_metadata(&declining, &lookup).error.unwrap().code,
        "not_supported"
    );

    let unknown = RequestContext::new("ceph");
    assert_eq!(
        plane.backup_catalog(&unknown, &lookup).error.unwrap().code,
        "driver_not_found"
    );

    assert_eq!(
        plane.backup_catalog(&ctx.request(), &lookup).error.unwrap().code,
        "not_found"
    );
}
