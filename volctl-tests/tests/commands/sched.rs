//! Tests for the 'sched' commands
//!
//! Schedules go through driver resolution, so the standard context routes
//! `pxd` requests to the `pxd-sched` driver.

use test_utils::{
    daily_schedule, s3_credential, ConfigBuilder, DriverKind, RequestContext, TestContext,
};
use volctl::api::UpdateScheduleRequest;

#[test]
fn test_create_and_list() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let cred = plane.add_credential(s3_credential()).data.unwrap();

    let mut request = daily_schedule("vol-a", &cred);
    request.max_backups = Some("5".to_string());
    let id = plane.create_schedule(&ctx.request(), &request).data.unwrap();

    let listed = plane.list_schedules(&ctx.request()).data.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[&id].volume_id, "vol-a");
    assert_eq!(listed[&id].max_backups, Some(5));
}

#[test]
fn test_unknown_credential_rejected() {
    let ctx = TestContext::new();
    let plane = ctx.plane();

    let response = plane.create_schedule(&ctx.request(), &daily_schedule("vol-a", "ghost"));
    let error = response.error.unwrap();
    assert_eq!(error.code, "not_found");
    assert!(error.message.contains("ghost"));
}

#[test]
fn test_driver_errors_reported_before_credential() {
    let ctx = TestContext::new();
    let plane = ctx.plane();

    let declining = ctx.request().with_caller("pxd/1.0");
    let response = plane.create_schedule(&declining, &daily_schedule("vol-a", "ghost"));
    assert_eq!(response.error.unwrap().code, "not_supported");

    let unknown = RequestContext::new("ceph");
    let response = plane.create_schedule(&unknown, &daily_schedule("vol-a", "ghost"));
    assert_eq!(response.error.unwrap().code, "driver_not_found");
}

#[test]
fn test_bad_max_backups() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let cred = plane.add_credential(s3_credential()).data.unwrap();

    let mut request = daily_schedule("vol-a", &cred);
    request.max_backups = Some("lots".to_string());
    let response = plane.create_schedule(&ctx.request(), &request);
    assert_eq!(response.error.unwrap().code, "invalid_argument");
}

#[test]
fn test_update_keeps_volume() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let cred = plane.add_credential(s3_credential()).data.unwrap();
    let id = plane
        .create_schedule(&ctx.request(), &daily_schedule("vol-a", &cred))
        .data
        .unwrap();

    let update = UpdateScheduleRequest {
        schedule_id: id.clone(),
        schedule: "15 3 * * 1-5".to_string(),
        credential_id: cred,
        max_backups: Some(String::new()),
    };
    assert!(plane.update_schedule(&ctx.request(), &update).is_ok());

    let schedule = &plane.list_schedules(&ctx.request()).data.unwrap()[&id];
    assert_eq!(schedule.volume_id, "vol-a");
    assert_eq!(schedule.schedule, "15 3 * * 1-5");
    assert_eq!(schedule.max_backups, None);
}

#[test]
fn test_delete_unknown_succeeds() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    assert!(plane.delete_schedule(&ctx.request(), "missing").is_ok());
}

#[test]
fn test_without_sched_driver_base_declines() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new()
            .add_driver("nfs", DriverKind::Null)
            .with_default_driver("nfs"),
    );
    let plane = ctx.plane();

    let response = plane.list_schedules(&ctx.request());
    assert_eq!(response.error.unwrap().code, "not_supported");
}

#[test]
fn test_unknown_driver() {
    let ctx = TestContext::new();
    let plane = ctx.plane();

    let response = plane.list_schedules(&volctl::RequestContext::new("ceph"));
    assert_eq!(response.error.unwrap().code, "driver_not_found");
}
