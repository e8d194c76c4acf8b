//! Tests for the 'creds' commands
//!
//! list / add / update / delete / rotate over file-backed stores.

use test_utils::{credential, s3_credential, TestContext};
use volctl::creds::SecretsMap;

#[test]
fn test_add_then_list() {
    let ctx = TestContext::new();
    let plane = ctx.plane();

    let id = plane.add_credential(s3_credential()).data.unwrap();

    let listed = plane.list_credentials().data.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[&id]["provider"], "s3");
    assert!(!listed[&id].contains_key("access_key"));
}

#[test]
fn test_document_layout_on_disk() {
    let ctx = TestContext::new();
    let id = ctx.plane().add_credential(s3_credential()).data.unwrap();

    let envelope: serde_json::Value =
        serde_json::from_str(&ctx.read_data_file("kv/credentials.json").unwrap()).unwrap();
    let document: serde_json::Value =
        serde_json::from_str(envelope["value"].as_str().unwrap()).unwrap();

    assert_eq!(document["Credentials"][&id]["region"], "us-east-1");
    assert_eq!(ctx.vault_entries(), 1);
}

#[test]
fn test_update_overwrites_metadata() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let id = plane.add_credential(s3_credential()).data.unwrap();

    assert!(plane.update_credential(&id, credential("gcs", "G")).is_ok());
    assert_eq!(plane.list_credentials().data.unwrap()[&id]["provider"], "gcs");
}

#[test]
fn test_update_with_empty_id_rejected() {
    let ctx = TestContext::new();
    let response = ctx.plane().update_credential("", s3_credential());
    assert_eq!(response.error.unwrap().code, "invalid_argument");
}

#[test]
fn test_delete_twice() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let id = plane.add_credential(s3_credential()).data.unwrap();

    assert!(plane.delete_credential(&id).is_ok());
    assert!(plane.delete_credential(&id).is_ok());
    assert!(plane.list_credentials().data.unwrap().is_empty());
    // Secret stays in the vault
    assert_eq!(ctx.vault_entries(), 1);
}

#[test]
fn test_rotate() {
    let ctx = TestContext::new();
    let plane = ctx.plane();
    let id = plane.add_credential(s3_credential()).data.unwrap();

    let rotated: SecretsMap = credential("s3", "AKIAROTATED").secrets;
    assert!(plane.rotate_credential(&id, rotated.clone()).is_ok());
    assert_eq!(plane.credentials().resolve(&id).unwrap().secrets, rotated);

    let response = plane.rotate_credential("unknown", rotated);
    assert_eq!(response.error.unwrap().code, "not_found");
}

#[test]
fn test_state_shared_between_planes() {
    let ctx = TestContext::new();
    let id = ctx.plane().add_credential(s3_credential()).data.unwrap();

    // A plane built later over the same data dir, like a second process
    assert!(ctx.plane().list_credentials().data.unwrap().contains_key(&id));
}
