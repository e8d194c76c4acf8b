//! Unit tests for the credential manager
//!
//! Covers the shared-document layout, the vault/metadata split and the
//! single-lock serialization across threads and across manager instances.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use test_utils::{credential, memory_manager, s3_credential, TestContext};
use volctl::creds::{CredentialManager, OrphanPolicy, CREDENTIALS_DB_KEY, CRED_LOCK_KEY};
use volctl::store::{DocumentStore, FileDocumentStore, FileSecretVault};
use volctl::ControlError;

fn file_manager(ctx: &TestContext) -> CredentialManager {
    let global = &ctx.config().global;
    CredentialManager::new(
        Arc::new(FileDocumentStore::new(global.document_root())),
        Arc::new(FileSecretVault::new(global.secrets_dir())),
    )
    .with_lock_timeout(Duration::from_secs(5))
}

#[test]
fn test_empty_store_lists_nothing() {
    let (manager, kv, _) = memory_manager();
    assert!(manager.list().unwrap().is_empty());

    kv.insert_raw(CREDENTIALS_DB_KEY, "{}");
    assert!(manager.list().unwrap().is_empty());
}

#[test]
fn test_create_splits_secret_and_metadata() {
    let (manager, kv, vault) = memory_manager();

    let id = manager.create(s3_credential()).unwrap();

    let raw = kv.raw(CREDENTIALS_DB_KEY).unwrap();
    assert!(raw.contains("\"Credentials\""));
    assert!(raw.contains(&id));
    assert!(raw.contains("s3.example.com"));
    assert!(!raw.contains("AKIAEXAMPLE"), "secrets must not reach the document");

    assert!(vault.contains(&id));
}

#[test]
fn test_generated_ids_are_uuids() {
    let (manager, _, _) = memory_manager();
    let id = manager.create(s3_credential()).unwrap();

    assert_eq!(id.len(), 36);
    assert_eq!(id.matches('-').count(), 4);
}

#[test]
fn test_update_is_upsert() {
    let (manager, _, vault) = memory_manager();

    manager.update("chosen-id", credential("gcs", "GOOG1")).unwrap();
    let listed = manager.list().unwrap();
    assert_eq!(listed["chosen-id"]["provider"], "gcs");
    // Metadata only; secrets change through rotation
    assert!(!vault.contains("chosen-id"));

    manager.update("chosen-id", credential("azure", "AZ1")).unwrap();
    assert_eq!(manager.list().unwrap()["chosen-id"]["provider"], "azure");
    assert_eq!(manager.list().unwrap().len(), 1);
}

#[test]
fn test_delete_is_idempotent_and_keeps_secret() {
    let (manager, _, vault) = memory_manager();
    let id = manager.create(s3_credential()).unwrap();

    manager.delete(&id).unwrap();
    manager.delete(&id).unwrap();

    assert!(!manager.list().unwrap().contains_key(&id));
    assert!(vault.contains(&id));
    assert!(vault.deleted_ids().is_empty());
}

#[test]
fn test_failed_vault_put_leaves_document_untouched() {
    let (manager, kv, vault) = memory_manager();
    let existing = manager.create(s3_credential()).unwrap();
    let before = kv.raw(CREDENTIALS_DB_KEY);

    *vault.should_fail_put.lock() = true;
    let err = manager.create(s3_credential()).unwrap_err();

    assert!(matches!(err, ControlError::SecretStore(_)));
    assert_eq!(kv.raw(CREDENTIALS_DB_KEY), before);
    assert_eq!(manager.list().unwrap().len(), 1);
    assert!(manager.list().unwrap().contains_key(&existing));
}

#[test]
fn test_orphan_policies() {
    // Retain leaves the secret behind
    let (manager, kv, vault) = memory_manager();
    kv.set_failing_put(true);
    assert!(manager.create(s3_credential()).is_err());
    assert_eq!(vault.len(), 1);

    // Compensate removes it again
    let (manager, kv, vault) = memory_manager();
    let manager = manager.with_orphan_policy(OrphanPolicy::Compensate);
    kv.set_failing_put(true);
    assert!(manager.create(s3_credential()).is_err());
    assert!(vault.is_empty());
    assert_eq!(vault.deleted_ids().len(), 1);
}

#[test]
fn test_lock_released_after_every_outcome() {
    let (manager, kv, _) = memory_manager();

    manager.create(s3_credential()).unwrap();
    assert!(!kv.is_locked(CRED_LOCK_KEY));

    kv.set_failing_put(true);
    assert!(manager.create(s3_credential()).is_err());
    assert!(!kv.is_locked(CRED_LOCK_KEY));

    kv.insert_raw(CREDENTIALS_DB_KEY, "not json");
    assert!(matches!(manager.list(), Err(ControlError::Corrupt { .. })));
    assert!(!kv.is_locked(CRED_LOCK_KEY));
}

#[test]
fn test_held_lock_times_out() {
    let (manager, kv, _) = memory_manager();
    let manager = manager.with_lock_timeout(Duration::from_millis(50));

    let _held = kv.lock(CRED_LOCK_KEY, Duration::from_millis(10)).unwrap();
    assert!(matches!(
        manager.list(),
        Err(ControlError::LockTimeout { .. })
    ));
}

#[test]
fn test_file_backed_round_trip() {
    let ctx = TestContext::new();
    let manager = file_manager(&ctx);

    let id = manager.create(s3_credential()).unwrap();
    let resolved = manager.resolve(&id).unwrap();
    assert_eq!(resolved, s3_credential());

    // A second manager over the same directories sees the same document
    let other = file_manager(&ctx);
    assert!(other.contains(&id).unwrap());
    assert_eq!(ctx.vault_entries(), 1);
}

#[test]
fn test_concurrent_creates_across_managers_lose_nothing() {
    let ctx = TestContext::new();
    let managers: Vec<Arc<CredentialManager>> =
        (0..4).map(|_| Arc::new(file_manager(&ctx))).collect();

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let manager = managers[i % managers.len()].clone();
            thread::spawn(move || manager.create(credential("s3", &format!("KEY{}", i))).unwrap())
        })
        .collect();

    let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 12);

    let listed = managers[0].list().unwrap();
    assert_eq!(listed.len(), 12);
    for id in &ids {
        assert!(listed.contains_key(id));
    }
}

#[test]
fn test_rotate_replaces_secret_only() {
    let (manager, kv, _) = memory_manager();
    let id = manager.create(s3_credential()).unwrap();
    let document = kv.raw(CREDENTIALS_DB_KEY);

    let rotated = credential("s3", "AKIANEW").secrets;
    manager.rotate_secret(&id, rotated.clone()).unwrap();

    assert_eq!(manager.resolve(&id).unwrap().secrets, rotated);
    assert_eq!(kv.raw(CREDENTIALS_DB_KEY), document);
}
