//! Test fixtures and sample data

use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use volctl::api::{BackupRequest, CreateScheduleRequest};
use volctl::creds::{CredentialEntry, CredentialManager, NonSecretsMap, SecretsMap};
use volctl::drivers::{
    BackupOp, BackupState, BackupStatus, DriverRegistry, KvBackupDriver, NullDriver,
};
use volctl::store::document::mock::MemoryDocumentStore;
use volctl::store::vault::mock::MemorySecretVault;

/// An S3-style credential with one secret pair
pub fn s3_credential() -> CredentialEntry {
    credential("s3", "AKIAEXAMPLE")
}

pub fn credential(provider: &str, access_key: &str) -> CredentialEntry {
    let mut non_secrets = NonSecretsMap::new();
    non_secrets.insert("provider".to_string(), json!(provider));
    non_secrets.insert("endpoint".to_string(), json!(format!("{}.example.com", provider)));
    non_secrets.insert("region".to_string(), json!("us-east-1"));

    let mut secrets = SecretsMap::new();
    secrets.insert("access_key".to_string(), json!(access_key));
    secrets.insert("secret_key".to_string(), json!("wJalrXUtnFEMI"));

    CredentialEntry::new(non_secrets, secrets)
}

/// Daily schedule for `volume_id`
pub fn daily_schedule(volume_id: &str, credential_id: &str) -> CreateScheduleRequest {
    CreateScheduleRequest {
        volume_id: volume_id.to_string(),
        schedule: "0 2 * * *".to_string(),
        credential_id: credential_id.to_string(),
        max_backups: None,
    }
}

pub fn backup_request(volume_id: &str, credential_id: &str) -> BackupRequest {
    BackupRequest {
        volume_id: volume_id.to_string(),
        credential_id: credential_id.to_string(),
        full: false,
    }
}

/// A completed backup of `volume_id` started `age_secs` ago on "test-node"
pub fn finished_backup(volume_id: &str, credential_id: &str, full: bool, age_secs: i64) -> BackupStatus {
    let start_time = Utc::now() - Duration::seconds(age_secs);
    BackupStatus {
        volume_id: volume_id.to_string(),
        op: BackupOp::Backup,
        status: BackupState::Done,
        bytes_done: 4096,
        start_time,
        completed_time: Some(start_time + Duration::seconds(1)),
        node_id: "test-node".to_string(),
        credential_id: credential_id.to_string(),
        full,
    }
}

/// Credential manager over in-memory stores, with the stores for inspection
pub fn memory_manager() -> (CredentialManager, MemoryDocumentStore, MemorySecretVault) {
    let kv = MemoryDocumentStore::new();
    let vault = MemorySecretVault::new();
    let manager = CredentialManager::new(Arc::new(kv.clone()), Arc::new(vault.clone()));
    (manager, kv, vault)
}

/// Registry holding a `NullDriver` for each name
pub fn null_registry(names: &[&str]) -> Arc<DriverRegistry> {
    let registry = Arc::new(DriverRegistry::new());
    for name in names {
        registry
            .register(Arc::new(NullDriver::new(*name)))
            .expect("Failed to register driver");
    }
    registry
}

/// Register a document-store backed scheduler driver
pub fn add_kv_driver(registry: &DriverRegistry, name: &str, kv: &MemoryDocumentStore) {
    registry
        .register(Arc::new(KvBackupDriver::new(name, "test-node", Arc::new(kv.clone()))))
        .expect("Failed to register driver");
}
