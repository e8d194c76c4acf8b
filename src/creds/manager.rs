//! Credential manager - cluster-wide credential CRUD under a single lock

use super::database::{read_credential_info, write_credential_info};
use super::{CredentialEntry, NonSecretsMap, SecretsMap};
use crate::error::{ControlError, Result};
use crate::store::{DocumentStore, SecretVault};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name of the lock guarding every credential operation
pub const CRED_LOCK_KEY: &str = "/cred/lock";

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// What `create` does with a vault entry whose metadata write failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Leave the secret in the vault for external garbage collection
    #[default]
    Retain,
    /// Delete the secret again before returning the error
    Compensate,
}

/// Owns the credential document and the vault entries it creates
///
/// Every operation, reads included, runs under [`CRED_LOCK_KEY`] so the
/// document seen by one operation reflects all operations that completed
/// before it.
pub struct CredentialManager {
    kv: Arc<dyn DocumentStore>,
    vault: Arc<dyn SecretVault>,
    lock_timeout: Duration,
    orphan_policy: OrphanPolicy,
}

impl CredentialManager {
    pub fn new(kv: Arc<dyn DocumentStore>, vault: Arc<dyn SecretVault>) -> Self {
        Self {
            kv,
            vault,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            orphan_policy: OrphanPolicy::default(),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        self.orphan_policy
    }

    /// Run `f` while holding the credential lock
    fn locked<T>(&self, operation: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _lock = self.kv.lock(CRED_LOCK_KEY, self.lock_timeout).map_err(|e| {
            warn!("Unable to obtain cred lock for {}: {}", operation, e);
            e
        })?;
        debug!("Holding cred lock for {}", operation);
        f()
    }

    /// List metadata of every credential; secrets are never returned
    pub fn list(&self) -> Result<BTreeMap<String, NonSecretsMap>> {
        self.locked("list", || {
            let (db, index) = read_credential_info(self.kv.as_ref())?;
            debug!("Listed {} credentials at index {}", db.credentials.len(), index);
            Ok(db.credentials)
        })
    }

    /// Whether a credential id is present in the metadata document
    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.list()?.contains_key(id))
    }

    /// Store a new credential under a freshly generated id
    ///
    /// The secret is written first. If that fails nothing is committed. If
    /// the metadata write fails afterwards, the vault entry is handled per
    /// the configured [`OrphanPolicy`].
    pub fn create(&self, entry: CredentialEntry) -> Result<String> {
        self.locked("create", || {
            let (mut db, _) = read_credential_info(self.kv.as_ref())?;
            let id = Uuid::new_v4().to_string();

            self.vault.put_secret(&id, &entry.secrets).map_err(|e| {
                warn!("Unable to store secret for new credential {}: {}", id, e);
                match e {
                    ControlError::SecretStore(_) => e,
                    other => ControlError::SecretStore(other.to_string()),
                }
            })?;

            db.credentials.insert(id.clone(), entry.non_secrets);

            if let Err(e) = write_credential_info(self.kv.as_ref(), &db) {
                self.handle_orphan(&id);
                return Err(e);
            }

            info!("Created credential {}", id);
            Ok(id)
        })
    }

    fn handle_orphan(&self, id: &str) {
        match self.orphan_policy {
            OrphanPolicy::Retain => {
                warn!("Secret for credential {} is orphaned in the vault", id);
            }
            OrphanPolicy::Compensate => match self.vault.delete_secret(id) {
                Ok(()) => info!("Removed orphaned secret for credential {}", id),
                Err(e) => warn!("Failed to remove orphaned secret {}: {}", id, e),
            },
        }
    }

    /// Overwrite the metadata of `id`, creating it if absent
    ///
    /// Secret material is left untouched; see [`Self::rotate_secret`].
    pub fn update(&self, id: &str, entry: CredentialEntry) -> Result<()> {
        validate_id(id)?;
        self.locked("update", || {
            let (mut db, _) = read_credential_info(self.kv.as_ref())?;
            let existed = db.credentials.insert(id.to_string(), entry.non_secrets).is_some();
            write_credential_info(self.kv.as_ref(), &db)?;

            if existed {
                info!("Updated credential {}", id);
            } else {
                info!("Updated credential {} (created metadata)", id);
            }
            Ok(())
        })
    }

    /// Remove the metadata of `id`; unknown ids are not an error
    ///
    /// The vault entry is not removed.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.locked("delete", || {
            let (mut db, _) = read_credential_info(self.kv.as_ref())?;
            if db.credentials.remove(id).is_none() {
                debug!("Credential {} not present, nothing to delete", id);
            }
            write_credential_info(self.kv.as_ref(), &db)?;
            info!("Deleted credential {}", id);
            Ok(())
        })
    }

    /// Fetch metadata and secret material for a driver that needs to reach
    /// the cloud store
    pub fn resolve(&self, id: &str) -> Result<CredentialEntry> {
        self.locked("resolve", || {
            let (db, _) = read_credential_info(self.kv.as_ref())?;
            let non_secrets = db
                .credentials
                .get(id)
                .cloned()
                .ok_or_else(|| ControlError::NotFound(format!("credential {}", id)))?;

            let secrets = self.vault.get_secret(id)?.ok_or_else(|| {
                ControlError::SecretStore(format!("no secret stored for credential {}", id))
            })?;

            Ok(CredentialEntry::new(non_secrets, secrets))
        })
    }

    /// Replace the secret material of an existing credential
    pub fn rotate_secret(&self, id: &str, secrets: SecretsMap) -> Result<()> {
        self.locked("rotate", || {
            let (db, _) = read_credential_info(self.kv.as_ref())?;
            if !db.credentials.contains_key(id) {
                return Err(ControlError::NotFound(format!("credential {}", id)));
            }
            self.vault.put_secret(id, &secrets)?;
            info!("Rotated secret for credential {}", id);
            Ok(())
        })
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ControlError::InvalidArgument(
            "credential id must not be empty".to_string(),
        ));
    }
    Ok(())
}
