//! Secret vault abstraction
//!
//! Secret material is addressed by credential id and never shares storage
//! with the non-secret metadata document.

use crate::creds::SecretsMap;
use crate::error::{ControlError, Result};
use crate::utils::fs_atomic;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Abstraction over the secret backend, enabling mocking in tests
#[cfg_attr(test, mockall::automock)]
pub trait SecretVault: Send + Sync {
    /// Store (or replace) the secret for `id`
    fn put_secret(&self, id: &str, secret: &SecretsMap) -> Result<()>;

    /// Read the secret for `id`, `None` if absent
    fn get_secret(&self, id: &str) -> Result<Option<SecretsMap>>;

    /// Remove the secret for `id`; absent ids are not an error
    fn delete_secret(&self, id: &str) -> Result<()>;
}

/// Vault keeping one private JSON file per secret
#[derive(Debug, Clone)]
pub struct FileSecretVault {
    root: PathBuf,
}

impl FileSecretVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn secret_path(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(ControlError::InvalidArgument(format!(
                "invalid secret id '{}'",
                id
            )));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }
}

impl SecretVault for FileSecretVault {
    fn put_secret(&self, id: &str, secret: &SecretsMap) -> Result<()> {
        let path = self.secret_path(id)?;
        fs_atomic::ensure_private_dir(&self.root)
            .map_err(|e| ControlError::SecretStore(format!("failed to prepare vault: {}", e)))?;

        let bytes = serde_json::to_vec(secret)
            .map_err(|e| ControlError::SecretStore(format!("failed to encode secret: {}", e)))?;
        fs_atomic::write_atomic(&path, &bytes, true)
            .map_err(|e| ControlError::SecretStore(format!("failed to write secret: {}", e)))?;

        debug!("Stored secret for credential {}", id);
        Ok(())
    }

    fn get_secret(&self, id: &str) -> Result<Option<SecretsMap>> {
        let path = self.secret_path(id)?;
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ControlError::SecretStore(format!(
                    "failed to read secret {}: {}",
                    id, e
                )))
            }
        };

        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|e| ControlError::corrupt(&format!("secret/{}", id), e))
    }

    fn delete_secret(&self, id: &str) -> Result<()> {
        let path = self.secret_path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted secret for credential {}", id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ControlError::SecretStore(format!(
                "failed to delete secret {}: {}",
                id, e
            ))),
        }
    }
}

/// In-memory vault for testing
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Mock vault with failure injection
    #[derive(Clone, Default)]
    pub struct MemorySecretVault {
        secrets: Arc<Mutex<HashMap<String, SecretsMap>>>,
        /// Whether put_secret should fail
        pub should_fail_put: Arc<Mutex<bool>>,
        /// Ids passed to delete_secret, in call order
        pub deleted: Arc<Mutex<Vec<String>>>,
    }

    impl MemorySecretVault {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure put_secret to fail
        pub fn with_failing_put(self) -> Self {
            *self.should_fail_put.lock() = true;
            self
        }

        pub fn contains(&self, id: &str) -> bool {
            self.secrets.lock().contains_key(id)
        }

        pub fn len(&self) -> usize {
            self.secrets.lock().len()
        }

        pub fn is_empty(&self) -> bool {
            self.secrets.lock().is_empty()
        }

        pub fn deleted_ids(&self) -> Vec<String> {
            self.deleted.lock().clone()
        }
    }

    impl SecretVault for MemorySecretVault {
        fn put_secret(&self, id: &str, secret: &SecretsMap) -> Result<()> {
            if *self.should_fail_put.lock() {
                return Err(ControlError::SecretStore("mock vault failure".to_string()));
            }
            self.secrets.lock().insert(id.to_string(), secret.clone());
            Ok(())
        }

        fn get_secret(&self, id: &str) -> Result<Option<SecretsMap>> {
            Ok(self.secrets.lock().get(id).cloned())
        }

        fn delete_secret(&self, id: &str) -> Result<()> {
            self.deleted.lock().push(id.to_string());
            self.secrets.lock().remove(id);
            Ok(())
        }
    }
}
