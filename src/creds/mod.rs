//! Cloud credential management
//!
//! A credential is split in two halves that are never stored together:
//! the non-secret metadata (provider, endpoint, region, ...) lives in one
//! cluster-wide document, and the secret material lives in the secret vault
//! under the same generated id.

mod database;
mod manager;

pub use database::{read_credential_info, write_credential_info, CREDENTIALS_DB_KEY};
pub use manager::{CredentialManager, OrphanPolicy, CRED_LOCK_KEY, DEFAULT_LOCK_TIMEOUT};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const API_VERSION: &str = "v1";

/// Descriptive, non-sensitive credential fields
pub type NonSecretsMap = BTreeMap<String, serde_json::Value>;

/// Sensitive credential fields (access keys, passwords)
pub type SecretsMap = BTreeMap<String, serde_json::Value>;

/// Input/output shape for a single credential
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialEntry {
    #[serde(rename = "NonSecretsMap", default)]
    pub non_secrets: NonSecretsMap,
    #[serde(rename = "SecretsMap", default)]
    pub secrets: SecretsMap,
}

impl CredentialEntry {
    pub fn new(non_secrets: NonSecretsMap, secrets: SecretsMap) -> Self {
        Self {
            non_secrets,
            secrets,
        }
    }
}

/// The shared metadata document: credential id -> metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialInfo {
    #[serde(rename = "Credentials", default)]
    pub credentials: BTreeMap<String, NonSecretsMap>,
}
