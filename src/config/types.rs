use crate::creds::OrphanPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Driver name requests resolve against when none is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_driver: Option<String>,
    pub global: GlobalConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub drivers: HashMap<String, DriverConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Root of the document store and secret vault
    pub data_dir: PathBuf,

    /// Identity of this node in backup status records
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Logging configuration
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
    #[serde(default = "default_log_max_size_mb")]
    pub log_max_size_mb: u64,
}

impl GlobalConfig {
    /// Root of the document store; documents go to `kv/`, locks to `locks/`
    pub fn document_root(&self) -> PathBuf {
        super::expand_tilde(&self.data_dir)
    }

    pub fn secrets_dir(&self) -> PathBuf {
        super::expand_tilde(&self.data_dir).join("secrets")
    }
}

/// Credential manager settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    /// How long an operation waits for the credential lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    #[serde(default)]
    pub orphan_policy: OrphanPolicy,
}

impl CredentialsConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            orphan_policy: OrphanPolicy::default(),
        }
    }
}

/// Driver instance configuration, keyed by driver name
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriverConfig {
    pub kind: DriverKind,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// Schedules and status kept in the document store
    KvBackup,
    /// Declines every capability group
    Null,
}

// Default value functions

fn default_node_id() -> String { "local".to_string() }
fn default_log_directory() -> PathBuf { PathBuf::from("~/logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_log_max_size_mb() -> u64 { 10 }
fn default_lock_timeout_ms() -> u64 { 10_000 }
fn default_enabled() -> bool { true }
