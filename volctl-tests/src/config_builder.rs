//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use volctl::config::{Config, CredentialsConfig, DriverConfig, DriverKind, GlobalConfig};
use volctl::creds::OrphanPolicy;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    global: GlobalConfig,
    credentials: CredentialsConfig,
    drivers: HashMap<String, DriverConfig>,
    default_driver: Option<String>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with no drivers
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let data_dir = temp_dir.path().join("data");
        fs::create_dir_all(&data_dir).expect("Failed to create data_dir");

        let log_directory = temp_dir.path().join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log_directory");

        let global = GlobalConfig {
            data_dir,
            node_id: "test-node".to_string(),
            log_directory,
            log_level: "debug".to_string(),
            log_max_files: 5,
            log_max_size_mb: 10,
        };

        Self {
            temp_dir,
            global,
            credentials: CredentialsConfig {
                lock_timeout_ms: 2_000,
                orphan_policy: OrphanPolicy::Retain,
            },
            drivers: HashMap::new(),
            default_driver: None,
        }
    }

    /// A base `pxd` driver that declines everything plus a `pxd-sched`
    /// scheduler driver, with `pxd` as the default
    pub fn standard() -> Self {
        Self::new()
            .add_driver("pxd", DriverKind::Null)
            .add_driver("pxd-sched", DriverKind::KvBackup)
            .with_default_driver("pxd")
    }

    pub fn with_node_id(mut self, node_id: &str) -> Self {
        self.global.node_id = node_id.to_string();
        self
    }

    pub fn with_lock_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.credentials.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.credentials.orphan_policy = policy;
        self
    }

    /// Point the data directory somewhere else, e.g. to share it between nodes
    pub fn with_data_dir(mut self, path: &Path) -> Self {
        self.global.data_dir = path.to_path_buf();
        self
    }

    pub fn with_default_driver(mut self, name: &str) -> Self {
        self.default_driver = Some(name.to_string());
        self
    }

    pub fn add_driver(mut self, name: &str, kind: DriverKind) -> Self {
        self.drivers
            .insert(name.to_string(), DriverConfig { kind, enabled: true });
        self
    }

    pub fn add_disabled_driver(mut self, name: &str, kind: DriverKind) -> Self {
        self.drivers
            .insert(name.to_string(), DriverConfig { kind, enabled: false });
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn data_dir(&self) -> &Path {
        &self.global.data_dir
    }

    /// Build the Config
    pub fn build(self) -> Config {
        self.persist().0
    }

    /// Keep the temp directory alive alongside the config
    pub fn persist(self) -> (Config, TempDir) {
        let config = Config {
            default_driver: self.default_driver,
            global: self.global,
            credentials: self.credentials,
            drivers: self.drivers,
        };
        (config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a config to TOML at `path`
pub fn write_config(config: &Config, path: &Path) -> PathBuf {
    let toml_str = toml::to_string_pretty(config).expect("Failed to serialize config");
    fs::write(path, toml_str).expect("Failed to write config");
    path.to_path_buf()
}
