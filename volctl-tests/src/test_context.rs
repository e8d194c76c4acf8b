//! Test context and harness
//!
//! Owns a temp directory holding the config, the document store and the
//! secret vault, and builds control planes over them.

use crate::config_builder::{write_config, ConfigBuilder};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use volctl::api::ControlPlane;
use volctl::config::Config;
use volctl::drivers::{BackupStatus, KvBackupDriver};
use volctl::managers::schedules::RequestContext;
use volctl::store::FileDocumentStore;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// The test configuration
    config: Config,
}

impl TestContext {
    /// Create a test context with the standard driver set
    pub fn new() -> Self {
        Self::from_builder(ConfigBuilder::standard())
    }

    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();
        Self { temp_dir, config }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build a fresh control plane over the context's data directory
    ///
    /// Planes built from the same context share state the way two processes
    /// on one node would.
    pub fn plane(&self) -> ControlPlane {
        ControlPlane::from_config(&self.config).expect("Failed to build control plane")
    }

    /// Request context for the default driver
    pub fn request(&self) -> RequestContext {
        RequestContext::new(self.config.default_driver.clone().unwrap_or_default())
    }

    /// Record backup progress on the `pxd-sched` driver the way its
    /// execution path would
    pub fn record_backup(&self, id: &str, status: BackupStatus) {
        let kv = Arc::new(FileDocumentStore::new(self.config.global.document_root()));
        KvBackupDriver::new("pxd-sched", self.config.global.node_id.clone(), kv)
            .record_status(id, status)
            .expect("Failed to record backup status");
    }

    /// Write the config as TOML and return its path
    pub fn write_config(&self) -> PathBuf {
        write_config(&self.config, &self.temp_dir.path().join("volctl.toml"))
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Read a file under the data directory
    pub fn read_data_file(&self, relative: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.config.global.data_dir.join(relative))?)
    }

    /// Number of secrets in the file vault
    pub fn vault_entries(&self) -> usize {
        std::fs::read_dir(self.config.global.secrets_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
                    .count()
            })
            .unwrap_or(0)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
