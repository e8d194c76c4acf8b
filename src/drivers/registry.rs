use super::VolumeDriver;
use crate::error::{ControlError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Shared handle to a registered driver
pub type DriverHandle = Arc<dyn VolumeDriver>;

/// Name -> driver instance lookup
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, DriverHandle>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its own name
    pub fn register(&self, driver: DriverHandle) -> Result<()> {
        let name = driver.name().to_string();
        if name.is_empty() || name.contains('/') {
            return Err(ControlError::InvalidArgument(format!(
                "invalid driver name '{}'",
                name
            )));
        }

        let mut drivers = self.drivers.write();
        if drivers.contains_key(&name) {
            return Err(ControlError::InvalidArgument(format!(
                "driver '{}' is already registered",
                name
            )));
        }

        info!(
            "Registered driver '{}' (capabilities: {:?})",
            name,
            driver.capabilities()
        );
        drivers.insert(name, driver);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Option<DriverHandle> {
        let removed = self.drivers.write().remove(name);
        if removed.is_some() {
            info!("Unregistered driver '{}'", name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Result<DriverHandle> {
        self.drivers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ControlError::DriverNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.drivers.read().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.read().keys().cloned().collect();
        names.sort();
        names
    }
}
