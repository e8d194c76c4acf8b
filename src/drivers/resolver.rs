use super::registry::{DriverHandle, DriverRegistry};
use crate::error::{ControlError, Result};
use std::sync::Arc;
use tracing::debug;

/// Suffix of the scheduler-flavored variant of a base driver
pub const SCHED_DRIVER_SUFFIX: &str = "-sched";

/// Extract the client name from a caller identity such as `"foo/1.2.0"`
pub fn caller_name(identity: &str) -> Option<&str> {
    identity
        .split('/')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Picks the driver instance that serves a request
///
/// Lookups go to the registry on every call, so registrations made between
/// calls are observed immediately.
#[derive(Clone)]
pub struct DriverResolver {
    registry: Arc<DriverRegistry>,
}

impl DriverResolver {
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<DriverRegistry> {
        &self.registry
    }

    /// Resolve a driver, first match wins:
    ///
    /// 1. the driver named by the caller identity
    /// 2. `requested_name` + [`SCHED_DRIVER_SUFFIX`]
    /// 3. `requested_name`
    pub fn resolve(&self, requested_name: &str, caller_identity: Option<&str>) -> Result<DriverHandle> {
        let mut tried = Vec::with_capacity(3);

        if let Some(client) = caller_identity.and_then(caller_name) {
            if let Ok(driver) = self.registry.get(client) {
                debug!("Resolved driver '{}' from caller identity", client);
                return Ok(driver);
            }
            tried.push(client.to_string());
        }

        let sched_name = format!("{}{}", requested_name, SCHED_DRIVER_SUFFIX);
        if let Ok(driver) = self.registry.get(&sched_name) {
            debug!("Resolved scheduler driver '{}'", sched_name);
            return Ok(driver);
        }
        tried.push(sched_name);

        match self.registry.get(requested_name) {
            Ok(driver) => {
                debug!("Resolved driver '{}'", requested_name);
                Ok(driver)
            }
            Err(_) => {
                tried.push(requested_name.to_string());
                Err(ControlError::DriverNotFound(tried.join(", ")))
            }
        }
    }
}
