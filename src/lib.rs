//! Volctl Library
//!
//! Control-plane pieces of a volume management service: cluster-wide cloud
//! credentials, driver resolution and the backup schedule lifecycle.

pub mod api;
pub mod config;
pub mod creds;
pub mod drivers;
pub mod error;
pub mod managers;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use api::{ApiResponse, ControlPlane};
pub use config::{load_config, Config};
pub use creds::{CredentialEntry, CredentialManager};
pub use drivers::{DriverRegistry, DriverResolver, VolumeDriver};
pub use error::{ControlError, Result};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::schedules::{RequestContext, ScheduleManager};
