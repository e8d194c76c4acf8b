//! Volume driver capability surface
//!
//! A driver's operations are split into capability groups, one trait per
//! group. A driver implements the groups it supports and leaves the others
//! to the shared [`NotSupported`] stand-in, so every driver exposes the same
//! surface and callers get a uniform `ControlError::NotSupported` for
//! declined groups.
//!
//! ```no_run
//! use volctl::drivers::{BackupDriver, VolumeDriver};
//! # fn example(driver: &dyn VolumeDriver) -> volctl::error::Result<()> {
//! let schedules = driver.backup().list_backup_schedules()?;
//! println!("{} schedules on {}", schedules.len(), driver.name());
//! # Ok(())
//! # }
//! ```

mod kv_backup;
mod not_supported;
mod null;
mod registry;
mod resolver;
mod types;

pub use kv_backup::{KvBackupDriver, StateRequest};
pub use not_supported::NotSupported;
pub use null::NullDriver;
pub use registry::{DriverHandle, DriverRegistry};
pub use resolver::{caller_name, DriverResolver, SCHED_DRIVER_SUFFIX};
pub use types::*;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Capability groups a driver may implement or decline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Block,
    Snapshot,
    Io,
    Stats,
    Backup,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Block,
        Capability::Snapshot,
        Capability::Io,
        Capability::Stats,
        Capability::Backup,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Block => "block",
            Capability::Snapshot => "snapshot",
            Capability::Io => "io",
            Capability::Stats => "stats",
            Capability::Backup => "backup",
        };
        f.write_str(name)
    }
}

/// Attach/detach of block devices
pub trait BlockDriver: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }

    /// Attach a volume, returning the device path
    fn attach(&self, volume_id: &str, options: &HashMap<String, String>) -> Result<String>;

    fn detach(&self, volume_id: &str, options: &HashMap<String, String>) -> Result<()>;
}

/// Local point-in-time snapshots
pub trait SnapshotDriver: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }

    /// Take a snapshot, returning its volume id
    fn snapshot(&self, volume_id: &str, readonly: bool, name: Option<&str>) -> Result<String>;

    fn restore(&self, volume_id: &str, snapshot_id: &str) -> Result<()>;
}

/// Raw volume I/O
pub trait IoDriver: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }

    fn read(&self, volume_id: &str, buffer: &mut [u8], offset: u64) -> Result<usize>;

    fn write(&self, volume_id: &str, buffer: &[u8], offset: u64) -> Result<usize>;

    fn flush(&self, volume_id: &str) -> Result<()>;
}

/// Usage statistics
pub trait StatsDriver: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }

    fn stats(&self, volume_id: &str, cumulative: bool) -> Result<VolumeStats>;

    /// Allocated size in bytes
    fn used_size(&self, volume_id: &str) -> Result<u64>;

    fn active_requests(&self) -> Result<ActiveRequests>;
}

/// Cloud backups and their schedules
pub trait BackupDriver: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }

    /// Start a backup of `volume_id` to the cloud store behind `credential_id`
    fn cloud_backup(&self, volume_id: &str, credential_id: &str, full: bool) -> Result<()>;

    /// Cached status of backups for a volume (all volumes when empty)
    ///
    /// Never triggers new work; may be stale or empty.
    fn cloud_backup_status(
        &self,
        volume_id: &str,
        local: bool,
    ) -> Result<BTreeMap<String, BackupStatus>>;

    /// Move an in-flight backup to `requested_state` (driver vocabulary)
    fn change_backup_state(&self, volume_id: &str, requested_state: &str) -> Result<()>;

    /// Persist a new schedule, returning its generated id
    fn create_backup_schedule(&self, schedule: BackupSchedule) -> Result<String>;

    /// Replace the mutable fields of an existing schedule
    fn update_backup_schedule(&self, id: &str, schedule: BackupSchedule) -> Result<()>;

    fn list_backup_schedules(&self) -> Result<BTreeMap<String, BackupSchedule>>;

    /// Remove a schedule; unknown ids are not an error
    fn delete_backup_schedule(&self, id: &str) -> Result<()>;

    /// Backups a restore of `cloud_volume_id` reads, oldest first
    fn cloud_backup_catalog(&self, cloud_volume_id: &str, credential_id: &str)
        -> Result<Vec<String>>;

    fn cloud_backup_metadata(
        &self,
        cloud_volume_id: &str,
        credential_id: &str,
    ) -> Result<BTreeMap<String, String>>;

    /// Restore a cloud backup into `dest_volume_id`, returning the restored
    /// volume id; an empty `node_id` means this node
    fn cloud_restore(
        &self,
        dest_volume_id: &str,
        cloud_volume_id: &str,
        credential_id: &str,
        node_id: &str,
    ) -> Result<String>;

    /// Backups of `src_volume_id` (every volume when empty); without `all`
    /// only the newest per volume
    fn list_cloud_snaps(
        &self,
        src_volume_id: &str,
        credential_id: &str,
        all: bool,
    ) -> Result<Vec<CloudSnapInfo>>;

    /// Remove the finished backups of a volume held under `credential_id`
    fn delete_cloud_snaps(&self, src_volume_id: &str, credential_id: &str) -> Result<()>;
}

/// A named driver composed of capability groups
///
/// Every accessor defaults to [`NotSupported`]; drivers override the ones
/// they implement.
pub trait VolumeDriver: Send + Sync {
    fn name(&self) -> &str;

    fn block(&self) -> &dyn BlockDriver {
        &NotSupported
    }

    fn snapshots(&self) -> &dyn SnapshotDriver {
        &NotSupported
    }

    fn io(&self) -> &dyn IoDriver {
        &NotSupported
    }

    fn statistics(&self) -> &dyn StatsDriver {
        &NotSupported
    }

    fn backup(&self) -> &dyn BackupDriver {
        &NotSupported
    }

    /// Groups this driver implements
    fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.supports(*cap))
            .collect()
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Block => self.block().is_supported(),
            Capability::Snapshot => self.snapshots().is_supported(),
            Capability::Io => self.io().is_supported(),
            Capability::Stats => self.statistics().is_supported(),
            Capability::Backup => self.backup().is_supported(),
        }
    }
}

impl fmt::Debug for dyn VolumeDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolumeDriver")
            .field("name", &self.name())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
