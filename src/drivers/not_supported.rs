use super::{
    ActiveRequests, BackupDriver, BackupSchedule, BackupStatus, BlockDriver, CloudSnapInfo,
    IoDriver, SnapshotDriver, StatsDriver, VolumeStats,
};
use crate::error::{ControlError, Result};
use std::collections::{BTreeMap, HashMap};

/// Null implementation of every capability group
///
/// Drivers that do not want to implement a group return this from the
/// matching [`super::VolumeDriver`] accessor. All operations fail with
/// `ControlError::NotSupported`, except `active_requests` which reports
/// nothing in flight.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotSupported;

impl BlockDriver for NotSupported {
    fn is_supported(&self) -> bool {
        false
    }

    fn attach(&self, _volume_id: &str, _options: &HashMap<String, String>) -> Result<String> {
        Err(ControlError::NotSupported)
    }

    fn detach(&self, _volume_id: &str, _options: &HashMap<String, String>) -> Result<()> {
        Err(ControlError::NotSupported)
    }
}

impl SnapshotDriver for NotSupported {
    fn is_supported(&self) -> bool {
        false
    }

    fn snapshot(&self, _volume_id: &str, _readonly: bool, _name: Option<&str>) -> Result<String> {
        Err(ControlError::NotSupported)
    }

    fn restore(&self, _volume_id: &str, _snapshot_id: &str) -> Result<()> {
        Err(ControlError::NotSupported)
    }
}

impl IoDriver for NotSupported {
    fn is_supported(&self) -> bool {
        false
    }

    fn read(&self, _volume_id: &str, _buffer: &mut [u8], _offset: u64) -> Result<usize> {
        Err(ControlError::NotSupported)
    }

    fn write(&self, _volume_id: &str, _buffer: &[u8], _offset: u64) -> Result<usize> {
        Err(ControlError::NotSupported)
    }

    fn flush(&self, _volume_id: &str) -> Result<()> {
        Err(ControlError::NotSupported)
    }
}

impl StatsDriver for NotSupported {
    fn is_supported(&self) -> bool {
        false
    }

    fn stats(&self, _volume_id: &str, _cumulative: bool) -> Result<VolumeStats> {
        Err(ControlError::NotSupported)
    }

    fn used_size(&self, _volume_id: &str) -> Result<u64> {
        Err(ControlError::NotSupported)
    }

    fn active_requests(&self) -> Result<ActiveRequests> {
        Ok(ActiveRequests::default())
    }
}

impl BackupDriver for NotSupported {
    fn is_supported(&self) -> bool {
        false
    }

    fn cloud_backup(&self, _volume_id: &str, _credential_id: &str, _full: bool) -> Result<()> {
        Err(ControlError::NotSupported)
    }

    fn cloud_backup_status(
        &self,
        _volume_id: &str,
        _local: bool,
    ) -> Result<BTreeMap<String, BackupStatus>> {
        Err(ControlError::NotSupported)
    }

    fn change_backup_state(&self, _volume_id: &str, _requested_state: &str) -> Result<()> {
        Err(ControlError::NotSupported)
    }

    fn create_backup_schedule(&self, _schedule: BackupSchedule) -> Result<String> {
        Err(ControlError::NotSupported)
    }

    fn update_backup_schedule(&self, _id: &str, _schedule: BackupSchedule) -> Result<()> {
        Err(ControlError::NotSupported)
    }

    fn list_backup_schedules(&self) -> Result<BTreeMap<String, BackupSchedule>> {
        Err(ControlError::NotSupported)
    }

    fn delete_backup_schedule(&self, _id: &str) -> Result<()> {
        Err(ControlError::NotSupported)
    }

    fn cloud_backup_catalog(&self, _cloud_volume_id: &str, _credential_id: &str) -> Result<Vec<String>> {
        Err(ControlError::NotSupported)
    }

    fn cloud_backup_metadata(
        &self,
        _cloud_volume_id: &str,
        _credential_id: &str,
    ) -> Result<BTreeMap<String, String>> {
        Err(ControlError::NotSupported)
    }

    fn cloud_restore(
        &self,
        _dest_volume_id: &str,
        _cloud_volume_id: &str,
        _credential_id: &str,
        _node_id: &str,
    ) -> Result<String> {
        Err(ControlError::NotSupported)
    }

    fn list_cloud_snaps(
        &self,
        _src_volume_id: &str,
        _credential_id: &str,
        _all: bool,
    ) -> Result<Vec<CloudSnapInfo>> {
        Err(ControlError::NotSupported)
    }

    fn delete_cloud_snaps(&self, _src_volume_id: &str, _credential_id: &str) -> Result<()> {
        Err(ControlError::NotSupported)
    }
}
