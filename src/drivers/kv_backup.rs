//! Backup driver keeping schedules and the status cache in the shared
//! document store

use super::{
    BackupDriver, BackupOp, BackupSchedule, BackupState, BackupStatus, CloudSnapInfo, VolumeDriver,
};
use crate::error::{ControlError, Result};
use crate::store::DocumentStore;
use crate::utils::cron::validate_cron_schedule;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// State change vocabulary understood by this driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRequest {
    Pause,
    Resume,
    Stop,
}

impl StateRequest {
    /// State reached from `current`, or `None` when not reachable
    pub fn apply(self, current: BackupState) -> Option<BackupState> {
        match (self, current) {
            (StateRequest::Pause, BackupState::Active) => Some(BackupState::Paused),
            (StateRequest::Resume, BackupState::Paused) => Some(BackupState::Active),
            (StateRequest::Stop, BackupState::Active | BackupState::Paused) => {
                Some(BackupState::Stopped)
            }
            _ => None,
        }
    }
}

impl FromStr for StateRequest {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pause" => Ok(StateRequest::Pause),
            "resume" => Ok(StateRequest::Resume),
            "stop" | "cancel" => Ok(StateRequest::Stop),
            other => Err(ControlError::InvalidArgument(format!(
                "unknown backup state request '{}' (expected pause, resume or stop)",
                other
            ))),
        }
    }
}

/// Driver implementing only the backup capability group
pub struct KvBackupDriver {
    name: String,
    node_id: String,
    kv: Arc<dyn DocumentStore>,
    lock_timeout: Duration,
}

impl KvBackupDriver {
    pub fn new(name: impl Into<String>, node_id: impl Into<String>, kv: Arc<dyn DocumentStore>) -> Self {
        Self {
            name: name.into(),
            node_id: node_id.into(),
            kv,
            lock_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    fn schedules_key(&self) -> String {
        format!("{}/cloudsnap-schedules", self.name)
    }

    fn status_key(&self) -> String {
        format!("{}/cloudsnap-status", self.name)
    }

    fn lock_key(&self) -> String {
        format!("/{}/cloudsnap/lock", self.name)
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.kv.get(key)? {
            Some(pair) => serde_json::from_str(&pair.value).map_err(|e| ControlError::corrupt(key, e)),
            None => Ok(T::default()),
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)
            .map_err(|e| ControlError::Store(format!("failed to encode '{}': {}", key, e)))?;
        self.kv.put(key, &encoded)?;
        Ok(())
    }

    /// Read-modify-write of one document under the driver lock
    fn mutate<T, R>(&self, key: &str, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let _lock = self.kv.lock(&self.lock_key(), self.lock_timeout)?;
        let mut doc: T = self.read(key)?;
        let result = f(&mut doc)?;
        self.write(key, &doc)?;
        Ok(result)
    }

    /// Record progress for a backup; called by the backup execution path
    pub fn record_status(&self, key: &str, status: BackupStatus) -> Result<()> {
        let status_key = self.status_key();
        self.mutate(&status_key, |cache: &mut BTreeMap<String, BackupStatus>| {
            cache.insert(key.to_string(), status);
            Ok(())
        })
    }

    /// Most recent status entry for a volume
    fn latest_for<'a>(
        cache: &'a mut BTreeMap<String, BackupStatus>,
        volume_id: &str,
    ) -> Option<(&'a String, &'a mut BackupStatus)> {
        cache
            .iter_mut()
            .filter(|(_, status)| status.volume_id == volume_id && status.op == BackupOp::Backup)
            .max_by_key(|(_, status)| status.start_time)
    }
}

/// Recorded backup `id`, held under `credential_id` when one is given
fn find_backup<'a>(
    cache: &'a BTreeMap<String, BackupStatus>,
    id: &str,
    credential_id: &str,
) -> Result<&'a BackupStatus> {
    cache
        .get(id)
        .filter(|status| status.op == BackupOp::Backup)
        .filter(|status| credential_id.is_empty() || status.credential_id == credential_id)
        .ok_or_else(|| ControlError::NotFound(format!("cloud backup {}", id)))
}

fn snap_info(id: &str, status: &BackupStatus) -> CloudSnapInfo {
    CloudSnapInfo {
        id: id.to_string(),
        src_volume_id: status.volume_id.clone(),
        timestamp: status.start_time,
        status: status.status,
        credential_id: status.credential_id.clone(),
        node_id: status.node_id.clone(),
        full: status.full,
    }
}

fn validate_schedule(schedule: &BackupSchedule) -> Result<()> {
    if !validate_cron_schedule(&schedule.schedule) {
        return Err(ControlError::InvalidArgument(format!(
            "invalid cron schedule '{}' (expected 5 fields)",
            schedule.schedule
        )));
    }
    if schedule.credential_id.trim().is_empty() {
        return Err(ControlError::InvalidArgument(
            "credential id must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl VolumeDriver for KvBackupDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn backup(&self) -> &dyn BackupDriver {
        self
    }
}

impl BackupDriver for KvBackupDriver {
    fn cloud_backup(&self, volume_id: &str, credential_id: &str, full: bool) -> Result<()> {
        if volume_id.trim().is_empty() {
            return Err(ControlError::InvalidArgument("volume id must not be empty".to_string()));
        }

        let status_key = self.status_key();
        let node_id = self.node_id.clone();
        let key = self.mutate(&status_key, |cache: &mut BTreeMap<String, BackupStatus>| {
            if let Some((_, current)) = Self::latest_for(cache, volume_id) {
                if !current.status.is_terminal() {
                    return Err(ControlError::invalid_transition(
                        current.status.as_str(),
                        BackupState::Active.as_str(),
                    ));
                }
            }

            let key = format!("{}-{}", volume_id, Uuid::new_v4());
            cache.insert(
                key.clone(),
                BackupStatus {
                    volume_id: volume_id.to_string(),
                    op: BackupOp::Backup,
                    status: BackupState::Active,
                    bytes_done: 0,
                    start_time: Utc::now(),
                    completed_time: None,
                    node_id,
                    credential_id: credential_id.to_string(),
                    full,
                },
            );
            Ok(key)
        })?;

        info!("Started cloud backup {} for volume {}", key, volume_id);
        Ok(())
    }

    fn cloud_backup_status(
        &self,
        volume_id: &str,
        local: bool,
    ) -> Result<BTreeMap<String, BackupStatus>> {
        let cache: BTreeMap<String, BackupStatus> = self.read(&self.status_key())?;

        Ok(cache
            .into_iter()
            .filter(|(_, status)| volume_id.is_empty() || status.volume_id == volume_id)
            .filter(|(_, status)| !local || status.node_id == self.node_id)
            .collect())
    }

    fn change_backup_state(&self, volume_id: &str, requested_state: &str) -> Result<()> {
        let request: StateRequest = requested_state.parse()?;
        let status_key = self.status_key();

        self.mutate(&status_key, |cache: &mut BTreeMap<String, BackupStatus>| {
            let (key, status) = Self::latest_for(cache, volume_id)
                .ok_or_else(|| ControlError::NotFound(format!("no backup for volume {}", volume_id)))?;

            let next = request.apply(status.status).ok_or_else(|| {
                ControlError::invalid_transition(status.status.as_str(), requested_state)
            })?;

            debug!("Backup {} moving from {} to {}", key, status.status, next);
            status.status = next;
            if next.is_terminal() {
                status.completed_time = Some(Utc::now());
            }
            Ok(())
        })?;

        info!("Changed backup state of volume {} ({})", volume_id, requested_state);
        Ok(())
    }

    fn create_backup_schedule(&self, schedule: BackupSchedule) -> Result<String> {
        if schedule.volume_id.trim().is_empty() {
            return Err(ControlError::InvalidArgument("volume id must not be empty".to_string()));
        }
        validate_schedule(&schedule)?;

        let key = self.schedules_key();
        let volume_id = schedule.volume_id.clone();
        let id = self.mutate(&key, |schedules: &mut BTreeMap<String, BackupSchedule>| {
            let mut id = Uuid::new_v4().to_string();
            while schedules.contains_key(&id) {
                id = Uuid::new_v4().to_string();
            }
            schedules.insert(id.clone(), schedule);
            Ok(id)
        })?;

        info!("Created backup schedule {} for volume {}", id, volume_id);
        Ok(id)
    }

    fn update_backup_schedule(&self, id: &str, schedule: BackupSchedule) -> Result<()> {
        validate_schedule(&schedule)?;

        let key = self.schedules_key();
        self.mutate(&key, |schedules: &mut BTreeMap<String, BackupSchedule>| {
            let existing = schedules
                .get_mut(id)
                .ok_or_else(|| ControlError::NotFound(format!("backup schedule {}", id)))?;

            existing.schedule = schedule.schedule;
            existing.credential_id = schedule.credential_id;
            existing.max_backups = schedule.max_backups;
            Ok(())
        })?;

        info!("Updated backup schedule {}", id);
        Ok(())
    }

    fn list_backup_schedules(&self) -> Result<BTreeMap<String, BackupSchedule>> {
        self.read(&self.schedules_key())
    }

    fn delete_backup_schedule(&self, id: &str) -> Result<()> {
        let key = self.schedules_key();
        let removed = self.mutate(&key, |schedules: &mut BTreeMap<String, BackupSchedule>| {
            Ok(schedules.remove(id).is_some())
        })?;

        if removed {
            info!("Deleted backup schedule {}", id);
        } else {
            debug!("Backup schedule {} not present, nothing to delete", id);
        }
        Ok(())
    }

    fn cloud_backup_catalog(&self, cloud_volume_id: &str, credential_id: &str) -> Result<Vec<String>> {
        let cache: BTreeMap<String, BackupStatus> = self.read(&self.status_key())?;
        let target = find_backup(&cache, cloud_volume_id, credential_id)?;

        let mut chain: Vec<(&String, &BackupStatus)> = cache
            .iter()
            .filter(|(_, status)| {
                status.op == BackupOp::Backup
                    && status.volume_id == target.volume_id
                    && status.credential_id == target.credential_id
                    && status.start_time <= target.start_time
            })
            .filter(|(id, status)| id.as_str() == cloud_volume_id || status.status == BackupState::Done)
            .collect();
        chain.sort_by_key(|(_, status)| status.start_time);

        // An incremental backup needs everything since the last full one
        let base = chain.iter().rposition(|(_, status)| status.full).unwrap_or(0);
        Ok(chain[base..].iter().map(|(id, _)| id.to_string()).collect())
    }

    fn cloud_backup_metadata(
        &self,
        cloud_volume_id: &str,
        credential_id: &str,
    ) -> Result<BTreeMap<String, String>> {
        let cache: BTreeMap<String, BackupStatus> = self.read(&self.status_key())?;
        let backup = find_backup(&cache, cloud_volume_id, credential_id)?;

        let mut meta = BTreeMap::new();
        meta.insert("volume".to_string(), backup.volume_id.clone());
        meta.insert("credential_id".to_string(), backup.credential_id.clone());
        meta.insert("node_id".to_string(), backup.node_id.clone());
        meta.insert("status".to_string(), backup.status.to_string());
        meta.insert("full".to_string(), backup.full.to_string());
        meta.insert("bytes_done".to_string(), backup.bytes_done.to_string());
        meta.insert("start_time".to_string(), backup.start_time.to_rfc3339());
        if let Some(completed) = backup.completed_time {
            meta.insert("completed_time".to_string(), completed.to_rfc3339());
        }
        Ok(meta)
    }

    fn cloud_restore(
        &self,
        dest_volume_id: &str,
        cloud_volume_id: &str,
        credential_id: &str,
        node_id: &str,
    ) -> Result<String> {
        if dest_volume_id.trim().is_empty() {
            return Err(ControlError::InvalidArgument(
                "destination volume id must not be empty".to_string(),
            ));
        }

        let status_key = self.status_key();
        let node_id = if node_id.is_empty() { self.node_id.as_str() } else { node_id };
        self.mutate(&status_key, |cache: &mut BTreeMap<String, BackupStatus>| {
            let source = find_backup(cache, cloud_volume_id, credential_id)?;
            if source.status != BackupState::Done {
                return Err(ControlError::InvalidArgument(format!(
                    "cloud backup {} is {} and cannot be restored",
                    cloud_volume_id, source.status
                )));
            }
            let credential_id = source.credential_id.clone();

            let in_flight = cache.values().find(|status| {
                status.op == BackupOp::Restore
                    && status.volume_id == dest_volume_id
                    && !status.status.is_terminal()
            });
            if let Some(current) = in_flight {
                return Err(ControlError::invalid_transition(
                    current.status.as_str(),
                    BackupState::Active.as_str(),
                ));
            }

            cache.insert(
                format!("{}-restore-{}", dest_volume_id, Uuid::new_v4()),
                BackupStatus {
                    volume_id: dest_volume_id.to_string(),
                    op: BackupOp::Restore,
                    status: BackupState::Active,
                    bytes_done: 0,
                    start_time: Utc::now(),
                    completed_time: None,
                    node_id: node_id.to_string(),
                    credential_id,
                    full: true,
                },
            );
            Ok(())
        })?;

        info!("Restoring cloud backup {} into volume {}", cloud_volume_id, dest_volume_id);
        Ok(dest_volume_id.to_string())
    }

    fn list_cloud_snaps(
        &self,
        src_volume_id: &str,
        credential_id: &str,
        all: bool,
    ) -> Result<Vec<CloudSnapInfo>> {
        let cache: BTreeMap<String, BackupStatus> = self.read(&self.status_key())?;

        let mut snaps: Vec<CloudSnapInfo> = cache
            .iter()
            .filter(|(_, status)| status.op == BackupOp::Backup)
            .filter(|(_, status)| src_volume_id.is_empty() || status.volume_id == src_volume_id)
            .filter(|(_, status)| credential_id.is_empty() || status.credential_id == credential_id)
            .map(|(id, status)| snap_info(id, status))
            .collect();

        if !all {
            let mut newest: BTreeMap<String, CloudSnapInfo> = BTreeMap::new();
            for snap in snaps {
                match newest.get(&snap.src_volume_id) {
                    Some(kept) if kept.timestamp >= snap.timestamp => {}
                    _ => {
                        newest.insert(snap.src_volume_id.clone(), snap);
                    }
                }
            }
            snaps = newest.into_values().collect();
        }

        snaps.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(snaps)
    }

    fn delete_cloud_snaps(&self, src_volume_id: &str, credential_id: &str) -> Result<()> {
        if src_volume_id.trim().is_empty() {
            return Err(ControlError::InvalidArgument("volume id must not be empty".to_string()));
        }

        let status_key = self.status_key();
        let removed = self.mutate(&status_key, |cache: &mut BTreeMap<String, BackupStatus>| {
            let targeted = |status: &BackupStatus| {
                status.op == BackupOp::Backup
                    && status.volume_id == src_volume_id
                    && (credential_id.is_empty() || status.credential_id == credential_id)
            };

            if let Some(current) = cache
                .values()
                .find(|&status| targeted(status) && !status.status.is_terminal())
            {
                return Err(ControlError::invalid_transition(current.status.as_str(), "deleted"));
            }

            let before = cache.len();
            cache.retain(|_, status| !targeted(&*status));
            Ok(before - cache.len())
        })?;

        info!("Deleted {} cloud backup(s) of volume {}", removed, src_volume_id);
        Ok(())
    }
}
