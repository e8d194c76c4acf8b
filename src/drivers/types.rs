use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A recurring cloud-backup job bound to a volume and a credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSchedule {
    /// Owning volume; immutable once the schedule exists
    pub volume_id: String,
    /// Five-field cron expression
    pub schedule: String,
    /// Credential used to reach the cloud store
    pub credential_id: String,
    /// Number of backups to retain, `None` for unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backups: Option<u64>,
}

/// Kind of cloud transfer a status entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupOp {
    Backup,
    Restore,
}

/// Operational state of a cloud transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupState {
    NotStarted,
    Active,
    Paused,
    Stopped,
    Done,
    Failed,
}

impl BackupState {
    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Done | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "notstarted",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last observed progress of a backup or restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupStatus {
    pub volume_id: String,
    pub op: BackupOp,
    pub status: BackupState,
    pub bytes_done: u64,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_time: Option<DateTime<Utc>>,
    /// Node that computed this status
    pub node_id: String,
    #[serde(default)]
    pub credential_id: String,
    #[serde(default)]
    pub full: bool,
}

/// A backup held in the cloud store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudSnapInfo {
    /// Cloud volume id, the handle for restore, catalog and metadata
    pub id: String,
    pub src_volume_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: BackupState,
    pub credential_id: String,
    pub node_id: String,
    pub full: bool,
}

/// Per-volume I/O counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeStats {
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub write_bytes: u64,
    pub io_progress: u64,
}

/// In-flight request counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRequests {
    pub requests: Vec<String>,
}
