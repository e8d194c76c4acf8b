//! Cloud-backup schedule lifecycle against the resolved driver

use crate::creds::CredentialManager;
use crate::drivers::{
    BackupSchedule, BackupStatus, Capability, CloudSnapInfo, DriverHandle, DriverResolver,
};
use crate::error::{ControlError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Which driver a request targets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Driver name the endpoint is mounted for
    pub driver: String,
    /// Client identity, e.g. a user agent such as `foo/1.0`
    pub caller_identity: Option<String>,
}

impl RequestContext {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            caller_identity: None,
        }
    }

    pub fn with_caller(mut self, identity: impl Into<String>) -> Self {
        self.caller_identity = Some(identity.into());
        self
    }
}

/// Parse the retention count of a schedule
///
/// Absent, empty and `0` all mean unbounded. Besides decimal, `0x`, `0o`
/// and `0b` prefixes are accepted, and a bare leading `0` means octal.
pub fn parse_max_backups(raw: Option<&str>) -> Result<Option<u64>> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    let value = parse_unsigned(raw).map_err(|e| {
        ControlError::InvalidArgument(format!("failed to parse max backups '{}': {}", raw, e))
    })?;

    Ok(if value == 0 { None } else { Some(value) })
}

fn parse_unsigned(raw: &str) -> std::result::Result<u64, std::num::ParseIntError> {
    let lower = raw.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };
    u64::from_str_radix(digits, radix)
}

/// Creates, updates, enumerates and deletes recurring cloud backups and
/// surfaces the driver's cached backup status
///
/// Every call resolves the driver afresh; schedule records belong to the
/// driver that created them. A request is checked in a fixed order: driver,
/// then backup capability, then credential, then arguments.
pub struct ScheduleManager {
    resolver: DriverResolver,
    credentials: Option<Arc<CredentialManager>>,
}

impl ScheduleManager {
    pub fn new(resolver: DriverResolver) -> Self {
        Self {
            resolver,
            credentials: None,
        }
    }

    /// Refuse requests naming a credential `creds` does not hold
    pub fn with_credentials(mut self, creds: Arc<CredentialManager>) -> Self {
        self.credentials = Some(creds);
        self
    }

    pub fn resolver(&self) -> &DriverResolver {
        &self.resolver
    }

    /// Resolve the driver and make sure it implements the backup group
    pub fn backup_driver(&self, ctx: &RequestContext) -> Result<DriverHandle> {
        let driver = self
            .resolver
            .resolve(&ctx.driver, ctx.caller_identity.as_deref())?;
        debug!("Request for '{}' served by driver '{}'", ctx.driver, driver.name());

        if !driver.supports(Capability::Backup) {
            return Err(ControlError::NotSupported);
        }
        Ok(driver)
    }

    fn require_credential(&self, credential_id: &str) -> Result<()> {
        match &self.credentials {
            Some(creds) if !creds.contains(credential_id)? => {
                Err(ControlError::NotFound(format!("credential {}", credential_id)))
            }
            _ => Ok(()),
        }
    }

    /// Create a schedule, active immediately; returns its driver-generated id
    pub fn create_schedule(
        &self,
        ctx: &RequestContext,
        volume_id: &str,
        cron: &str,
        credential_id: &str,
        max_backups: Option<&str>,
    ) -> Result<String> {
        let driver = self.backup_driver(ctx)?;
        self.require_credential(credential_id)?;
        let max_backups = parse_max_backups(max_backups)?;

        let id = driver.backup().create_backup_schedule(BackupSchedule {
            volume_id: volume_id.to_string(),
            schedule: cron.to_string(),
            credential_id: credential_id.to_string(),
            max_backups,
        })?;

        info!("Backup schedule {} created on '{}'", id, driver.name());
        Ok(id)
    }

    /// Replace cron, credential and retention of an existing schedule
    pub fn update_schedule(
        &self,
        ctx: &RequestContext,
        schedule_id: &str,
        cron: &str,
        credential_id: &str,
        max_backups: Option<&str>,
    ) -> Result<()> {
        let driver = self.backup_driver(ctx)?;
        self.require_credential(credential_id)?;
        let max_backups = parse_max_backups(max_backups)?;

        // The owning volume is immutable; the driver keeps the stored one
        driver.backup().update_backup_schedule(
            schedule_id,
            BackupSchedule {
                volume_id: String::new(),
                schedule: cron.to_string(),
                credential_id: credential_id.to_string(),
                max_backups,
            },
        )
    }

    pub fn list_schedules(&self, ctx: &RequestContext) -> Result<BTreeMap<String, BackupSchedule>> {
        self.backup_driver(ctx)?.backup().list_backup_schedules()
    }

    /// Remove a schedule; unknown ids succeed
    pub fn delete_schedule(&self, ctx: &RequestContext, schedule_id: &str) -> Result<()> {
        self.backup_driver(ctx)?.backup().delete_backup_schedule(schedule_id)
    }

    /// Last observed backup status, never triggers new work
    pub fn cached_status(
        &self,
        ctx: &RequestContext,
        volume_id: &str,
        local: bool,
    ) -> Result<BTreeMap<String, BackupStatus>> {
        self.backup_driver(ctx)?.backup().cloud_backup_status(volume_id, local)
    }

    pub fn change_backup_state(
        &self,
        ctx: &RequestContext,
        volume_id: &str,
        requested_state: &str,
    ) -> Result<()> {
        self.backup_driver(ctx)?
            .backup()
            .change_backup_state(volume_id, requested_state)
    }

    /// Start a one-off backup
    pub fn cloud_backup(
        &self,
        ctx: &RequestContext,
        volume_id: &str,
        credential_id: &str,
        full: bool,
    ) -> Result<()> {
        let driver = self.backup_driver(ctx)?;
        self.require_credential(credential_id)?;
        driver.backup().cloud_backup(volume_id, credential_id, full)
    }

    pub fn backup_catalog(
        &self,
        ctx: &RequestContext,
        cloud_volume_id: &str,
        credential_id: &str,
    ) -> Result<Vec<String>> {
        let driver = self.backup_driver(ctx)?;
        self.require_credential(credential_id)?;
        driver.backup().cloud_backup_catalog(cloud_volume_id, credential_id)
    }

    pub fn backup_metadata(
        &self,
        ctx: &RequestContext,
        cloud_volume_id: &str,
        credential_id: &str,
    ) -> Result<BTreeMap<String, String>> {
        let driver = self.backup_driver(ctx)?;
        self.require_credential(credential_id)?;
        driver.backup().cloud_backup_metadata(cloud_volume_id, credential_id)
    }

    /// Restore a cloud backup into a volume, returning the restored volume id
    pub fn cloud_restore(
        &self,
        ctx: &RequestContext,
        dest_volume_id: &str,
        cloud_volume_id: &str,
        credential_id: &str,
        node_id: &str,
    ) -> Result<String> {
        let driver = self.backup_driver(ctx)?;
        self.require_credential(credential_id)?;
        let restored = driver
            .backup()
            .cloud_restore(dest_volume_id, cloud_volume_id, credential_id, node_id)?;
        info!("Restore of {} into {} started on '{}'", cloud_volume_id, restored, driver.name());
        Ok(restored)
    }

    /// Recorded backups; an empty credential id matches any credential
    pub fn list_cloud_snaps(
        &self,
        ctx: &RequestContext,
        src_volume_id: &str,
        credential_id: &str,
        all: bool,
    ) -> Result<Vec<CloudSnapInfo>> {
        let driver = self.backup_driver(ctx)?;
        if !credential_id.is_empty() {
            self.require_credential(credential_id)?;
        }
        driver.backup().list_cloud_snaps(src_volume_id, credential_id, all)
    }

    pub fn delete_cloud_snaps(
        &self,
        ctx: &RequestContext,
        src_volume_id: &str,
        credential_id: &str,
    ) -> Result<()> {
        let driver = self.backup_driver(ctx)?;
        self.require_credential(credential_id)?;
        driver.backup().delete_cloud_snaps(src_volume_id, credential_id)
    }
}
