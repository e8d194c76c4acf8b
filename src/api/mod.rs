//! Control-plane entry points
//!
//! [`ControlPlane`] is the context every request handler shares: the
//! credential manager, the driver registry and the schedule lifecycle.
//! Each method maps to one route of [`routes()`] and returns a structured
//! [`ApiResponse`].
//!
//! ```no_run
//! use volctl::api::ControlPlane;
//! use volctl::managers::schedules::RequestContext;
//!
//! let config = volctl::config::load_config("volctl.toml")?;
//! let plane = ControlPlane::from_config(&config)?;
//! let response = plane.list_schedules(&RequestContext::new("pxd"));
//! println!("{}", serde_json::to_string(&response)?);
//! # Ok::<(), anyhow::Error>(())
//! ```

mod response;
mod routes;

pub use response::{ApiError, ApiResponse};
pub use routes::{find_route, routes, Method, Operation, Route, CLOUDSNAP_PATH, CREDS_PATH, VERSIONS};

use crate::config::{self, Config, DriverKind};
use crate::creds::{CredentialEntry, CredentialManager, NonSecretsMap, SecretsMap};
use crate::drivers::{
    BackupSchedule, BackupStatus, Capability, CloudSnapInfo, DriverRegistry, DriverResolver,
    KvBackupDriver, NullDriver,
};
use crate::error::Result;
use crate::managers::schedules::{RequestContext, ScheduleManager};
use crate::store::{DocumentStore, FileDocumentStore, FileSecretVault, SecretVault};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub volume_id: String,
    pub schedule: String,
    pub credential_id: String,
    #[serde(default)]
    pub max_backups: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub schedule_id: String,
    pub schedule: String,
    pub credential_id: String,
    #[serde(default)]
    pub max_backups: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRequest {
    pub volume_id: String,
    pub credential_id: String,
    #[serde(default)]
    pub full: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusRequest {
    /// Empty selects every volume
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub local: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangeRequest {
    pub volume_id: String,
    pub requested_state: String,
}

/// Names one backup held in the cloud store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudVolumeRequest {
    pub cloud_volume_id: String,
    pub credential_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreRequest {
    pub dest_volume_id: String,
    pub cloud_volume_id: String,
    pub credential_id: String,
    /// Empty restores on the serving node
    #[serde(default)]
    pub node_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSnapsRequest {
    /// Empty selects every volume
    #[serde(default)]
    pub src_volume_id: String,
    /// Empty matches any credential
    #[serde(default)]
    pub credential_id: String,
    /// Every backup rather than the newest per volume
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSnapsRequest {
    pub src_volume_id: String,
    pub credential_id: String,
}

/// Registered driver and the capability groups it implements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub name: String,
    pub capabilities: Vec<Capability>,
}

pub struct ControlPlane {
    creds: Arc<CredentialManager>,
    schedules: ScheduleManager,
}

impl ControlPlane {
    pub fn new(creds: Arc<CredentialManager>, registry: Arc<DriverRegistry>) -> Self {
        let schedules =
            ScheduleManager::new(DriverResolver::new(registry)).with_credentials(creds.clone());
        Self { creds, schedules }
    }

    /// Build file-backed stores under `data_dir` and register every enabled driver
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let kv: Arc<dyn DocumentStore> =
            Arc::new(FileDocumentStore::new(config.global.document_root()));
        let vault: Arc<dyn SecretVault> =
            Arc::new(FileSecretVault::new(config.global.secrets_dir()));

        let creds = CredentialManager::new(kv.clone(), vault)
            .with_lock_timeout(config.credentials.lock_timeout())
            .with_orphan_policy(config.credentials.orphan_policy);

        let registry = Arc::new(DriverRegistry::new());
        for (name, kind) in config::enabled_drivers(config) {
            let driver: crate::drivers::DriverHandle = match kind {
                DriverKind::KvBackup => Arc::new(
                    KvBackupDriver::new(name, config.global.node_id.clone(), kv.clone())
                        .with_lock_timeout(config.credentials.lock_timeout()),
                ),
                DriverKind::Null => Arc::new(NullDriver::new(name)),
            };
            registry
                .register(driver)
                .with_context(|| format!("Failed to register driver '{}'", name))?;
        }

        info!(
            "Control plane ready with {} driver(s) under {:?}",
            registry.names().len(),
            config.global.data_dir
        );
        Ok(Self::new(Arc::new(creds), registry))
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.creds
    }

    pub fn registry(&self) -> &Arc<DriverRegistry> {
        self.schedules.resolver().registry()
    }

    fn respond<T>(&self, operation: Operation, result: Result<T>) -> ApiResponse<T> {
        if let Err(ref e) = result {
            if e.is_client_error() {
                info!("{:?} rejected: {}", operation, e);
            } else {
                warn!("{:?} failed: {}", operation, e);
            }
        }
        result.into()
    }

    pub fn versions(&self) -> ApiResponse<Vec<String>> {
        ApiResponse::ok(VERSIONS.iter().map(|v| v.to_string()).collect())
    }

    pub fn list_drivers(&self) -> ApiResponse<Vec<DriverInfo>> {
        let registry = self.registry();
        let drivers = registry
            .names()
            .into_iter()
            .filter_map(|name| registry.get(&name).ok())
            .map(|driver| DriverInfo {
                name: driver.name().to_string(),
                capabilities: driver.capabilities(),
            })
            .collect();
        ApiResponse::ok(drivers)
    }

    pub fn list_credentials(&self) -> ApiResponse<BTreeMap<String, NonSecretsMap>> {
        self.respond(Operation::ListCredentials, self.creds.list())
    }

    pub fn add_credential(&self, entry: CredentialEntry) -> ApiResponse<String> {
        self.respond(Operation::AddCredential, self.creds.create(entry))
    }

    pub fn update_credential(&self, id: &str, entry: CredentialEntry) -> ApiResponse<()> {
        self.respond(Operation::UpdateCredential, self.creds.update(id, entry))
    }

    pub fn delete_credential(&self, id: &str) -> ApiResponse<()> {
        self.respond(Operation::DeleteCredential, self.creds.delete(id))
    }

    pub fn rotate_credential(&self, id: &str, secrets: SecretsMap) -> ApiResponse<()> {
        self.respond(Operation::RotateCredential, self.creds.rotate_secret(id, secrets))
    }

    pub fn create_schedule(
        &self,
        ctx: &RequestContext,
        request: &CreateScheduleRequest,
    ) -> ApiResponse<String> {
        let result = self.schedules.create_schedule(
            ctx,
            &request.volume_id,
            &request.schedule,
            &request.credential_id,
            request.max_backups.as_deref(),
        );
        self.respond(Operation::CreateSchedule, result)
    }

    pub fn update_schedule(
        &self,
        ctx: &RequestContext,
        request: &UpdateScheduleRequest,
    ) -> ApiResponse<()> {
        let result = self.schedules.update_schedule(
            ctx,
            &request.schedule_id,
            &request.schedule,
            &request.credential_id,
            request.max_backups.as_deref(),
        );
        self.respond(Operation::UpdateSchedule, result)
    }

    pub fn list_schedules(&self, ctx: &RequestContext) -> ApiResponse<BTreeMap<String, BackupSchedule>> {
        self.respond(Operation::ListSchedules, self.schedules.list_schedules(ctx))
    }

    pub fn delete_schedule(&self, ctx: &RequestContext, schedule_id: &str) -> ApiResponse<()> {
        self.respond(
            Operation::DeleteSchedule,
            self.schedules.delete_schedule(ctx, schedule_id),
        )
    }

    pub fn cloud_backup(&self, ctx: &RequestContext, request: &BackupRequest) -> ApiResponse<()> {
        let result =
            self.schedules
                .cloud_backup(ctx, &request.volume_id, &request.credential_id, request.full);
        self.respond(Operation::CloudBackup, result)
    }

    pub fn cached_status(
        &self,
        ctx: &RequestContext,
        request: &StatusRequest,
    ) -> ApiResponse<BTreeMap<String, BackupStatus>> {
        self.respond(
            Operation::CachedStatus,
            self.schedules
                .cached_status(ctx, &request.volume_id, request.local),
        )
    }

    pub fn change_backup_state(
        &self,
        ctx: &RequestContext,
        request: &StateChangeRequest,
    ) -> ApiResponse<()> {
        self.respond(
            Operation::ChangeBackupState,
            self.schedules
                .change_backup_state(ctx, &request.volume_id, &request.requested_state),
        )
    }

    pub fn backup_catalog(
        &self,
        ctx: &RequestContext,
        request: &CloudVolumeRequest,
    ) -> ApiResponse<Vec<String>> {
        self.respond(
            Operation::BackupCatalog,
            self.schedules
                .backup_catalog(ctx, &request.cloud_volume_id, &request.credential_id),
        )
    }

    pub fn backup_metadata(
        &self,
        ctx: &RequestContext,
        request: &CloudVolumeRequest,
    ) -> ApiResponse<BTreeMap<String, String>> {
        self.respond(
            Operation::BackupMetadata,
            self.schedules
                .backup_metadata(ctx, &request.cloud_volume_id, &request.credential_id),
        )
    }

    pub fn cloud_restore(&self, ctx: &RequestContext, request: &RestoreRequest) -> ApiResponse<String> {
        self.respond(
            Operation::CloudRestore,
            self.schedules.cloud_restore(
                ctx,
                &request.dest_volume_id,
                &request.cloud_volume_id,
                &request.credential_id,
                &request.node_id,
            ),
        )
    }

    pub fn list_cloud_snaps(
        &self,
        ctx: &RequestContext,
        request: &ListSnapsRequest,
    ) -> ApiResponse<Vec<CloudSnapInfo>> {
        self.respond(
            Operation::ListCloudSnaps,
            self.schedules.list_cloud_snaps(
                ctx,
                &request.src_volume_id,
                &request.credential_id,
                request.all,
            ),
        )
    }

    pub fn delete_cloud_snaps(
        &self,
        ctx: &RequestContext,
        request: &DeleteSnapsRequest,
    ) -> ApiResponse<()> {
        self.respond(
            Operation::DeleteCloudSnaps,
            self.schedules
                .delete_cloud_snaps(ctx, &request.src_volume_id, &request.credential_id),
        )
    }
}
