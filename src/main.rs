use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::Level;
use volctl::api::{
    self, ApiResponse, BackupRequest, CloudVolumeRequest, ControlPlane, CreateScheduleRequest,
    DeleteSnapsRequest, ListSnapsRequest, RestoreRequest, StateChangeRequest, StatusRequest,
    UpdateScheduleRequest,
};
use volctl::config::{self, Config};
use volctl::creds::{CredentialEntry, NonSecretsMap, SecretsMap};
use volctl::managers::logging::{self, LoggingConfig};
use volctl::managers::schedules::RequestContext;

#[derive(Parser)]
#[command(name = "volctl")]
#[command(about = "Volume control plane: cloud credentials and backup schedules", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "VOLCTL_CONFIG", default_value = "/etc/volctl/volctl.toml")]
    config: PathBuf,

    /// Driver the request is addressed to (defaults to default_driver)
    #[arg(short, long, global = true)]
    driver: Option<String>,

    /// Caller identity, e.g. "csi/1.4.0"; its first segment may select a driver
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Write the log file as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage cloud credentials
    Creds {
        #[command(subcommand)]
        action: CredsCommand,
    },

    /// Manage recurring cloud backup schedules
    Sched {
        #[command(subcommand)]
        action: SchedCommand,
    },

    /// Start backups and inspect their status
    Cloudsnap {
        #[command(subcommand)]
        action: CloudsnapCommand,
    },

    /// List registered drivers and their capabilities
    Drivers,

    /// Print the route table
    Routes,

    /// Print supported API versions
    Versions,

    /// Validate configuration file
    Validate,
}

#[derive(Args, Clone)]
struct CredentialFields {
    /// Non-secret field, KEY=VALUE (repeatable)
    #[arg(short, long = "param", value_parser = parse_key_val)]
    params: Vec<(String, String)>,

    /// Secret field, KEY=VALUE (repeatable)
    #[arg(short, long = "secret", value_parser = parse_key_val)]
    secrets: Vec<(String, String)>,
}

impl CredentialFields {
    fn into_entry(self) -> CredentialEntry {
        CredentialEntry::new(to_map(self.params), to_map(self.secrets))
    }
}

#[derive(Subcommand)]
enum CredsCommand {
    /// List credential metadata
    List,

    /// Add a credential and print its id
    Add {
        #[command(flatten)]
        fields: CredentialFields,
    },

    /// Create or replace a credential under a known id
    Update {
        id: String,
        #[command(flatten)]
        fields: CredentialFields,
    },

    /// Delete a credential's metadata
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Replace the secret half of a credential
    Rotate {
        id: String,

        /// Secret field, KEY=VALUE (repeatable)
        #[arg(short, long = "secret", value_parser = parse_key_val, required = true)]
        secrets: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
enum SchedCommand {
    /// Create a schedule and print its id
    Create {
        #[arg(long)]
        volume: String,

        /// Cron expression, 5 fields
        #[arg(long)]
        schedule: String,

        #[arg(long)]
        credential: String,

        /// Backups to retain; empty or 0 keeps all
        #[arg(long)]
        max_backups: Option<String>,
    },

    /// Replace an existing schedule
    Update {
        id: String,

        #[arg(long)]
        schedule: String,

        #[arg(long)]
        credential: String,

        #[arg(long)]
        max_backups: Option<String>,
    },

    /// List schedules of the resolved driver
    List,

    /// Delete a schedule
    Delete { id: String },
}

#[derive(Subcommand)]
enum CloudsnapCommand {
    /// Start a backup of a volume
    Backup {
        #[arg(long)]
        volume: String,

        #[arg(long)]
        credential: String,

        /// Full instead of incremental
        #[arg(long)]
        full: bool,
    },

    /// Show cached backup status
    Status {
        /// Volume to filter on (all volumes if omitted)
        #[arg(long, default_value = "")]
        volume: String,

        /// Only backups run by this node
        #[arg(long)]
        local: bool,
    },

    /// Pause, resume or stop the latest backup of a volume
    ChangeState {
        #[arg(long)]
        volume: String,

        /// pause | resume | stop
        #[arg(long)]
        state: String,
    },

    /// List backups held in the cloud store
    List {
        /// Volume to filter on (all volumes if omitted)
        #[arg(long, default_value = "")]
        volume: String,

        /// Credential to filter on (any if omitted)
        #[arg(long, default_value = "")]
        credential: String,

        /// Every backup instead of the newest per volume
        #[arg(long)]
        all: bool,
    },

    /// Backups a restore of a cloud backup reads
    Catalog {
        /// Cloud backup id as shown by `cloudsnap list`
        id: String,

        #[arg(long)]
        credential: String,
    },

    /// Show metadata of a cloud backup
    Metadata {
        id: String,

        #[arg(long)]
        credential: String,
    },

    /// Restore a cloud backup into a volume
    Restore {
        /// Cloud backup id
        id: String,

        /// Destination volume
        #[arg(long)]
        volume: String,

        #[arg(long)]
        credential: String,

        /// Node to restore on (this node if omitted)
        #[arg(long, default_value = "")]
        node: String,
    },

    /// Delete the finished cloud backups of a volume
    Delete {
        #[arg(long)]
        volume: String,

        #[arg(long)]
        credential: String,
    },
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn to_map(pairs: Vec<(String, String)>) -> NonSecretsMap {
    pairs
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect()
}

/// Print a response as JSON; true when it carries no error
fn emit<T: Serialize>(response: &ApiResponse<T>) -> Result<bool> {
    let json = serde_json::to_string_pretty(response).context("Failed to encode response")?;
    println!("{}", json);
    Ok(response.is_ok())
}

fn request_context(cli: &Cli, config: &Config) -> Result<RequestContext> {
    let driver = match cli.driver.as_ref().or(config.default_driver.as_ref()) {
        Some(driver) => driver.clone(),
        None => bail!("No driver given: pass --driver or set default_driver in the config"),
    };

    let mut ctx = RequestContext::new(driver);
    if let Some(ref agent) = cli.user_agent {
        ctx = ctx.with_caller(agent.clone());
    }
    Ok(ctx)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that don't require a config file - use simple console logging
    match cli.command {
        Commands::Routes => {
            logging::init_console_logging(Level::WARN);
            println!("{}", serde_json::to_string_pretty(&api::routes())?);
            return Ok(());
        }
        Commands::Versions => {
            logging::init_console_logging(Level::WARN);
            emit(&ApiResponse::ok(api::VERSIONS))?;
            return Ok(());
        }
        _ => {}
    }

    let config = config::load_config(&cli.config)
        .with_context(|| format!("Failed to load config {:?}", cli.config))?;

    if let Commands::Validate = cli.command {
        logging::init_console_logging(Level::INFO);
        println!("✓ Configuration is valid");
        println!("  Data directory: {:?}", config.global.data_dir);
        println!("  Node: {}", config.global.node_id);
        for (name, kind) in config::enabled_drivers(&config) {
            println!("  Driver: {} ({:?})", name, kind);
        }
        return Ok(());
    }

    // Setup logging with file rotation (must keep guard alive)
    let logging_config = LoggingConfig::from_config(&config.global).with_json(cli.json_logs);
    let log_guard = logging::init_logging(&logging_config)?;

    let plane = ControlPlane::from_config(&config)?;

    let ok = match &cli.command {
        Commands::Creds { action } => run_creds(&plane, action)?,
        Commands::Sched { action } => {
            let ctx = request_context(&cli, &config)?;
            run_sched(&plane, &ctx, action)?
        }
        Commands::Cloudsnap { action } => {
            let ctx = request_context(&cli, &config)?;
            run_cloudsnap(&plane, &ctx, action)?
        }
        Commands::Drivers => emit(&plane.list_drivers())?,
        Commands::Routes | Commands::Versions | Commands::Validate => true,
    };

    if !ok {
        // exit skips destructors; flush the file writer first
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}

fn run_creds(plane: &ControlPlane, action: &CredsCommand) -> Result<bool> {
    match action {
        CredsCommand::List => emit(&plane.list_credentials()),
        CredsCommand::Add { fields } => emit(&plane.add_credential(fields.clone().into_entry())),
        CredsCommand::Update { id, fields } => {
            emit(&plane.update_credential(id, fields.clone().into_entry()))
        }
        CredsCommand::Delete { id, yes } => {
            if !yes {
                use dialoguer::Confirm;

                let confirm = Confirm::new()
                    .with_prompt(format!("Delete credential {}?", id))
                    .default(false)
                    .interact()
                    .context("Confirmation needs a terminal; pass --yes to skip it")?;

                if !confirm {
                    eprintln!("Delete cancelled.");
                    return Ok(true);
                }
            }
            emit(&plane.delete_credential(id))
        }
        CredsCommand::Rotate { id, secrets } => {
            let secrets: SecretsMap = to_map(secrets.clone());
            emit(&plane.rotate_credential(id, secrets))
        }
    }
}

fn run_sched(plane: &ControlPlane, ctx: &RequestContext, action: &SchedCommand) -> Result<bool> {
    match action {
        SchedCommand::Create {
            volume,
            schedule,
            credential,
            max_backups,
        } => emit(&plane.create_schedule(
            ctx,
            &CreateScheduleRequest {
                volume_id: volume.clone(),
                schedule: schedule.clone(),
                credential_id: credential.clone(),
                max_backups: max_backups.clone(),
            },
        )),
        SchedCommand::Update {
            id,
            schedule,
            credential,
            max_backups,
        } => emit(&plane.update_schedule(
            ctx,
            &UpdateScheduleRequest {
                schedule_id: id.clone(),
                schedule: schedule.clone(),
                credential_id: credential.clone(),
                max_backups: max_backups.clone(),
            },
        )),
        SchedCommand::List => emit(&plane.list_schedules(ctx)),
        SchedCommand::Delete { id } => emit(&plane.delete_schedule(ctx, id)),
    }
}

fn run_cloudsnap(
    plane: &ControlPlane,
    ctx: &RequestContext,
    action: &CloudsnapCommand,
) -> Result<bool> {
    match action {
        CloudsnapCommand::Backup {
            volume,
            credential,
            full,
        } => emit(&plane.cloud_backup(
            ctx,
            &BackupRequest {
                volume_id: volume.clone(),
                credential_id: credential.clone(),
                full: *full,
            },
        )),
        CloudsnapCommand::Status { volume, local } => emit(&plane.cached_status(
            ctx,
            &StatusRequest {
                volume_id: volume.clone(),
                local: *local,
            },
        )),
        CloudsnapCommand::ChangeState { volume, state } => emit(&plane.change_backup_state(
            ctx,
            &StateChangeRequest {
                volume_id: volume.clone(),
                requested_state: state.clone(),
            },
        )),
        CloudsnapCommand::List {
            volume,
            credential,
            all,
        } => emit(&plane.list_cloud_snaps(
            ctx,
            &ListSnapsRequest {
                src_volume_id: volume.clone(),
                credential_id: credential.clone(),
                all: *all,
            },
        )),
        CloudsnapCommand::Catalog { id, credential } => emit(&plane.backup_catalog(
            ctx,
            &CloudVolumeRequest {
                cloud_volume_id: id.clone(),
                credential_id: credential.clone(),
            },
        )),
        CloudsnapCommand::Metadata { id, credential } => emit(&plane.backup_metadata(
            ctx,
            &CloudVolumeRequest {
                cloud_volume_id: id.clone(),
                credential_id: credential.clone(),
            },
        )),
        CloudsnapCommand::Restore {
            id,
            volume,
            credential,
            node,
        } => emit(&plane.cloud_restore(
            ctx,
            &RestoreRequest {
                dest_volume_id: volume.clone(),
                cloud_volume_id: id.clone(),
                credential_id: credential.clone(),
                node_id: node.clone(),
            },
        )),
        CloudsnapCommand::Delete { volume, credential } => emit(&plane.delete_cloud_snaps(
            ctx,
            &DeleteSnapsRequest {
                src_volume_id: volume.clone(),
                credential_id: credential.clone(),
            },
        )),
    }
}
