//! Admin Core - Main entry point
//!
//! CLI surface over the backup/restore subsystem, model registry and
//! management API status poll.

use admin_core::catalog::Catalog;
use admin_core::config::Config;
use admin_core::external::{HostCli, HttpDeliverySink, ProcessControl};
use admin_core::logging;
use admin_core::models::ai_model::{Model, ModelRegistry, ServiceKind};
use admin_core::models::target::{BackupTarget, BatchStamp};
use admin_core::services::backup_runner::{expand_all_workspaces, BackupRunner, Destination};
use admin_core::services::restore_flow::{
    restore_upload, PendingUpload, RestoreFlow, RestorePhase, RestoreRequest, UploadMode,
};
use admin_core::services::retention::{enforce_all, RetentionPolicy};
use admin_core::services::status::ManagementApi;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create backups of the gateway config and workspaces
    Backup {
        /// Back up the gateway configuration file
        #[arg(long)]
        system: bool,

        /// Back up one workspace
        #[arg(long, value_name = "NAME")]
        workspace: Option<String>,

        /// Bundle only the curated light file set (with --workspace)
        #[arg(long)]
        light: bool,

        /// Back up every configured workspace
        #[arg(long)]
        all_workspaces: bool,

        /// Deliver artifacts to this endpoint instead of storing locally
        #[arg(long, value_name = "URL")]
        remote: Option<String>,
    },

    /// Restore a recorded backup generation
    Restore {
        /// Restore the gateway configuration file
        #[arg(long)]
        system: bool,

        /// Restore one workspace
        #[arg(long, value_name = "NAME")]
        workspace: Option<String>,

        /// Restore the light archive (with --workspace)
        #[arg(long)]
        light: bool,

        /// Restore every workspace archive in the chosen generation
        #[arg(long)]
        full_any: bool,

        /// Generation to restore (defaults to the newest valid one)
        #[arg(long, value_name = "YYYYMMDD_HHMMSS")]
        stamp: Option<String>,

        /// Only list the restorable generations
        #[arg(long)]
        list: bool,
    },

    /// Restore from an externally delivered artifact
    UploadRestore {
        /// Received artifact; consumed on success, failure and cancel alike
        file: PathBuf,

        /// Declared mode: system, full or light (inferred from the file
        /// extension when omitted)
        #[arg(long, value_name = "MODE")]
        mode: Option<String>,

        /// Target workspace (required for light mode)
        #[arg(long, value_name = "NAME")]
        workspace: Option<String>,

        /// Discard the upload instead of restoring it
        #[arg(long)]
        cancel: bool,
    },

    /// Delete stale backup generations
    Retention,

    /// Model registry operations
    Models {
        #[command(subcommand)]
        action: ModelsCommand,
    },

    /// Poll the management API once
    Status,
}

#[derive(Subcommand, Debug)]
enum ModelsCommand {
    /// List registered models
    List {
        /// Filter by model family (claude, gemini, gpt, ...)
        #[arg(long, value_name = "TYPE")]
        model_type: Option<String>,
    },

    /// Switch the gateway's default model
    Switch {
        /// Full model reference to activate
        #[arg(long, value_name = "PATH")]
        model: Option<String>,

        /// Pick a random CLI-proxy model instead
        #[arg(long)]
        random: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    logging::init(log_level)?;

    tracing::info!("Starting admin-core v{}", env!("CARGO_PKG_VERSION"));

    // every flow is blocking filesystem or HTTP work
    tokio::task::spawn_blocking(move || run(args.command, config)).await?
}

fn run(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::Backup {
            system,
            workspace,
            light,
            all_workspaces,
            remote,
        } => run_backup(&config, system, workspace, light, all_workspaces, remote),
        Command::Restore {
            system,
            workspace,
            light,
            full_any,
            stamp,
            list,
        } => run_restore(&config, system, workspace, light, full_any, stamp, list),
        Command::UploadRestore {
            file,
            mode,
            workspace,
            cancel,
        } => run_upload_restore(&config, file, mode, workspace, cancel),
        Command::Retention => run_retention(&config),
        Command::Models { action } => run_models(&config, action),
        Command::Status => run_status(&config),
    }
}

fn run_backup(
    config: &Config,
    system: bool,
    workspace: Option<String>,
    light: bool,
    all_workspaces: bool,
    remote: Option<String>,
) -> anyhow::Result<()> {
    let mut targets = Vec::new();
    if system {
        targets.push(BackupTarget::system());
    }
    if all_workspaces {
        if config.workspaces.is_empty() {
            bail!("no workspaces configured");
        }
        targets.extend(expand_all_workspaces(&config.workspaces));
    }
    match workspace {
        Some(ws) => targets.push(if light {
            BackupTarget::light(ws)
        } else {
            BackupTarget::full(ws)
        }),
        None if light => bail!("--light requires --workspace"),
        None => {}
    }
    if targets.is_empty() {
        bail!("nothing selected; pass --system, --workspace or --all-workspaces");
    }

    let catalog = Catalog::new(&config.paths.backup_root);
    let runner = BackupRunner::new(&catalog, &config.paths.gateway_home, &config.light.files);
    let stamp = BatchStamp::now();

    let report = match &remote {
        Some(endpoint) => {
            let sink = HttpDeliverySink::new(endpoint.clone());
            runner.run_batch(&targets, &stamp, &Destination::Remote(&sink))?
        }
        None => {
            catalog.ensure_layout()?;
            runner.run_batch(&targets, &stamp, &Destination::Local)?
        }
    };

    println!("Batch {stamp}: {}", report.summary());
    if report.all_failed() {
        bail!("every backup target failed");
    }
    Ok(())
}

fn run_restore(
    config: &Config,
    system: bool,
    workspace: Option<String>,
    light: bool,
    full_any: bool,
    stamp: Option<String>,
    list: bool,
) -> anyhow::Result<()> {
    let request = if system {
        if workspace.is_some() || light || full_any {
            bail!("--system cannot be combined with workspace options");
        }
        RestoreRequest::System
    } else if full_any {
        if workspace.is_some() || light {
            bail!("--full-any cannot be combined with --workspace or --light");
        }
        RestoreRequest::FullAll
    } else if workspace.is_some() {
        if light {
            RestoreRequest::LightWorkspace
        } else {
            RestoreRequest::FullWorkspace
        }
    } else {
        bail!("nothing selected; pass --system, --workspace or --full-any");
    };

    let catalog = Catalog::new(&config.paths.backup_root);
    let process = HostCli::default();
    let mut flow = RestoreFlow::new(&catalog, &config.paths.gateway_home, &process);

    flow.begin(request)?;
    if let Some(ws) = workspace {
        if matches!(flow.phase(), RestorePhase::SelectingWorkspace { .. }) {
            flow.select_workspace(ws)?;
        }
    }

    let candidates = flow
        .candidates()
        .context("restore flow offered no generations")?
        .to_vec();
    if list {
        for candidate in &candidates {
            println!("{}  ({})", candidate, candidate.display_human());
        }
        return Ok(());
    }

    let chosen = match stamp {
        Some(s) => BatchStamp::parse(&s)?,
        None => candidates[0].clone(),
    };
    flow.choose(&chosen)?;
    let outcome = flow.confirm()?;
    println!("Restore complete: {}", outcome.detail);
    Ok(())
}

fn run_upload_restore(
    config: &Config,
    file: PathBuf,
    mode: Option<String>,
    workspace: Option<String>,
    cancel: bool,
) -> anyhow::Result<()> {
    let declared = match mode.as_deref() {
        Some(m) => Some(UploadMode::parse(m).context("mode must be system, full or light")?),
        None => None,
    };
    let original_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("upload path has no file name")?;

    let upload = PendingUpload::receive(file, original_name, declared, workspace)?;
    if cancel {
        upload.cancel();
        println!("Upload discarded.");
        return Ok(());
    }

    let process = HostCli::default();
    let outcome = restore_upload(upload, &config.paths.gateway_home, &process)?;
    println!("Restore complete: {}", outcome.detail);
    Ok(())
}

fn run_retention(config: &Config) -> anyhow::Result<()> {
    let catalog = Catalog::new(&config.paths.backup_root);
    let policy = RetentionPolicy::new(config.retention.keep);
    let removed = enforce_all(&catalog, &policy);
    println!("Removed {removed} stale generation(s).");
    Ok(())
}

fn run_models(config: &Config, action: ModelsCommand) -> anyhow::Result<()> {
    let registry = ModelRegistry::load(&config.models.catalog_path)?;
    match action {
        ModelsCommand::List { model_type } => {
            let models: Vec<&Model> = match &model_type {
                Some(t) => registry.of_type(t),
                None => registry.all().iter().collect(),
            };
            if models.is_empty() {
                println!("No matching models registered.");
                return Ok(());
            }
            for model in models {
                println!(
                    "{:<28} {:<10} {:<10} {}",
                    model.short_name(),
                    model.model_type,
                    model.service_kind,
                    model.full_path
                );
            }
        }
        ModelsCommand::Switch { model, random } => {
            let chosen = if random {
                registry
                    .pick_random(&ServiceKind::CliProxy)
                    .context("no cliproxy models registered")?
            } else {
                let path = model.context("pass --model PATH or --random")?;
                registry
                    .find(&path)
                    .with_context(|| format!("model '{path}' is not registered"))?
            };
            let process = HostCli::default();
            process.set_model(&chosen.full_path)?;
            println!("Default model switched to {}", chosen.full_path);
        }
    }
    Ok(())
}

fn run_status(config: &Config) -> anyhow::Result<()> {
    let api = ManagementApi::new(config.management.url.clone(), config.management.key.clone());
    let summary = api.fetch_status()?;
    println!("{summary}");
    Ok(())
}
