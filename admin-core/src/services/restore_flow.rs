//! Restore flows: catalog-driven version selection and externally
//! delivered uploads.
//!
//! A flow is an explicit state machine; every selection lives in a session
//! object owned by the flow, never in process-wide state. Terminal states
//! always clear the session so a stale selection can never leak into an
//! unrelated attempt.

use crate::archive;
use crate::catalog::Catalog;
use crate::error::{AdminError, Result};
use crate::external::ProcessControl;
use crate::models::target::{BackupCategory, BatchStamp};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the live gateway configuration file.
const GATEWAY_CONFIG: &str = "openclaw.json";

/// Service restarted after a successful system-config restore.
const GATEWAY_SERVICE: &str = "gateway";

/// What the operator asked to restore, before workspace resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreRequest {
    /// The gateway configuration file
    System,
    /// Every workspace archive found in a generation
    FullAll,
    /// One workspace, full archive
    FullWorkspace,
    /// One workspace, light archive
    LightWorkspace,
}

/// A fully resolved restore selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreAction {
    System,
    FullAll,
    Full(String),
    Light(String),
}

impl RestoreAction {
    pub fn category(&self) -> BackupCategory {
        match self {
            RestoreAction::System => BackupCategory::System,
            RestoreAction::FullAll | RestoreAction::Full(_) => BackupCategory::Full,
            RestoreAction::Light(_) => BackupCategory::Light,
        }
    }

    pub fn workspace(&self) -> Option<&str> {
        match self {
            RestoreAction::Full(ws) | RestoreAction::Light(ws) => Some(ws),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RestoreAction::System => "system config".to_string(),
            RestoreAction::FullAll => "all workspaces (full)".to_string(),
            RestoreAction::Full(ws) => format!("workspace '{ws}' (full)"),
            RestoreAction::Light(ws) => format!("workspace '{ws}' (light)"),
        }
    }
}

/// Where a restore flow currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestorePhase {
    SelectingCategory,
    SelectingWorkspace { request: RestoreRequest },
    SelectingGeneration { candidates: Vec<BatchStamp> },
    Confirming { stamp: BatchStamp },
    Restoring,
    Succeeded { detail: String },
    Failed { reason: String },
    Cancelled,
}

impl RestorePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RestorePhase::Succeeded { .. } | RestorePhase::Failed { .. } | RestorePhase::Cancelled
        )
    }
}

/// Transient per-flow selections; cleared on every terminal transition.
#[derive(Debug, Default)]
struct RestoreSession {
    action: Option<RestoreAction>,
    chosen: Option<BatchStamp>,
}

impl RestoreSession {
    fn clear(&mut self) {
        self.action = None;
        self.chosen = None;
    }
}

#[derive(Debug)]
pub struct RestoreOutcome {
    pub restored: usize,
    pub detail: String,
}

pub struct RestoreFlow<'a> {
    catalog: &'a Catalog,
    gateway_home: &'a Path,
    process: &'a dyn ProcessControl,
    session: RestoreSession,
    phase: RestorePhase,
}

impl<'a> RestoreFlow<'a> {
    pub fn new(
        catalog: &'a Catalog,
        gateway_home: &'a Path,
        process: &'a dyn ProcessControl,
    ) -> Self {
        RestoreFlow {
            catalog,
            gateway_home,
            process,
            session: RestoreSession::default(),
            phase: RestorePhase::SelectingCategory,
        }
    }

    pub fn phase(&self) -> &RestorePhase {
        &self.phase
    }

    /// Stamps offered for selection, once a generation listing succeeded.
    pub fn candidates(&self) -> Option<&[BatchStamp]> {
        match &self.phase {
            RestorePhase::SelectingGeneration { candidates } => Some(candidates),
            _ => None,
        }
    }

    /// Start (or restart) a flow. Beginning a new flow always overwrites
    /// whatever a previous attempt left behind.
    pub fn begin(&mut self, request: RestoreRequest) -> Result<()> {
        self.session.clear();
        let action = match request {
            RestoreRequest::System => RestoreAction::System,
            RestoreRequest::FullAll => RestoreAction::FullAll,
            RestoreRequest::FullWorkspace | RestoreRequest::LightWorkspace => {
                self.phase = RestorePhase::SelectingWorkspace { request };
                return Ok(());
            }
        };
        self.enter_generation_selection(action)
    }

    /// Resolve the workspace for a workspace-scoped request.
    pub fn select_workspace(&mut self, workspace: impl Into<String>) -> Result<()> {
        let request = match &self.phase {
            RestorePhase::SelectingWorkspace { request } => *request,
            other => {
                return Err(AdminError::InvalidSelection(format!(
                    "no workspace selection pending (phase {other:?})"
                )))
            }
        };
        let workspace = workspace.into();
        let action = match request {
            RestoreRequest::FullWorkspace => RestoreAction::Full(workspace),
            RestoreRequest::LightWorkspace => RestoreAction::Light(workspace),
            RestoreRequest::System | RestoreRequest::FullAll => {
                return Err(AdminError::InvalidSelection(
                    "the selected category takes no workspace".to_string(),
                ))
            }
        };
        self.enter_generation_selection(action)
    }

    fn enter_generation_selection(&mut self, action: RestoreAction) -> Result<()> {
        info!("Looking up restorable generations for {}", action.describe());
        let category = action.category();
        let workspace = action.workspace().map(|s| s.to_string());

        let listed = match self
            .catalog
            .list_generations(category, workspace.as_deref())
        {
            Ok(stamps) => stamps,
            Err(err) => return self.fail(err),
        };
        let total = listed.len();
        let candidates: Vec<BatchStamp> = listed
            .into_iter()
            .filter(|stamp| {
                self.catalog
                    .validate_generation(category, workspace.as_deref(), stamp)
            })
            .collect();
        if candidates.is_empty() {
            return self.fail(AdminError::NoBackupsAvailable(format!(
                "{total} generation(s) recorded, none holds a usable artifact for {}",
                action.describe()
            )));
        }

        self.session.action = Some(action);
        self.phase = RestorePhase::SelectingGeneration { candidates };
        Ok(())
    }

    /// Pick one of the offered generations.
    pub fn choose(&mut self, stamp: &BatchStamp) -> Result<()> {
        let candidates = match &self.phase {
            RestorePhase::SelectingGeneration { candidates } => candidates,
            other => {
                return Err(AdminError::InvalidSelection(format!(
                    "no generation selection pending (phase {other:?})"
                )))
            }
        };
        if !candidates.contains(stamp) {
            return Err(AdminError::InvalidSelection(format!(
                "generation {stamp} is not among the offered candidates"
            )));
        }
        self.session.chosen = Some(stamp.clone());
        self.phase = RestorePhase::Confirming {
            stamp: stamp.clone(),
        };
        Ok(())
    }

    /// Abort the flow. Valid from any non-terminal state; a terminal flow is
    /// left untouched.
    pub fn cancel(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        info!("Restore flow cancelled");
        self.session.clear();
        self.phase = RestorePhase::Cancelled;
    }

    /// Execute the confirmed restore.
    pub fn confirm(&mut self) -> Result<RestoreOutcome> {
        let stamp = match &self.phase {
            RestorePhase::Confirming { stamp } => stamp.clone(),
            other => {
                return Err(AdminError::InvalidSelection(format!(
                    "nothing confirmed yet (phase {other:?})"
                )))
            }
        };
        let action = match self.session.action.clone() {
            Some(action) => action,
            None => {
                return self.fail(AdminError::InvalidSelection(
                    "restore session lost its selection".to_string(),
                ))
            }
        };

        self.phase = RestorePhase::Restoring;
        info!("Restoring {} from generation {stamp}", action.describe());

        match self.perform(&action, &stamp) {
            Ok(outcome) => {
                self.session.clear();
                self.phase = RestorePhase::Succeeded {
                    detail: outcome.detail.clone(),
                };
                Ok(outcome)
            }
            Err(err) => self.fail(err),
        }
    }

    fn perform(&self, action: &RestoreAction, stamp: &BatchStamp) -> Result<RestoreOutcome> {
        let artifacts =
            self.catalog
                .resolve_artifacts(action.category(), action.workspace(), stamp)?;

        match action.category() {
            BackupCategory::System => {
                let live_config = self.gateway_home.join(GATEWAY_CONFIG);
                archive::snapshot_file(&artifacts[0], &live_config)?;
                // a failed restart is an operator follow-up, not a failed restore
                if let Err(err) = self.process.restart(GATEWAY_SERVICE) {
                    warn!("Gateway restart after config restore failed: {err}");
                }
                Ok(RestoreOutcome {
                    restored: 1,
                    detail: format!("system config restored from generation {stamp}"),
                })
            }
            BackupCategory::Full | BackupCategory::Light => {
                let mut clean = 0usize;
                for artifact in &artifacts {
                    match archive::extract(artifact, self.gateway_home) {
                        Ok(()) => clean += 1,
                        Err(err) => {
                            warn!("Failed to extract {}: {err}", artifact.display())
                        }
                    }
                }
                if clean == 0 {
                    return Err(AdminError::ExtractFailure(format!(
                        "none of the {} archive(s) in generation {stamp} extracted cleanly",
                        artifacts.len()
                    )));
                }
                Ok(RestoreOutcome {
                    restored: clean,
                    detail: format!("{clean} archive(s) restored from generation {stamp}"),
                })
            }
        }
    }

    /// Enter the failed terminal state and hand the error back.
    fn fail<T>(&mut self, err: AdminError) -> Result<T> {
        warn!("Restore flow failed: {err}");
        self.session.clear();
        self.phase = RestorePhase::Failed {
            reason: err.to_string(),
        };
        Err(err)
    }
}

/// Restore mode of an externally delivered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    System,
    Full,
    Light,
}

impl UploadMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(UploadMode::System),
            "full" => Some(UploadMode::Full),
            "light" => Some(UploadMode::Light),
            _ => None,
        }
    }

    fn expected_extension(&self) -> &'static str {
        match self {
            UploadMode::System => "json",
            UploadMode::Full => "tar.gz",
            UploadMode::Light => "md",
        }
    }

    fn infer_from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".json") {
            Some(UploadMode::System)
        } else if lower.ends_with(".tar.gz") {
            Some(UploadMode::Full)
        } else if lower.ends_with(".md") {
            Some(UploadMode::Light)
        } else {
            None
        }
    }
}

/// Removes the owned temp file when dropped, so an upload can never leak its
/// payload regardless of how the flow ends.
#[derive(Debug)]
struct TempGuard {
    path: PathBuf,
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            match fs::remove_file(&self.path) {
                Ok(()) => debug!("Removed upload temp file {}", self.path.display()),
                Err(err) => {
                    warn!("Failed to remove temp file {}: {err}", self.path.display())
                }
            }
        }
    }
}

/// A provisionally received external artifact awaiting confirmation.
#[derive(Debug)]
pub struct PendingUpload {
    guard: TempGuard,
    original_name: String,
    mode: UploadMode,
    workspace: Option<String>,
}

impl PendingUpload {
    /// Take ownership of a received temp file. The mode is the declared one
    /// when given (checked against the file extension) or inferred from the
    /// extension otherwise. On any validation error the temp file is
    /// removed before returning.
    pub fn receive(
        temp_path: PathBuf,
        original_name: impl Into<String>,
        declared: Option<UploadMode>,
        workspace: Option<String>,
    ) -> Result<Self> {
        // the guard owns cleanup from this point on, covering every early
        // return below
        let guard = TempGuard { path: temp_path };
        if !guard.path.is_file() {
            return Err(AdminError::SourceMissing(guard.path.display().to_string()));
        }

        let original_name = original_name.into();
        let inferred = UploadMode::infer_from_name(&original_name);
        let mode = match declared {
            Some(declared) => {
                if inferred != Some(declared) {
                    return Err(AdminError::InvalidSelection(format!(
                        "expected a .{} file for a {declared:?} restore, got '{original_name}'",
                        declared.expected_extension()
                    )));
                }
                declared
            }
            None => inferred.ok_or_else(|| {
                AdminError::InvalidSelection(format!(
                    "cannot infer a restore mode from '{original_name}'"
                ))
            })?,
        };

        if mode == UploadMode::Light && workspace.is_none() {
            return Err(AdminError::InvalidSelection(
                "light restore requires a target workspace".to_string(),
            ));
        }

        Ok(PendingUpload {
            guard,
            original_name,
            mode,
            workspace,
        })
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn temp_path(&self) -> &Path {
        &self.guard.path
    }

    /// Discard the upload; the temp file is removed as the guard drops.
    pub fn cancel(self) {
        info!("Upload '{}' discarded", self.original_name);
    }
}

/// Received file names may carry the inbound channel's staging prefix.
fn clean_file_name(name: &str) -> &str {
    name.strip_prefix("temp_upload_").unwrap_or(name)
}

/// Apply a confirmed upload to the live system. Consumes the upload; its
/// temp file is removed on success, failure and panic alike.
pub fn restore_upload(
    upload: PendingUpload,
    gateway_home: &Path,
    process: &dyn ProcessControl,
) -> Result<RestoreOutcome> {
    info!(
        "Restoring upload '{}' ({:?})",
        upload.original_name(),
        upload.mode()
    );
    match upload.mode() {
        UploadMode::System => {
            let live_config = gateway_home.join(GATEWAY_CONFIG);
            archive::snapshot_file(upload.temp_path(), &live_config)?;
            if let Err(err) = process.restart(GATEWAY_SERVICE) {
                warn!("Gateway restart after config restore failed: {err}");
            }
            Ok(RestoreOutcome {
                restored: 1,
                detail: format!(
                    "system config restored from upload '{}'",
                    upload.original_name()
                ),
            })
        }
        UploadMode::Full => {
            archive::extract(upload.temp_path(), gateway_home)?;
            let detail = match Catalog::workspace_from_artifact_name(upload.original_name()) {
                Some(ws) => format!(
                    "workspace '{ws}' restored from '{}'",
                    upload.original_name()
                ),
                None => format!("workspace archive '{}' extracted", upload.original_name()),
            };
            Ok(RestoreOutcome {
                restored: 1,
                detail,
            })
        }
        UploadMode::Light => {
            let workspace = upload.workspace.clone().ok_or_else(|| {
                AdminError::InvalidSelection(
                    "light restore requires a target workspace".to_string(),
                )
            })?;
            let file_name = clean_file_name(upload.original_name()).to_string();
            let dest = gateway_home.join(&workspace).join(&file_name);
            archive::snapshot_file(upload.temp_path(), &dest)?;
            Ok(RestoreOutcome {
                restored: 1,
                detail: format!("'{file_name}' restored into workspace '{workspace}'"),
            })
        }
    }
}
