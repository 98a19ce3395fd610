//! Batch backup execution with partial-failure accounting.
//!
//! A batch runs its targets strictly in order under one shared stamp. A
//! failing target never aborts the batch; the caller gets both lists back
//! and renders the summary.

use crate::archive;
use crate::catalog::{BackupRecord, Catalog};
use crate::error::{AdminError, Result};
use crate::external::DeliverySink;
use crate::models::target::{ArtifactFormat, BackupCategory, BackupTarget, BatchStamp};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the produced artifacts end up.
pub enum Destination<'a> {
    /// Under the catalog's canonical layout
    Local,
    /// Handed to a delivery sink; local staging copies are deleted on
    /// successful delivery and retained as a fallback when delivery fails
    Remote(&'a dyn DeliverySink),
}

#[derive(Debug)]
pub struct BatchFailure {
    pub target: BackupTarget,
    pub error: AdminError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub successes: Vec<BackupRecord>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn all_failed(&self) -> bool {
        self.successes.is_empty() && !self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} succeeded, {} failed",
            self.successes.len(),
            self.failures.len()
        );
        for failure in &self.failures {
            out.push_str(&format!(
                "\n  {}: {}",
                failure.target.describe(),
                failure.error
            ));
        }
        out
    }
}

pub struct BackupRunner<'a> {
    catalog: &'a Catalog,
    gateway_home: &'a Path,
    light_files: &'a [String],
}

impl<'a> BackupRunner<'a> {
    pub fn new(catalog: &'a Catalog, gateway_home: &'a Path, light_files: &'a [String]) -> Self {
        BackupRunner {
            catalog,
            gateway_home,
            light_files,
        }
    }

    /// Execute every target under the shared stamp. Partial failures are
    /// collected, never propagated; an empty batch is a contract violation.
    pub fn run_batch(
        &self,
        targets: &[BackupTarget],
        stamp: &BatchStamp,
        destination: &Destination<'_>,
    ) -> Result<BatchReport> {
        if targets.is_empty() {
            return Err(AdminError::InvalidSelection(
                "batch contains no targets".to_string(),
            ));
        }

        let mut report = BatchReport::default();
        for (index, target) in targets.iter().enumerate() {
            info!(
                "Backing up ({}/{}): {}",
                index + 1,
                targets.len(),
                target.describe()
            );
            match self.produce(target, stamp, destination) {
                Ok(record) => report.successes.push(record),
                Err(error) => {
                    warn!("Backup failed for {}: {error}", target.describe());
                    report.failures.push(BatchFailure {
                        target: target.clone(),
                        error,
                    });
                }
            }
        }
        Ok(report)
    }

    fn produce(
        &self,
        target: &BackupTarget,
        stamp: &BatchStamp,
        destination: &Destination<'_>,
    ) -> Result<BackupRecord> {
        let artifact_path = match destination {
            Destination::Local => self.catalog.artifact_path(target, stamp)?,
            Destination::Remote(_) => self.staging_path(target, stamp),
        };

        match target.category {
            BackupCategory::System => {
                let config_src = self.gateway_home.join("openclaw.json");
                archive::snapshot_file(&config_src, &artifact_path)?;
            }
            BackupCategory::Full => {
                let ws_dir = self.workspace_dir(target)?;
                archive::snapshot_tree(&ws_dir, &artifact_path, archive::default_exclude)?;
            }
            BackupCategory::Light => {
                let ws_dir = self.workspace_dir(target)?;
                archive::snapshot_selected_files(&ws_dir, self.light_files, &artifact_path)?;
            }
        }

        if let Destination::Remote(sink) = destination {
            let display_name = Catalog::artifact_name(target, stamp);
            let caption = format!(
                "Backup: {} | {}",
                target.describe(),
                stamp.display_human()
            );
            sink.deliver(&artifact_path, &display_name, &caption)?;
            // delivered; the staging copy has served its purpose
            fs::remove_file(&artifact_path)?;
        }

        Ok(BackupRecord {
            target: target.clone(),
            stamp: stamp.clone(),
            artifact_path,
            format: ArtifactFormat::for_category(target.category),
        })
    }

    fn workspace_dir(&self, target: &BackupTarget) -> Result<PathBuf> {
        let ws = target.workspace.as_deref().ok_or_else(|| {
            AdminError::InvalidSelection(format!(
                "{} backups require a workspace name",
                target.category
            ))
        })?;
        Ok(self.gateway_home.join(ws))
    }

    fn staging_path(&self, target: &BackupTarget, stamp: &BatchStamp) -> PathBuf {
        std::env::temp_dir()
            .join(format!("openclaw_tmp_{stamp}"))
            .join(Catalog::artifact_name(target, stamp))
    }
}

/// One full-backup target per configured workspace, for "back up
/// everything" batches.
pub fn expand_all_workspaces(workspaces: &[String]) -> Vec<BackupTarget> {
    workspaces.iter().map(BackupTarget::full).collect()
}
