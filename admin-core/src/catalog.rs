//! On-disk backup catalog: directory taxonomy, discovery and validation.
//!
//! Layout under the backup root:
//! `system/<stamp>/` and `full/<stamp>/` (workspace name lives in the
//! artifact filename so mixed-workspace batches share one listing),
//! `light/<workspace>/<stamp>/`. The catalog is the only authority on what
//! counts as a valid generation: a directory is valid only if it holds at
//! least one artifact conforming to the category, so placeholder files never
//! masquerade as backups.

use crate::error::{AdminError, Result};
use crate::models::target::{ArtifactFormat, BackupCategory, BackupTarget, BatchStamp};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Most generations ever offered for selection.
const MAX_LISTED_GENERATIONS: usize = 6;

/// Prefix of every artifact filename.
pub const ARTIFACT_PREFIX: &str = "openclaw";

/// Placeholder dropped into empty category directories.
const PLACEHOLDER_NAME: &str = "README.txt";

/// A discovered backup artifact.
#[derive(Debug, Clone)]
pub struct BackupRecord {
    pub target: BackupTarget,
    pub stamp: BatchStamp,
    pub artifact_path: PathBuf,
    pub format: ArtifactFormat,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Catalog { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the category directories, dropping a README placeholder into
    /// each so operators browsing the tree see what belongs where. The
    /// placeholder never makes a generation valid.
    pub fn ensure_layout(&self) -> Result<()> {
        for category in [
            BackupCategory::System,
            BackupCategory::Full,
            BackupCategory::Light,
        ] {
            let dir = self.root.join(category.dir_name());
            fs::create_dir_all(&dir)?;
            let readme = dir.join(PLACEHOLDER_NAME);
            if !readme.exists() {
                fs::write(
                    &readme,
                    format!(
                        "Backups of kind '{}' are stored here, one directory per \
                         timestamped generation.\nRun the admin backup command to \
                         create one.\n",
                        category.dir_name().to_uppercase()
                    ),
                )?;
            }
        }
        Ok(())
    }

    /// Directory listing generations for a category. Only `light` embeds the
    /// workspace in the path; `full` keeps it in the artifact filename.
    fn scope_dir(&self, category: BackupCategory, workspace: Option<&str>) -> Result<PathBuf> {
        match category {
            BackupCategory::Light => {
                let ws = workspace.ok_or_else(|| {
                    AdminError::InvalidSelection(
                        "light backups are scoped to a workspace".to_string(),
                    )
                })?;
                Ok(self.root.join("light").join(ws))
            }
            other => Ok(self.root.join(other.dir_name())),
        }
    }

    /// Directory that holds one generation of this target.
    pub fn generation_dir(&self, target: &BackupTarget, stamp: &BatchStamp) -> Result<PathBuf> {
        Ok(self
            .scope_dir(target.category, target.workspace.as_deref())?
            .join(stamp.as_str()))
    }

    /// Canonical artifact filename: `openclaw_<mode_label>_<stamp>.<ext>`.
    pub fn artifact_name(target: &BackupTarget, stamp: &BatchStamp) -> String {
        format!(
            "{}_{}_{}.{}",
            ARTIFACT_PREFIX,
            target.mode_label(),
            stamp,
            target.category.extension()
        )
    }

    /// Recover the workspace token from a full-backup artifact name
    /// (`openclaw_full_<ws>_<stamp>.tar.gz`). The workspace itself may
    /// contain underscores; the trailing stamp fields are fixed-width.
    pub fn workspace_from_artifact_name(name: &str) -> Option<&str> {
        let stem = name.strip_suffix(".tar.gz")?;
        let mut parts = stem.rsplitn(3, '_');
        let time = parts.next()?;
        let date = parts.next()?;
        let head = parts.next()?;
        if time.len() != 6
            || date.len() != 8
            || !time.chars().all(|c| c.is_ascii_digit())
            || !date.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        head.strip_prefix("openclaw_full_")
    }

    /// Full canonical path for a target's artifact in one generation.
    pub fn artifact_path(&self, target: &BackupTarget, stamp: &BatchStamp) -> Result<PathBuf> {
        Ok(self
            .generation_dir(target, stamp)?
            .join(Self::artifact_name(target, stamp)))
    }

    /// List generation stamps, most recent first, capped at
    /// `MAX_LISTED_GENERATIONS`. The stamp format sorts correctly as a
    /// string, so ordering is plain descending lexicographic.
    ///
    /// A category directory that was never created and one that exists but
    /// holds no generations both fail, with distinct messages.
    pub fn list_generations(
        &self,
        category: BackupCategory,
        workspace: Option<&str>,
    ) -> Result<Vec<BatchStamp>> {
        let dir = self.scope_dir(category, workspace)?;
        if !dir.exists() {
            return Err(AdminError::NoBackupsAvailable(format!(
                "{} has never been created",
                dir.display()
            )));
        }

        let mut names: Vec<String> = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        if names.is_empty() {
            return Err(AdminError::NoBackupsAvailable(format!(
                "no generations recorded under {}",
                dir.display()
            )));
        }

        names.sort_by(|a, b| b.cmp(a));
        names.truncate(MAX_LISTED_GENERATIONS);
        Ok(names.into_iter().map(BatchStamp::from_dir_name).collect())
    }

    /// True only if the generation directory holds at least one artifact
    /// matching the category's extension and, when a workspace is given,
    /// embedding it as a `_<ws>_` delimited token.
    pub fn validate_generation(
        &self,
        category: BackupCategory,
        workspace: Option<&str>,
        stamp: &BatchStamp,
    ) -> bool {
        match self.resolve_artifacts(category, workspace, stamp) {
            Ok(artifacts) => !artifacts.is_empty(),
            Err(err) => {
                debug!("Generation {stamp} rejected: {err}");
                false
            }
        }
    }

    /// Artifact paths matching a category/workspace within one generation.
    pub fn resolve_artifacts(
        &self,
        category: BackupCategory,
        workspace: Option<&str>,
        stamp: &BatchStamp,
    ) -> Result<Vec<PathBuf>> {
        let dir = self.scope_dir(category, workspace)?.join(stamp.as_str());
        if !dir.exists() {
            return Err(AdminError::NoArtifact(format!(
                "generation {stamp} does not exist under {}",
                dir.display()
            )));
        }

        let suffix = format!(".{}", category.extension());
        let ws_token = workspace.map(|ws| format!("_{ws}_"));

        let mut artifacts = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(&suffix) {
                continue;
            }
            if category.is_workspace_scoped() {
                if let Some(token) = &ws_token {
                    if !name.contains(token.as_str()) {
                        continue;
                    }
                }
            }
            artifacts.push(entry.path());
        }

        if artifacts.is_empty() {
            return Err(AdminError::NoArtifact(format!(
                "no {} artifact for generation {stamp} in {}",
                category,
                dir.display()
            )));
        }
        artifacts.sort();
        Ok(artifacts)
    }
}
