//! Backup target identity: categories, workspace scoping and batch stamps.

use crate::error::{AdminError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a backup covers. The category decides the artifact shape: a plain
/// config copy for `System`, a compressed archive for the workspace-scoped
/// kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupCategory {
    /// The single gateway configuration file
    System,
    /// An entire workspace directory tree
    Full,
    /// The curated markdown subset of a workspace
    Light,
}

impl BackupCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(BackupCategory::System),
            "full" => Some(BackupCategory::Full),
            "light" => Some(BackupCategory::Light),
            _ => None,
        }
    }

    /// Directory name under the backup root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            BackupCategory::System => "system",
            BackupCategory::Full => "full",
            BackupCategory::Light => "light",
        }
    }

    /// Artifact file extension for this category.
    pub fn extension(&self) -> &'static str {
        match self {
            BackupCategory::System => "json",
            BackupCategory::Full | BackupCategory::Light => "tar.gz",
        }
    }

    /// Whether targets of this category carry a workspace name.
    pub fn is_workspace_scoped(&self) -> bool {
        !matches!(self, BackupCategory::System)
    }
}

impl fmt::Display for BackupCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// On-disk format of a produced artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    TarGz,
}

impl ArtifactFormat {
    pub fn for_category(category: BackupCategory) -> Self {
        match category {
            BackupCategory::System => ArtifactFormat::Json,
            BackupCategory::Full | BackupCategory::Light => ArtifactFormat::TarGz,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::TarGz => "tar.gz",
        }
    }
}

/// A single thing to back up or restore: a category plus, for
/// workspace-scoped categories, the workspace name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupTarget {
    pub category: BackupCategory,
    pub workspace: Option<String>,
}

impl BackupTarget {
    /// Build a target, enforcing the category's workspace requirement.
    pub fn new(category: BackupCategory, workspace: Option<String>) -> Result<Self> {
        match (category.is_workspace_scoped(), &workspace) {
            (true, None) => Err(AdminError::InvalidSelection(format!(
                "{category} backups require a workspace name"
            ))),
            (false, Some(ws)) => Err(AdminError::InvalidSelection(format!(
                "system backups take no workspace (got '{ws}')"
            ))),
            _ => Ok(BackupTarget {
                category,
                workspace,
            }),
        }
    }

    pub fn system() -> Self {
        BackupTarget {
            category: BackupCategory::System,
            workspace: None,
        }
    }

    pub fn full(workspace: impl Into<String>) -> Self {
        BackupTarget {
            category: BackupCategory::Full,
            workspace: Some(workspace.into()),
        }
    }

    pub fn light(workspace: impl Into<String>) -> Self {
        BackupTarget {
            category: BackupCategory::Light,
            workspace: Some(workspace.into()),
        }
    }

    /// Label embedded in the artifact filename: `system`, `full_<ws>` or
    /// `light_<ws>`. The surrounding underscores in the final filename make
    /// the workspace name recoverable as a delimited token.
    pub fn mode_label(&self) -> String {
        match &self.workspace {
            Some(ws) => format!("{}_{}", self.category, ws),
            None => self.category.to_string(),
        }
    }

    pub fn describe(&self) -> String {
        match &self.workspace {
            Some(ws) => format!("workspace '{}' ({})", ws, self.category),
            None => "system config".to_string(),
        }
    }
}

impl fmt::Display for BackupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mode_label())
    }
}

/// Timestamp token shared by every artifact of one batch, formatted
/// `YYYYMMDD_HHMMSS` so lexicographic order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchStamp(String);

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl BatchStamp {
    /// Stamp for a batch starting now (local time).
    pub fn now() -> Self {
        BatchStamp(chrono::Local::now().format(STAMP_FORMAT).to_string())
    }

    /// Parse an operator-supplied stamp, rejecting malformed tokens.
    pub fn parse(s: &str) -> Result<Self> {
        NaiveDateTime::parse_from_str(s, STAMP_FORMAT)
            .map(|_| BatchStamp(s.to_string()))
            .map_err(|_| {
                AdminError::InvalidSelection(format!(
                    "'{s}' is not a YYYYMMDD_HHMMSS timestamp"
                ))
            })
    }

    /// Wrap a generation directory name as found on disk. Listing is
    /// lenient: directories that predate the naming convention still sort
    /// and restore correctly.
    pub fn from_dir_name(name: impl Into<String>) -> Self {
        BatchStamp(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable form for menus; falls back to the raw token when the
    /// directory name does not parse.
    pub fn display_human(&self) -> String {
        NaiveDateTime::parse_from_str(&self.0, STAMP_FORMAT)
            .map(|dt| dt.format(STAMP_DISPLAY_FORMAT).to_string())
            .unwrap_or_else(|_| self.0.clone())
    }
}

impl fmt::Display for BatchStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_and_extension() {
        assert_eq!(BackupCategory::parse("system"), Some(BackupCategory::System));
        assert_eq!(BackupCategory::parse("full"), Some(BackupCategory::Full));
        assert_eq!(BackupCategory::parse("light"), Some(BackupCategory::Light));
        assert_eq!(BackupCategory::parse("zip"), None);
        assert_eq!(BackupCategory::System.extension(), "json");
        assert_eq!(BackupCategory::Full.extension(), "tar.gz");
    }

    #[test]
    fn test_target_workspace_requirement() {
        assert!(BackupTarget::new(BackupCategory::Full, None).is_err());
        assert!(BackupTarget::new(BackupCategory::Light, None).is_err());
        assert!(BackupTarget::new(BackupCategory::System, Some("alpha".into())).is_err());
        assert!(BackupTarget::new(BackupCategory::System, None).is_ok());
        assert!(BackupTarget::new(BackupCategory::Full, Some("alpha".into())).is_ok());
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(BackupTarget::system().mode_label(), "system");
        assert_eq!(BackupTarget::full("alpha").mode_label(), "full_alpha");
        assert_eq!(BackupTarget::light("beta").mode_label(), "light_beta");
    }

    #[test]
    fn test_stamp_parse() {
        assert!(BatchStamp::parse("20260101_000000").is_ok());
        assert!(BatchStamp::parse("2026-01-01").is_err());
        assert!(BatchStamp::parse("20261301_000000").is_err()); // month 13
    }

    #[test]
    fn test_stamp_ordering_is_chronological() {
        let older = BatchStamp::from_dir_name("20260101_120000");
        let newer = BatchStamp::from_dir_name("20260102_000000");
        assert!(older < newer);
    }

    #[test]
    fn test_stamp_display_human() {
        let stamp = BatchStamp::from_dir_name("20260102_030405");
        assert_eq!(stamp.display_human(), "2026-01-02 03:04:05");
        let odd = BatchStamp::from_dir_name("not-a-stamp");
        assert_eq!(odd.display_human(), "not-a-stamp");
    }
}
