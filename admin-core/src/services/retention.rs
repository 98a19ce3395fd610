//! Retention sweep over the backup catalog.
//!
//! Each invocation deletes at most one stale generation per category
//! directory (the oldest), so a sweep is cheap and idempotent; repeated
//! invocations converge on `keep` generations. Deletion failures are logged
//! per directory and never abort the rest of the sweep.

use crate::catalog::Catalog;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Generations retained per category directory; floored at 1 so a sweep
    /// can never delete the only remaining backup.
    pub keep: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy { keep: 1 }
    }
}

impl RetentionPolicy {
    pub fn new(keep: usize) -> Self {
        RetentionPolicy { keep }
    }

    fn floor(&self) -> usize {
        self.keep.max(1)
    }
}

/// Delete the oldest generation under `category_root` if more than the
/// policy's floor exist. Returns the number of generations removed (0 or 1).
pub fn enforce(category_root: &Path, policy: &RetentionPolicy) -> usize {
    if !category_root.is_dir() {
        return 0;
    }

    let entries = match fs::read_dir(category_root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("[Retention] Cannot read {}: {e}", category_root.display());
            return 0;
        }
    };

    let mut generations: Vec<(String, std::path::PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        .collect();

    if generations.len() <= policy.floor() {
        return 0;
    }

    // stamps sort chronologically as strings; the first entry is the oldest
    generations.sort_by(|a, b| a.0.cmp(&b.0));
    let (name, path) = &generations[0];

    match fs::remove_dir_all(path) {
        Ok(()) => {
            info!(
                "[Retention] Removed generation {name} from {}",
                category_root.display()
            );
            1
        }
        Err(e) => {
            warn!("[Retention] Failed to remove {}: {e}", path.display());
            0
        }
    }
}

/// Run the sweep over every category directory: `system/`, `full/` and each
/// workspace folder under `light/`. Returns the total removed.
pub fn enforce_all(catalog: &Catalog, policy: &RetentionPolicy) -> usize {
    let root = catalog.root();
    let mut removed = enforce(&root.join("system"), policy);
    removed += enforce(&root.join("full"), policy);

    let light = root.join("light");
    if light.is_dir() {
        match fs::read_dir(&light) {
            Ok(entries) => {
                for entry in entries.filter_map(|e| e.ok()) {
                    if entry.path().is_dir() {
                        removed += enforce(&entry.path(), policy);
                    }
                }
            }
            Err(e) => warn!("[Retention] Cannot read {}: {e}", light.display()),
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed(root: &Path, stamps: &[&str]) {
        for stamp in stamps {
            let dir = root.join(stamp);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("artifact.tar.gz"), b"x").unwrap();
        }
    }

    fn listed(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_repeated_enforcement_converges_oldest_first() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("full");
        seed(
            &root,
            &[
                "20260101_000000",
                "20260102_000000",
                "20260103_000000",
                "20260104_000000",
            ],
        );
        let policy = RetentionPolicy::default();

        // K=4 generations, N calls leave max(1, K-N), oldest removed first
        assert_eq!(enforce(&root, &policy), 1);
        assert_eq!(
            listed(&root),
            vec!["20260102_000000", "20260103_000000", "20260104_000000"]
        );
        assert_eq!(enforce(&root, &policy), 1);
        assert_eq!(enforce(&root, &policy), 1);
        assert_eq!(listed(&root), vec!["20260104_000000"]);
        // converged: the last generation is never deleted
        assert_eq!(enforce(&root, &policy), 0);
        assert_eq!(listed(&root), vec!["20260104_000000"]);
    }

    #[test]
    fn test_keep_floor_is_respected() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("system");
        seed(&root, &["20260101_000000", "20260102_000000", "20260103_000000"]);

        let policy = RetentionPolicy::new(3);
        assert_eq!(enforce(&root, &policy), 0);
        assert_eq!(listed(&root).len(), 3);

        // keep = 0 still retains one
        let aggressive = RetentionPolicy::new(0);
        assert_eq!(enforce(&root, &aggressive), 1);
        assert_eq!(enforce(&root, &aggressive), 1);
        assert_eq!(enforce(&root, &aggressive), 0);
        assert_eq!(listed(&root).len(), 1);
    }

    #[test]
    fn test_missing_root_is_a_noop() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            enforce(&temp.path().join("ghost"), &RetentionPolicy::default()),
            0
        );
    }

    #[test]
    fn test_enforce_all_covers_light_workspaces() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::new(temp.path());
        seed(&temp.path().join("system"), &["20260101_000000", "20260102_000000"]);
        seed(&temp.path().join("full"), &["20260101_000000", "20260102_000000"]);
        seed(
            &temp.path().join("light/alpha"),
            &["20260101_000000", "20260102_000000"],
        );
        seed(&temp.path().join("light/beta"), &["20260101_000000"]);

        let removed = enforce_all(&catalog, &RetentionPolicy::default());
        assert_eq!(removed, 3); // system, full, light/alpha; light/beta untouched
        assert!(!temp.path().join("system/20260101_000000").exists());
        assert!(!temp.path().join("full/20260101_000000").exists());
        assert!(!temp.path().join("light/alpha/20260101_000000").exists());
        assert!(temp.path().join("light/beta/20260101_000000").exists());
    }

    #[test]
    fn test_files_among_generations_are_ignored() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("system");
        seed(&root, &["20260101_000000", "20260102_000000"]);
        fs::write(root.join("README.txt"), b"placeholder").unwrap();

        assert_eq!(enforce(&root, &RetentionPolicy::default()), 1);
        assert!(root.join("README.txt").exists());
        assert_eq!(listed(&root), vec!["20260102_000000"]);
    }
}
