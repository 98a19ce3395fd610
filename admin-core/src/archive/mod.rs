//! Archive codec: single-file snapshots, gzip'd tar trees and selective
//! bundles, plus extraction.
//!
//! Workspace archives are rooted at the workspace directory name, so
//! extracting into the gateway home reproduces `<home>/<workspace>/...`.

use crate::error::{AdminError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};
use tracing::warn;
use walkdir::WalkDir;

/// Directory names never included in tree snapshots: version-control
/// metadata, virtualenv/dependency directories and build caches.
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    "venv",
    ".venv",
    "env",
    "cognee_env",
    "target",
    ".DS_Store",
];

/// Default exclusion predicate for workspace tree snapshots.
pub fn default_exclude(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}

/// Copy a single file, creating parent directories. Overwrites `dest`.
pub fn snapshot_file(src: &Path, dest: &Path) -> Result<()> {
    if !src.exists() {
        return Err(AdminError::SourceMissing(src.display().to_string()));
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dest)?;
    Ok(())
}

/// Produce a gzip'd tar archive of `src_dir`. The predicate is evaluated on
/// each entry's file name; a matching directory prunes its whole subtree.
pub fn snapshot_tree<F>(src_dir: &Path, dest_archive: &Path, exclude: F) -> Result<()>
where
    F: Fn(&str) -> bool,
{
    if !src_dir.is_dir() {
        return Err(AdminError::WorkspaceNotFound(src_dir.display().to_string()));
    }
    if let Some(parent) = dest_archive.parent() {
        fs::create_dir_all(parent)?;
    }

    let root_name = src_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string());

    let file = File::create(dest_archive)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    // depth 0 is the root itself and must never be pruned, even if the
    // workspace happens to share a name with an excluded directory
    let walker = WalkDir::new(src_dir).into_iter().filter_entry(|e| {
        e.depth() == 0 || !exclude(&e.file_name().to_string_lossy())
    });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = match entry.path().strip_prefix(src_dir) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if rel.as_os_str().is_empty() {
            continue;
        }
        let arc_path = Path::new(&root_name).join(rel);
        if entry.file_type().is_dir() {
            builder.append_dir(&arc_path, entry.path())?;
        } else if entry.file_type().is_file() {
            builder.append_path_with_name(entry.path(), &arc_path)?;
        }
        // symlinks are skipped: a workspace archive must stay
        // self-contained when unpacked on another machine
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Archive only the members of `file_names` that exist under `src_dir`.
/// Refuses to produce an empty archive.
pub fn snapshot_selected_files(
    src_dir: &Path,
    file_names: &[String],
    dest_archive: &Path,
) -> Result<()> {
    if !src_dir.is_dir() {
        return Err(AdminError::WorkspaceNotFound(src_dir.display().to_string()));
    }

    let present: Vec<PathBuf> = file_names
        .iter()
        .map(|name| src_dir.join(name))
        .filter(|path| path.is_file())
        .collect();
    if present.is_empty() {
        return Err(AdminError::NoMatchingFiles(format!(
            "{} has none of the expected files",
            src_dir.display()
        )));
    }

    if let Some(parent) = dest_archive.parent() {
        fs::create_dir_all(parent)?;
    }

    let root_name = src_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string());

    let file = File::create(dest_archive)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    for path in &present {
        let file_name = match path.file_name() {
            Some(name) => name,
            None => continue,
        };
        let arc_path = Path::new(&root_name).join(file_name);
        builder.append_path_with_name(path, &arc_path)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Extract every entry of a gzip'd tar archive into `dest_dir`, overwriting
/// existing files. Decode errors and filesystem errors are reported as
/// distinct failures.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    if !archive_path.exists() {
        return Err(AdminError::SourceMissing(
            archive_path.display().to_string(),
        ));
    }
    fs::create_dir_all(dest_dir)?;

    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    let entries = archive.entries().map_err(|e| {
        AdminError::CorruptArchive(format!("{}: {e}", archive_path.display()))
    })?;
    for entry in entries {
        let mut entry = entry.map_err(|e| {
            AdminError::CorruptArchive(format!("{}: {e}", archive_path.display()))
        })?;
        let unpacked = entry.unpack_in(dest_dir).map_err(|e| {
            AdminError::ExtractFailure(format!("{}: {e}", archive_path.display()))
        })?;
        if !unpacked {
            warn!(
                "Skipped unsafe entry {:?} in {}",
                entry.path().unwrap_or_default(),
                archive_path.display()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_file_round_trip() -> Result<()> {
        let temp = TempDir::new()?;
        let src = temp.path().join("openclaw.json");
        fs::write(&src, b"{\"gateway\": true}")?;

        let dest = temp.path().join("out/nested/openclaw.json");
        snapshot_file(&src, &dest)?;

        assert_eq!(fs::read(&src)?, fs::read(&dest)?);
        Ok(())
    }

    #[test]
    fn test_snapshot_file_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = snapshot_file(
            &temp.path().join("missing.json"),
            &temp.path().join("dest.json"),
        )
        .unwrap_err();
        assert!(matches!(err, AdminError::SourceMissing(_)));
    }

    #[test]
    fn test_tree_round_trip_with_exclusions() -> Result<()> {
        let temp = TempDir::new()?;
        let ws = temp.path().join("alpha");
        fs::create_dir_all(ws.join("notes"))?;
        fs::create_dir_all(ws.join(".git"))?;
        fs::create_dir_all(ws.join("node_modules/pkg"))?;
        fs::write(ws.join("HEARTBEAT.md"), b"beat")?;
        fs::write(ws.join("notes/todo.txt"), b"todo")?;
        fs::write(ws.join(".git/HEAD"), b"ref: main")?;
        fs::write(ws.join("node_modules/pkg/index.js"), b"x")?;

        let archive = temp.path().join("alpha.tar.gz");
        snapshot_tree(&ws, &archive, default_exclude)?;

        let out = temp.path().join("restored");
        extract(&archive, &out)?;

        assert_eq!(fs::read(out.join("alpha/HEARTBEAT.md"))?, b"beat");
        assert_eq!(fs::read(out.join("alpha/notes/todo.txt"))?, b"todo");
        assert!(!out.join("alpha/.git").exists());
        assert!(!out.join("alpha/node_modules").exists());
        Ok(())
    }

    #[test]
    fn test_snapshot_tree_missing_workspace() {
        let temp = TempDir::new().unwrap();
        let err = snapshot_tree(
            &temp.path().join("ghost"),
            &temp.path().join("ghost.tar.gz"),
            default_exclude,
        )
        .unwrap_err();
        assert!(matches!(err, AdminError::WorkspaceNotFound(_)));
    }

    #[test]
    fn test_selected_files_archives_existing_subset() -> Result<()> {
        let temp = TempDir::new()?;
        let ws = temp.path().join("beta");
        fs::create_dir_all(&ws)?;
        fs::write(ws.join("HEARTBEAT.md"), b"beat")?;
        fs::write(ws.join("MEMORY.md"), b"mem")?;
        fs::write(ws.join("scratch.txt"), b"ignore me")?;

        let wanted = vec![
            "HEARTBEAT.md".to_string(),
            "MEMORY.md".to_string(),
            "SOUL.md".to_string(), // absent
        ];
        let archive = temp.path().join("beta.tar.gz");
        snapshot_selected_files(&ws, &wanted, &archive)?;

        let out = temp.path().join("restored");
        extract(&archive, &out)?;
        assert_eq!(fs::read(out.join("beta/HEARTBEAT.md"))?, b"beat");
        assert_eq!(fs::read(out.join("beta/MEMORY.md"))?, b"mem");
        assert!(!out.join("beta/SOUL.md").exists());
        assert!(!out.join("beta/scratch.txt").exists());
        Ok(())
    }

    #[test]
    fn test_selected_files_none_present() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path().join("gamma");
        fs::create_dir_all(&ws).unwrap();
        fs::write(ws.join("other.txt"), b"x").unwrap();

        let err = snapshot_selected_files(
            &ws,
            &["HEARTBEAT.md".to_string()],
            &temp.path().join("gamma.tar.gz"),
        )
        .unwrap_err();
        assert!(matches!(err, AdminError::NoMatchingFiles(_)));
    }

    #[test]
    fn test_extract_overwrites_existing_files() -> Result<()> {
        let temp = TempDir::new()?;
        let ws = temp.path().join("alpha");
        fs::create_dir_all(&ws)?;
        fs::write(ws.join("HEARTBEAT.md"), b"new beat")?;

        let archive = temp.path().join("alpha.tar.gz");
        snapshot_tree(&ws, &archive, default_exclude)?;

        let out = temp.path().join("live");
        fs::create_dir_all(out.join("alpha"))?;
        fs::write(out.join("alpha/HEARTBEAT.md"), b"stale")?;

        extract(&archive, &out)?;
        assert_eq!(fs::read(out.join("alpha/HEARTBEAT.md"))?, b"new beat");
        Ok(())
    }

    #[test]
    fn test_extract_corrupt_archive() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("bogus.tar.gz");
        fs::write(&bogus, b"definitely not gzip data").unwrap();

        let err = extract(&bogus, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, AdminError::CorruptArchive(_)));
    }

    #[test]
    fn test_extract_missing_archive() {
        let temp = TempDir::new().unwrap();
        let err = extract(&temp.path().join("nope.tar.gz"), temp.path()).unwrap_err();
        assert!(matches!(err, AdminError::SourceMissing(_)));
    }
}
