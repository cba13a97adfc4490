//! Moving a legacy work folder to its canonical name.
//!
//! The move never overwrites: if the canonical folder already exists the
//! call succeeds and reports that folder, which makes re-running a
//! half-finished migration harmless. A rename is attempted first; across
//! filesystems the tree is copied and the source removed.

use crate::error::{CrawlError, Result};
use crate::metadata::refresh_after_migration;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a migration call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The folder was moved to the returned path.
    Moved(PathBuf),
    /// The destination already existed; nothing was touched.
    AlreadyExists(PathBuf),
    /// Dry run: the folder would have been moved to the returned path.
    DryRun(PathBuf),
}

impl MigrationOutcome {
    /// Resolved destination, whatever happened.
    pub fn path(&self) -> &Path {
        match self {
            MigrationOutcome::Moved(p)
            | MigrationOutcome::AlreadyExists(p)
            | MigrationOutcome::DryRun(p) => p,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            MigrationOutcome::Moved(p)
            | MigrationOutcome::AlreadyExists(p)
            | MigrationOutcome::DryRun(p) => p,
        }
    }
}

/// Move `old_dir` to `new_parent/new_name`.
///
/// On a real move the folder's metadata record (if any) is updated to carry
/// `hash` and a fresh timestamp. A failed metadata update is logged and does
/// not fail the migration.
pub fn migrate_dir(
    old_dir: &Path,
    new_parent: &Path,
    new_name: &str,
    hash: &str,
    dry_run: bool,
) -> Result<MigrationOutcome> {
    if !old_dir.is_dir() {
        return Err(CrawlError::NotADirectory(old_dir.to_path_buf()));
    }

    let new_dir = new_parent.join(new_name);
    if new_dir.is_dir() {
        info!(
            "Migration target already exists, leaving {} in place: {}",
            old_dir.display(),
            new_dir.display()
        );
        return Ok(MigrationOutcome::AlreadyExists(new_dir));
    }

    info!(
        "Migrating {} -> {} (dry_run={})",
        old_dir.display(),
        new_dir.display(),
        dry_run
    );
    if dry_run {
        return Ok(MigrationOutcome::DryRun(new_dir));
    }

    fs::create_dir_all(new_parent).map_err(|e| CrawlError::io_with_path(e, new_parent))?;
    move_directory(old_dir, &new_dir).map_err(|e| CrawlError::MigrationFailed {
        src: old_dir.to_path_buf(),
        dest: new_dir.clone(),
        message: e.to_string(),
    })?;

    match refresh_after_migration(&new_dir, hash) {
        Ok(true) => debug!("Updated metadata hash in {}", new_dir.display()),
        Ok(false) => {}
        Err(e) => warn!("Failed to update metadata in {}: {}", new_dir.display(), e),
    }

    Ok(MigrationOutcome::Moved(new_dir))
}

/// Move a directory, falling back to copy+delete for cross-filesystem moves.
fn move_directory(src: &Path, dest: &Path) -> Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(
                "Rename {} -> {} failed ({}), copying instead",
                src.display(),
                dest.display(),
                e
            );
            if let Err(copy_err) = copy_dir_recursive(src, dest) {
                // Leave the source untouched and do not keep a partial copy.
                let _ = fs::remove_dir_all(dest);
                return Err(copy_err);
            }
            fs::remove_dir_all(src).map_err(|e| CrawlError::Io {
                message: format!("Failed to clean up source after copy: {}", src.display()),
                path: Some(src.to_path_buf()),
                source: Some(e),
            })
        }
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).map_err(|e| CrawlError::io_with_path(e, dest))?;

    for entry in fs::read_dir(src).map_err(|e| CrawlError::io_with_path(e, src))? {
        let entry = entry.map_err(|e| CrawlError::io_with_path(e, src))?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dest_path)?;
        } else {
            fs::copy(&src_path, &dest_path).map_err(|e| CrawlError::Io {
                message: format!(
                    "Failed to copy file: {} -> {}",
                    src_path.display(),
                    dest_path.display()
                ),
                path: Some(src_path.clone()),
                source: Some(e),
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use tempfile::TempDir;

    fn legacy_dir(root: &Path) -> PathBuf {
        let dir = root.join("kw_old").join("2020丨Title丨2");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("1.jpg"), b"one").unwrap();
        fs::write(dir.join("2.jpg"), b"two").unwrap();
        dir
    }

    #[test]
    fn test_moves_contents() {
        let tmp = TempDir::new().unwrap();
        let old = legacy_dir(tmp.path());
        let parent = tmp.path().join("kw_new");

        let outcome = migrate_dir(&old, &parent, "2020丨Title丨2丨abcd1234", "abcd1234", false)
            .unwrap();
        let new_dir = parent.join("2020丨Title丨2丨abcd1234");
        assert_eq!(outcome, MigrationOutcome::Moved(new_dir.clone()));
        assert!(!old.exists());
        assert_eq!(fs::read(new_dir.join("1.jpg")).unwrap(), b"one");
        assert_eq!(fs::read(new_dir.join("2.jpg")).unwrap(), b"two");
    }

    #[test]
    fn test_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let old = legacy_dir(tmp.path());
        let parent = tmp.path().join("kw_new");
        let name = "2020丨Title丨2丨abcd1234";

        let first = migrate_dir(&old, &parent, name, "abcd1234", false).unwrap();

        // Simulate a crash that left a copy of the legacy folder behind.
        let again = legacy_dir(tmp.path());
        let second = migrate_dir(&again, &parent, name, "abcd1234", false).unwrap();

        assert_eq!(first.path(), second.path());
        assert!(matches!(second, MigrationOutcome::AlreadyExists(_)));
        // Nothing was duplicated into the destination and the source is intact.
        assert_eq!(fs::read_dir(first.path()).unwrap().count(), 2);
        assert!(again.join("1.jpg").exists());
    }

    #[test]
    fn test_dry_run_leaves_source() {
        let tmp = TempDir::new().unwrap();
        let old = legacy_dir(tmp.path());
        let parent = tmp.path().join("kw_new");

        let outcome = migrate_dir(&old, &parent, "new丨name丨2丨abcd1234", "abcd1234", true)
            .unwrap();
        assert_eq!(
            outcome,
            MigrationOutcome::DryRun(parent.join("new丨name丨2丨abcd1234"))
        );
        assert!(!outcome.path().exists());
        assert_eq!(fs::read_dir(&old).unwrap().count(), 2);
    }

    #[test]
    fn test_missing_source_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = migrate_dir(&tmp.path().join("gone"), tmp.path(), "x", "h", false);
        assert!(matches!(result, Err(CrawlError::NotADirectory(_))));
    }

    #[test]
    fn test_refreshes_metadata_hash() {
        let tmp = TempDir::new().unwrap();
        let old = legacy_dir(tmp.path());
        fs::write(
            old.join(StorageConfig::METADATA_FILENAME),
            r#"{"slug":"s","title":"Title","total":2}"#,
        )
        .unwrap();

        let outcome =
            migrate_dir(&old, tmp.path(), "2020丨Title丨2丨abcd1234", "abcd1234", false).unwrap();
        let raw = fs::read_to_string(outcome.path().join(StorageConfig::METADATA_FILENAME))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["hash"], "abcd1234");
        assert_eq!(value["title_truncated"], "Title");
        assert!(value["download_time"].is_string());
    }

    #[test]
    fn test_undated_destination_gets_hash_too() {
        let tmp = TempDir::new().unwrap();
        let old = legacy_dir(tmp.path());
        fs::write(
            old.join(StorageConfig::METADATA_FILENAME),
            r#"{"slug":"s","title":"Two Words","total":2}"#,
        )
        .unwrap();

        let outcome =
            migrate_dir(&old, tmp.path(), "abcd1234丨Two_Words丨2", "abcd1234", false).unwrap();
        let raw = fs::read_to_string(outcome.path().join(StorageConfig::METADATA_FILENAME))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["hash"], "abcd1234");
        assert_eq!(value["title_truncated"], "Two_Words");
    }

    #[test]
    fn test_copy_dir_recursive_nested() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("inner")).unwrap();
        fs::write(src.join("inner").join("f"), b"x").unwrap();
        let dest = tmp.path().join("dest");

        copy_dir_recursive(&src, &dest).unwrap();
        assert_eq!(fs::read(dest.join("inner").join("f")).unwrap(), b"x");
    }
}
