//! Completion accounting for a work directory.
//!
//! A work is finished when the number of downloaded media files plus the
//! number of recorded dead links reaches the expected total.

use crate::config::StorageConfig;
use crate::error::{CrawlError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Tally of finished entries in one directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Completion {
    /// Non-empty media files.
    pub finished_files: usize,
    /// Non-blank lines of the dead-link record.
    pub dead_links: usize,
}

impl Completion {
    /// Count a directory. A missing directory counts as zero.
    pub fn measure(dir: &Path) -> Self {
        Self {
            finished_files: count_finished_files(dir),
            dead_links: count_dead_links(dir),
        }
    }

    pub fn count(&self) -> usize {
        self.finished_files + self.dead_links
    }

    pub fn is_complete(&self, expected: u32) -> bool {
        self.count() >= expected as usize
    }
}

/// Whether a file name can count as a finished media file.
///
/// Reserved bookkeeping files, OS artifacts, hidden files and in-flight
/// temporary files never count.
pub fn is_countable_name(name: &str) -> bool {
    if name == StorageConfig::DEAD_LINKS_FILENAME
        || name == StorageConfig::METADATA_FILENAME
        || StorageConfig::OS_ARTIFACTS.contains(&name)
    {
        return false;
    }
    if name.starts_with('.') {
        return false;
    }
    let lower = name.to_lowercase();
    !StorageConfig::TEMP_SUFFIXES
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}

/// Count regular, non-empty, countable files directly inside `dir`.
pub fn count_finished_files(dir: &Path) -> usize {
    if !dir.is_dir() {
        return 0;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list {}: {}", dir.display(), e);
            return 0;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(is_countable_name)
                .unwrap_or(false)
        })
        .filter(|entry| {
            // Follow symlinks, like a plain `stat`.
            fs::metadata(entry.path())
                .map(|m| m.is_file() && m.len() > 0)
                .unwrap_or(false)
        })
        .count()
}

/// Count non-blank lines in the dead-link record of `dir`.
pub fn count_dead_links(dir: &Path) -> usize {
    let path = dir.join(StorageConfig::DEAD_LINKS_FILENAME);
    if !path.is_file() {
        return 0;
    }
    match fs::read(&path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count(),
        Err(e) => {
            warn!("Failed to read dead-link record {}: {}", path.display(), e);
            0
        }
    }
}

/// Append `url` to the dead-link record of `dir`.
///
/// Returns `false` when the URL was already recorded.
pub fn record_dead_link(dir: &Path, url: &str) -> Result<bool> {
    fs::create_dir_all(dir).map_err(|e| CrawlError::io_with_path(e, dir))?;
    let path = dir.join(StorageConfig::DEAD_LINKS_FILENAME);

    if path.is_file() {
        let existing = fs::read(&path).map_err(|e| CrawlError::io_with_path(e, &path))?;
        let known = String::from_utf8_lossy(&existing)
            .lines()
            .any(|line| line.trim() == url);
        if known {
            debug!("Dead link already recorded: {}", url);
            return Ok(false);
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| CrawlError::io_with_path(e, &path))?;
    writeln!(file, "{}", url).map_err(|e| CrawlError::io_with_path(e, &path))?;
    Ok(true)
}

/// True when `path` is a regular file with at least one byte.
pub fn file_exists_and_nonempty(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
