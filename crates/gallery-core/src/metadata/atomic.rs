//! Atomic JSON persistence.
//!
//! Writes go to a sibling temp file that is synced and then renamed over the
//! target, so readers only ever see the old or the new record. The temp
//! name ends in `.tmp`, which the completion counter never counts.

use crate::error::{CrawlError, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;

/// Indentation used for every JSON file this crate writes.
const JSON_INDENT: &[u8] = b"    ";

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist, or an error if parsing fails.
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|e| CrawlError::Io {
        message: format!("Failed to read {}", path.display()),
        path: Some(path.to_path_buf()),
        source: Some(e),
    })?;

    let data: T = serde_json::from_str(&contents).map_err(|e| CrawlError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Serialize `data` as four-space-indented JSON, keeping non-ASCII text as is.
pub fn to_pretty_json<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(JSON_INDENT));
    data.serialize(&mut serializer).map_err(|e| CrawlError::Json {
        message: format!("Failed to serialize data: {}", e),
        source: Some(e),
    })?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write data to a JSON file atomically, creating the parent directory.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| CrawlError::Io {
                message: format!("Failed to create directory {}", parent.display()),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }
    }

    let serialized = to_pretty_json(data)?;
    let temp_path = temp_path_for(path);

    let write_result = (|| -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&serialized)?;
        file.flush()?;
        file.sync_all()
    })();

    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(CrawlError::Io {
            message: format!("Failed to write temp file {}", temp_path.display()),
            path: Some(temp_path),
            source: Some(e),
        });
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        CrawlError::Io {
            message: format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            path: Some(path.to_path_buf()),
            source: Some(e),
        }
    })?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data.json".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, process::id()))
}
