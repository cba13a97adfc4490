//! The per-work `meta.json` record.

use super::atomic::{atomic_read_json, atomic_write_json};
use crate::config::StorageConfig;
use crate::error::Result;
use crate::naming::{sanitize_segment, truncate_chars};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Timestamp layout used in `download_time`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Kind of media a work holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Video,
}

/// Description of one downloaded work, stored next to its media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkMetadata {
    pub slug: String,
    pub hash: String,
    pub title: String,
    /// Title as it appears in the folder name: truncated, then sanitized.
    pub title_truncated: String,
    pub date: String,
    pub total: u32,
    pub file_type: FileType,
    pub thumb_url: String,
    pub list_source: String,
    pub download_time: String,
    /// Detail page the work was found on.
    #[serde(rename = "source")]
    pub source_url: String,
}

pub fn metadata_path(dir: &Path) -> PathBuf {
    dir.join(StorageConfig::METADATA_FILENAME)
}

/// Write (overwrite) the record of `dir`, creating the directory if needed.
pub fn write_metadata(dir: &Path, metadata: &WorkMetadata) -> Result<PathBuf> {
    let path = metadata_path(dir);
    atomic_write_json(&path, metadata)?;
    debug!("Wrote metadata {}", path.display());
    Ok(path)
}

/// Read the record of `dir`; `None` if there is none.
pub fn read_metadata(dir: &Path) -> Result<Option<WorkMetadata>> {
    atomic_read_json(&metadata_path(dir))
}

/// Stamp a migrated folder's record with its content hash.
///
/// Unknown fields are preserved. A record that cannot be parsed is replaced
/// by one holding only the refreshed fields. Returns `false` when the folder
/// has no record.
pub fn refresh_after_migration(dir: &Path, hash: &str) -> Result<bool> {
    let path = metadata_path(dir);
    if !path.is_file() {
        return Ok(false);
    }

    let mut record = match atomic_read_json::<Value>(&path) {
        Ok(Some(Value::Object(map))) => map,
        Ok(_) => Map::new(),
        Err(e) => {
            warn!("Replacing unreadable metadata {}: {}", path.display(), e);
            Map::new()
        }
    };

    record.insert("hash".to_string(), Value::String(hash.to_string()));
    if !record.contains_key("title_truncated") {
        if let Some(title) = record.get("title").and_then(Value::as_str) {
            let truncated =
                sanitize_segment(truncate_chars(title, StorageConfig::TITLE_MAX_CHARS));
            record.insert("title_truncated".to_string(), Value::String(truncated));
        }
    }
    record.insert(
        "download_time".to_string(),
        Value::String(timestamp_now()),
    );

    atomic_write_json(&path, &Value::Object(record))?;
    Ok(true)
}
