//! Metadata persistence.
//!
//! This module provides:
//! - Atomic JSON file operations
//! - The `meta.json` record written into every work directory

mod atomic;
mod record;

pub use atomic::{atomic_read_json, atomic_write_json, to_pretty_json};
pub use record::{
    metadata_path, read_metadata, refresh_after_migration, timestamp_now, write_metadata,
    FileType, WorkMetadata, TIMESTAMP_FORMAT,
};
