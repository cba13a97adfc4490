//! In-memory index of existing work folders.
//!
//! Work folders live two levels below the download root
//! (`{root}/{mode_subdir}/{folder}`) and a work may have been downloaded by
//! any earlier listing, so lookups cover every subdirectory. The tree is
//! scanned once per run and kept current as the resolver creates and moves
//! folders; every hit is re-checked on disk before it is returned.

use crate::identity::{FolderMatch, WorkIdentity};
use crate::naming::split_segments;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Legacy lookup key: the three raw segments of a three-segment name.
type Triple = (String, String, String);

#[derive(Debug, Default)]
pub struct FolderIndex {
    by_name: HashMap<String, Vec<PathBuf>>,
    by_triple: HashMap<Triple, Vec<PathBuf>>,
}

impl FolderIndex {
    /// Scan `{root}/*/*` for directories. A missing root yields an empty index.
    pub fn scan(root: &Path) -> Self {
        let mut index = Self::default();
        if !root.is_dir() {
            return index;
        }

        for entry in WalkDir::new(root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
        {
            index.record(entry.path());
        }

        debug!(
            "Indexed {} work folders under {}",
            index.len(),
            root.display()
        );
        index
    }

    /// Number of distinct folder paths known to the index.
    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remember a work folder.
    pub fn record(&mut self, path: &Path) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let paths = self.by_name.entry(name.to_string()).or_default();
        if paths.iter().any(|p| p == path) {
            return;
        }
        paths.push(path.to_path_buf());

        if let Some(triple) = triple_of(name) {
            self.by_triple
                .entry(triple)
                .or_default()
                .push(path.to_path_buf());
        }
    }

    /// Drop a folder that was moved away.
    pub fn forget(&mut self, path: &Path) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        if let Some(paths) = self.by_name.get_mut(name) {
            paths.retain(|p| p != path);
            if paths.is_empty() {
                self.by_name.remove(name);
            }
        }
        if let Some(triple) = triple_of(name) {
            if let Some(paths) = self.by_triple.get_mut(&triple) {
                paths.retain(|p| p != path);
                if paths.is_empty() {
                    self.by_triple.remove(&triple);
                }
            }
        }
    }

    /// First folder anywhere under the root carrying the canonical name.
    pub fn find_canonical(&self, identity: &WorkIdentity) -> Option<PathBuf> {
        self.by_name
            .get(&identity.folder_name())?
            .iter()
            .find(|p| p.is_dir())
            .cloned()
    }

    /// First legacy-named folder of the same work.
    pub fn find_legacy(&self, identity: &WorkIdentity) -> Option<PathBuf> {
        let (_, _, total) = identity.legacy_key();
        // Legacy dates and titles are stored raw and compared sanitized, so
        // only the total can be looked up directly.
        self.by_triple
            .iter()
            .filter(|((_, _, t), _)| *t == total)
            .flat_map(|(_, paths)| paths.iter())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| identity.classify(n) == FolderMatch::Legacy)
                    .unwrap_or(false)
            })
            .filter(|p| p.is_dir())
            .min()
            .cloned()
    }
}

fn triple_of(name: &str) -> Option<Triple> {
    match split_segments(name).as_slice() {
        [a, b, c] => Some((a.to_string(), b.to_string(), c.to_string())),
        _ => None,
    }
}
