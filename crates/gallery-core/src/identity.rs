//! Canonical identity of a work and the folder names derived from it.
//!
//! A work is identified by the MD5 of its slug, so its folder can be found
//! again after the site retitles or redates it. Two name layouts exist:
//!
//! - dated: `{date}丨{title}丨{total}丨{hash8}`
//! - undated ("special"): `{hash8}丨{title}丨{total}`
//!
//! Folders written before hashes were introduced use `{date}丨{title}丨{total}`
//! and are recognised as legacy names of an identity by [`WorkIdentity::classify`].

use crate::config::StorageConfig;
use crate::naming::{join_segments, sanitize_segment, split_segments, truncate_chars};
use md5::{Digest, Md5};

/// Number of hex characters kept from the slug digest.
pub const HASH_LEN: usize = 8;

/// First [`HASH_LEN`] lowercase hex digits of `md5(slug)`.
pub fn content_hash(slug: &str) -> String {
    let digest = Md5::digest(slug.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_LEN);
    hex
}

/// Everything needed to name, find and describe one work directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkIdentity {
    /// Listing date as scraped, possibly empty.
    pub date: String,
    /// Full title as scraped.
    pub title: String,
    /// First 100 code points of the title, before sanitizing.
    pub title_truncated: String,
    /// Sanitized truncated title, as it appears in folder names.
    pub title_clean: String,
    /// Sanitized date, as it appears in folder names.
    pub date_clean: String,
    /// Expected number of finished entries (files plus dead links).
    pub total: u32,
    pub slug: String,
    pub content_hash: String,
    /// Undated works use the hash-first layout.
    pub is_special: bool,
}

/// How a folder name relates to a given identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderMatch {
    /// Exactly the canonical name.
    Canonical,
    /// Old `{date}丨{title}丨{total}` name of the same work.
    Legacy,
    Unrelated,
}

impl WorkIdentity {
    /// Build an identity. A missing title is treated as empty.
    pub fn build(date: &str, title: Option<&str>, total: u32, slug: &str, is_special: bool) -> Self {
        let title = title.unwrap_or_default().to_string();
        let title_truncated = truncate_chars(&title, StorageConfig::TITLE_MAX_CHARS).to_string();
        Self {
            date: date.to_string(),
            title_clean: sanitize_segment(&title_truncated),
            date_clean: sanitize_segment(date),
            title_truncated,
            title,
            total,
            slug: slug.to_string(),
            content_hash: content_hash(slug),
            is_special,
        }
    }

    /// Build an identity whose special flag follows the date: undated works are special.
    pub fn from_listing(date: &str, title: &str, total: u32, slug: &str) -> Self {
        Self::build(date, Some(title), total, slug, date.trim().is_empty())
    }

    /// Canonical folder name for this work.
    pub fn folder_name(&self) -> String {
        let total = self.total.to_string();
        if self.is_special {
            join_segments(&[self.content_hash.as_str(), &self.title_clean, &total])
        } else {
            join_segments(&[
                self.date_clean.as_str(),
                &self.title_clean,
                &total,
                &self.content_hash,
            ])
        }
    }

    /// `(date, title, total)` as a legacy folder of this work would carry them.
    pub fn legacy_key(&self) -> (String, String, String) {
        let date = if self.is_special {
            String::new()
        } else {
            self.date_clean.clone()
        };
        (date, self.title_clean.clone(), self.total.to_string())
    }

    /// Classify a folder name relative to this identity.
    ///
    /// A three-segment name is both the legacy layout and the undated
    /// canonical layout, so the answer is only meaningful for this identity:
    /// an exact canonical match always wins, and a legacy match needs the
    /// date-first triple to line up. Legacy segments were written unsanitized,
    /// so `Night Walk` matches a clean title of `Night_Walk`.
    pub fn classify(&self, folder_name: &str) -> FolderMatch {
        if folder_name == self.folder_name() {
            return FolderMatch::Canonical;
        }
        let segments = split_segments(folder_name);
        if segments.len() != 3 {
            return FolderMatch::Unrelated;
        }
        let (date, title, total) = self.legacy_key();
        let legacy_title = truncate_chars(segments[1], StorageConfig::TITLE_MAX_CHARS);
        if legacy_segment_matches(segments[0], &date)
            && legacy_segment_matches(legacy_title, &title)
            && segments[2] == total
        {
            FolderMatch::Legacy
        } else {
            FolderMatch::Unrelated
        }
    }

    /// Whether a directory name still needs migrating to the canonical name:
    /// three segments that are not this work's own undated canonical name.
    pub fn is_legacy_form(&self, folder_name: &str) -> bool {
        split_segments(folder_name).len() == 3 && folder_name != self.folder_name()
    }
}

/// A legacy segment matches when it is the clean form already or sanitizes to it.
fn legacy_segment_matches(raw: &str, clean: &str) -> bool {
    raw == clean || (!raw.is_empty() && sanitize_segment(raw) == clean)
}
