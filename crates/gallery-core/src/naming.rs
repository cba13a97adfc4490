//! Filesystem-safe folder-name segments.
//!
//! Work folder names are built from several segments joined by
//! [`StorageConfig::SEGMENT_SEPARATOR`]. Every segment goes through
//! [`sanitize_segment`] so that it never contains a path separator, a
//! character reserved on NTFS, or the segment separator itself.

use crate::config::StorageConfig;
use regex::Regex;
use std::sync::LazyLock;

/// Replacement used when a segment sanitizes down to nothing.
pub const EMPTY_SEGMENT: &str = "_";

/// NTFS-reserved characters mapped to full-width look-alikes.
///
/// Path separators become underscores instead so dates like `2013/04/15`
/// read as `2013_04_15`.
const RESERVED_CHAR_MAP: &[(char, char)] = &[
    ('/', '_'),
    ('\\', '_'),
    (':', '：'),
    ('*', '＊'),
    ('?', '？'),
    ('"', '＂'),
    ('<', '＜'),
    ('>', '＞'),
    ('|', '｜'),
    (StorageConfig::SEGMENT_SEPARATOR, '｜'),
];

/// Runs of whitespace (after trimming) collapse to one underscore.
static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Runs of underscores produced by the replacements above.
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

/// Keep the first `max_chars` code points of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Make one folder-name segment safe for every platform we write to.
///
/// # Rules Applied
/// 1. Map reserved characters to look-alikes (separators to `_`)
/// 2. Drop control and other non-printable characters
/// 3. Trim, then collapse whitespace runs to a single `_`
/// 4. Collapse repeated underscores
/// 5. Ensure non-empty result
///
/// # Examples
///
/// ```
/// use gallery_core::naming::sanitize_segment;
///
/// assert_eq!(sanitize_segment("A B  C"), "A_B_C");
/// assert_eq!(sanitize_segment("2013/04/15"), "2013_04_15");
/// assert_eq!(sanitize_segment("   "), "_");
/// ```
pub fn sanitize_segment(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| {
            RESERVED_CHAR_MAP
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .filter(|c| !is_non_printable(*c))
        .collect();

    let collapsed = WHITESPACE_RUNS.replace_all(mapped.trim(), "_");
    let result = UNDERSCORE_RUNS.replace_all(&collapsed, "_").to_string();

    if result.is_empty() {
        EMPTY_SEGMENT.to_string()
    } else {
        result
    }
}

/// Control characters plus the invisible format characters that tend to
/// sneak into scraped titles.
fn is_non_printable(c: char) -> bool {
    if c.is_whitespace() {
        return false;
    }
    c.is_control() || matches!(c, '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{FEFF}')
}

/// Join segments with the folder-name separator.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(StorageConfig::SEGMENT_SEPARATOR);
        }
        out.push_str(segment.as_ref());
    }
    out
}

/// Split a folder name into its segments.
pub fn split_segments(name: &str) -> Vec<&str> {
    name.split(StorageConfig::SEGMENT_SEPARATOR).collect()
}
