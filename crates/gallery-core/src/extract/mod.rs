//! Stateless HTML extractors for list pages, detail pages and the story viewer.
//!
//! A missing element is never an error here: it is reported as an absent
//! value and the caller decides what that means.

mod detail;
mod list;
mod story;

pub use detail::{extract_slug, parse_story_link};
pub use list::{parse_list_page, parse_next_page, parse_pagination, ListingItem, Pagination};
pub use story::{parse_story_viewer, ImageInfo, StoryViewer, TotalSource, VideoPlan};

use scraper::ElementRef;
use url::Url;

/// Text content with every text node trimmed and empty nodes dropped.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

/// Collapse whitespace runs to single spaces.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve `href` against `base`; falls back to `href` unchanged.
pub(crate) fn resolve_url(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// Path of a URL without query or fragment.
pub(crate) fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(&['?', '#'][..])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Final segment of a URL path; empty when the path ends in `/`.
pub(crate) fn last_path_segment(url: &str) -> String {
    url_path(url)
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
