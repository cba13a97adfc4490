//! Detail pages: the story viewer link and the work slug.

use super::{element_text, resolve_url, url_path};
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Slug used when a detail URL has no path.
pub const UNKNOWN_SLUG: &str = "unknown";

const STORY_LINK_LABEL: &str = "view in story viewer";

static PAGINATOR_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#paginator a").unwrap());

/// Find the story viewer link of a detail page.
///
/// The link is the paginator anchor whose text contains
/// "view in story viewer" in any case. Relative links are resolved against
/// `detail_url`.
pub fn parse_story_link(html: &str, detail_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&PAGINATOR_LINKS)
        .find(|a| element_text(a).to_lowercase().contains(STORY_LINK_LABEL))
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| resolve_url(detail_url, href))
}

/// Last path segment of a detail URL.
///
/// ```
/// use gallery_core::extract::extract_slug;
///
/// assert_eq!(
///     extract_slug("https://example.com/image/ai-photo-22-ai-generated-2/"),
///     "ai-photo-22-ai-generated-2"
/// );
/// ```
pub fn extract_slug(detail_url: &str) -> String {
    url_path(detail_url)
        .trim_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(UNKNOWN_SLUG)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_link_found() {
        let html = r#"
            <div id="paginator"><a href="/prev/">Previous</a></div>
            <div id="paginator">
              <a href="https://example.com/story/night-walk/">  View in Story Viewer </a>
            </div>
        "#;
        assert_eq!(
            parse_story_link(html, "https://example.com/image/night-walk/"),
            Some("https://example.com/story/night-walk/".to_string())
        );
    }

    #[test]
    fn test_story_link_relative() {
        let html = r#"<div id="paginator"><a href="/story/x/">VIEW IN STORY VIEWER</a></div>"#;
        assert_eq!(
            parse_story_link(html, "https://example.com/image/x/"),
            Some("https://example.com/story/x/".to_string())
        );
    }

    #[test]
    fn test_story_link_missing() {
        assert_eq!(parse_story_link("<html></html>", "https://example.com/"), None);
        let outside = r#"<div><a href="/story/x/">View in Story Viewer</a></div>"#;
        assert_eq!(parse_story_link(outside, "https://example.com/"), None);
    }

    #[test]
    fn test_extract_slug() {
        assert_eq!(extract_slug("https://example.com/image/some-slug"), "some-slug");
        assert_eq!(extract_slug("https://example.com/image/some-slug/?ref=1"), "some-slug");
        assert_eq!(extract_slug("https://example.com/"), UNKNOWN_SLUG);
        assert_eq!(extract_slug(""), UNKNOWN_SLUG);
    }
}
