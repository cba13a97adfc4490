//! List pages: entries and pagination.

use super::{element_text, normalize_whitespace, resolve_url};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Title used when an entry has no title link.
pub const DEFAULT_TITLE: &str = "No Title";

static LIST_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul#image-list").unwrap());
static LIST_ENTRY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static ENTRY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".image-list-item-image a").unwrap());
static ENTRY_IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static ENTRY_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".image-list-item-title a").unwrap());
static ENTRY_DATE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".image-list-item-regist-date span").unwrap());

static TOTAL_COUNT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#articles_number .immoral_all_items").unwrap());
static LAST_PAGE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".wp-pagenavi a.last").unwrap());
static NEXT_PAGE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".wp-pagenavi a.nextpostslink").unwrap());

static PAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/page/(\d+)/").unwrap());

/// One entry of a list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    /// Absolute detail page URL; empty when the entry had no link.
    pub detail_url: String,
    pub thumb_url: String,
    pub title: String,
    /// Registration date as shown, possibly empty.
    pub date: String,
}

/// What the first list page says about the size of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// Result count and last page number are both known.
    Bounded { total_items: u32, last_page: u32 },
    /// Pages can only be discovered through next-page links.
    Unbounded,
}

/// Parse the entries of a list page.
///
/// Returns `None` when the list container is missing. Entry links are
/// resolved against `origin` (`https://{domain}`).
pub fn parse_list_page(html: &str, origin: &str) -> Option<Vec<ListingItem>> {
    let document = Html::parse_document(html);
    let container = document.select(&LIST_CONTAINER).next()?;

    let items = container
        .select(&LIST_ENTRY)
        .map(|entry| {
            let link = entry.select(&ENTRY_LINK).next();
            let detail_url = link
                .and_then(|a| a.value().attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty())
                .map(|href| resolve_url(origin, href))
                .unwrap_or_default();
            let thumb_url = link
                .and_then(|a| a.select(&ENTRY_IMG).next())
                .and_then(|img| img.value().attr("src"))
                .unwrap_or_default()
                .to_string();

            let title = entry
                .select(&ENTRY_TITLE)
                .next()
                .map(|a| normalize_whitespace(&element_text(&a)))
                .unwrap_or_else(|| DEFAULT_TITLE.to_string());

            let date = entry
                .select(&ENTRY_DATE)
                .next()
                .map(|span| element_text(&span))
                .unwrap_or_default();

            ListingItem {
                detail_url,
                thumb_url,
                title,
                date,
            }
        })
        .collect();

    Some(items)
}

/// Classify a list page by its result count and last-page link.
pub fn parse_pagination(html: &str) -> Pagination {
    let document = Html::parse_document(html);

    let total_items = document
        .select(&TOTAL_COUNT)
        .next()
        .map(|span| element_text(&span))
        .filter(|text| !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()))
        .and_then(|text| text.parse::<u32>().ok())
        .unwrap_or(0);

    let last_page = document
        .select(&LAST_PAGE_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(page_number_in);

    match last_page {
        Some(last_page) if total_items > 0 => Pagination::Bounded {
            total_items,
            last_page,
        },
        _ => Pagination::Unbounded,
    }
}

/// Page number of the next-page link, if any.
pub fn parse_next_page(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    document
        .select(&NEXT_PAGE_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(page_number_in)
}

fn page_number_in(href: &str) -> Option<u32> {
    PAGE_NUMBER
        .captures(href)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
