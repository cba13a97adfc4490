//! Walking the list pages of a listing.
//!
//! The first list page decides the strategy:
//!
//! - **bounded**: the page states a result count and a last page; pages are
//!   visited from the start page (default: the last page) down to page 1;
//! - **unbounded**: pages are discovered by following next-page links from
//!   the start page (default: page 1) until a page has none.
//!
//! Independently, items are either collected from every page first and then
//! processed, or processed page by page. Within a page items are reversed so
//! that processing runs oldest first. Page 1 is never fetched twice.

use crate::config::{CrawlConfig, CrawlOrder};
use crate::error::{CrawlError, Result};
use crate::events::{CrawlEvent, DynEventSink};
use crate::extract::{parse_list_page, parse_next_page, parse_pagination, ListingItem, Pagination};
use crate::network::Fetcher;
use crate::pacing::Pacer;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// How list pages are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Descending from a known last page.
    Bounded,
    /// Following next-page links.
    Unbounded,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Bounded => f.write_str("bounded"),
            Strategy::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Result of handling one listing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Downloads were attempted or the directory was finalized.
    Processed,
    /// Nothing to do for this item.
    Skipped,
    /// The item could not be handled.
    Failed,
}

/// Handles the items the traversal yields.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    async fn process(&self, item: &ListingItem, strategy: Strategy) -> ItemOutcome;
}

/// Counters for one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages_visited: usize,
    pub pages_failed: usize,
    pub items_seen: usize,
    pub items_processed: usize,
    pub items_skipped: usize,
    pub items_failed: usize,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages visited ({} failed), {} items: {} processed, {} skipped, {} failed",
            self.pages_visited,
            self.pages_failed,
            self.items_seen,
            self.items_processed,
            self.items_skipped,
            self.items_failed
        )
    }
}

/// Which page comes next.
#[derive(Debug)]
struct PageCursor {
    strategy: Strategy,
    current: Option<u32>,
    visited: HashSet<u32>,
}

impl PageCursor {
    fn new(strategy: Strategy, start: u32) -> Self {
        Self {
            strategy,
            current: Some(start.max(1)),
            visited: HashSet::new(),
        }
    }

    fn current(&self) -> Option<u32> {
        self.current
    }

    /// Step past the current page. `next_link` is the page's next-page link,
    /// `None` when it had none or could not be fetched.
    fn advance(&mut self, next_link: Option<u32>) {
        let Some(page) = self.current else {
            return;
        };
        self.visited.insert(page);
        self.current = match self.strategy {
            Strategy::Bounded => page.checked_sub(1).filter(|p| *p >= 1),
            Strategy::Unbounded => next_link.filter(|next| !self.visited.contains(next)),
        };
    }
}

/// Items of one page, oldest first, plus where to go next.
struct LoadedPage {
    items: Vec<ListingItem>,
    next_page: Option<u32>,
}

/// Drives list-page traversal for one configuration.
pub struct ListTraversal {
    config: Arc<CrawlConfig>,
    fetcher: Arc<dyn Fetcher>,
    pacer: Arc<dyn Pacer>,
    events: DynEventSink,
}

impl ListTraversal {
    pub fn new(
        config: Arc<CrawlConfig>,
        fetcher: Arc<dyn Fetcher>,
        pacer: Arc<dyn Pacer>,
        events: DynEventSink,
    ) -> Self {
        Self {
            config,
            fetcher,
            pacer,
            events,
        }
    }

    /// Walk the listing and hand every item to `processor`.
    ///
    /// Fails only when the first list page cannot be fetched.
    pub async fn run(&self, processor: &dyn ItemProcessor) -> Result<CrawlSummary> {
        let first_url = self.config.list_page_url(1);
        let first_page = self
            .fetcher
            .fetch(&first_url)
            .await
            .map_err(|e| {
                self.events.emit(&CrawlEvent::PageFailed {
                    page: 1,
                    url: first_url.clone(),
                    error: e.to_string(),
                });
                CrawlError::FirstPageUnavailable {
                    url: first_url.clone(),
                }
            })?;

        let configured_start = self.config.start_page();
        let (strategy, start, last_page, total_items) = match parse_pagination(&first_page.body) {
            Pagination::Bounded {
                total_items,
                last_page,
            } => {
                let start = if configured_start > 0 {
                    configured_start
                } else {
                    last_page
                };
                (Strategy::Bounded, start, Some(last_page), Some(total_items))
            }
            Pagination::Unbounded => (Strategy::Unbounded, configured_start.max(1), None, None),
        };

        self.events.emit(&CrawlEvent::TraversalStarted {
            strategy,
            start_page: start,
            last_page,
            total_items,
        });

        let mut summary = CrawlSummary::default();
        let mut cursor = PageCursor::new(strategy, start);

        match self.config.order() {
            CrawlOrder::CollectThenProcess => {
                let mut collected = Vec::new();
                while let Some(page) = cursor.current() {
                    let loaded = self
                        .load_page(page, strategy, &first_page.body, &mut summary)
                        .await;
                    let next = loaded.as_ref().and_then(|p| p.next_page);
                    if let Some(loaded) = loaded {
                        collected.extend(loaded.items);
                    }
                    cursor.advance(next);
                }

                self.events.emit(&CrawlEvent::ItemsCollected {
                    count: collected.len(),
                });
                for item in &collected {
                    self.process_item(processor, item, strategy, &mut summary)
                        .await;
                }
            }
            CrawlOrder::Streaming => {
                while let Some(page) = cursor.current() {
                    let loaded = self
                        .load_page(page, strategy, &first_page.body, &mut summary)
                        .await;
                    let next = loaded.as_ref().and_then(|p| p.next_page);
                    if let Some(loaded) = loaded {
                        for item in &loaded.items {
                            self.process_item(processor, item, strategy, &mut summary)
                                .await;
                        }
                    }
                    cursor.advance(next);
                }
            }
        }

        Ok(summary)
    }

    /// Fetch (or reuse) and parse one list page. `None` if the fetch failed.
    async fn load_page(
        &self,
        page: u32,
        strategy: Strategy,
        first_page_html: &str,
        summary: &mut CrawlSummary,
    ) -> Option<LoadedPage> {
        let fetched;
        let html = if page == 1 {
            first_page_html
        } else {
            let url = self.config.list_page_url(page);
            match self.fetcher.fetch(&url).await {
                Ok(result) => {
                    fetched = result.body;
                    fetched.as_str()
                }
                Err(e) => {
                    summary.pages_failed += 1;
                    self.events.emit(&CrawlEvent::PageFailed {
                        page,
                        url,
                        error: e.to_string(),
                    });
                    return None;
                }
            }
        };

        let mut items = match parse_list_page(html, &self.config.origin()) {
            Some(items) => items,
            None => {
                self.events.emit(&CrawlEvent::ListContainerMissing { page });
                Vec::new()
            }
        };
        items.reverse();

        let next_page = match strategy {
            Strategy::Bounded => None,
            Strategy::Unbounded => parse_next_page(html),
        };

        summary.pages_visited += 1;
        self.events.emit(&CrawlEvent::PageVisited {
            page,
            items: items.len(),
        });
        Some(LoadedPage { items, next_page })
    }

    async fn process_item(
        &self,
        processor: &dyn ItemProcessor,
        item: &ListingItem,
        strategy: Strategy,
        summary: &mut CrawlSummary,
    ) {
        summary.items_seen += 1;
        match processor.process(item, strategy).await {
            ItemOutcome::Processed => summary.items_processed += 1,
            ItemOutcome::Skipped => summary.items_skipped += 1,
            ItemOutcome::Failed => summary.items_failed += 1,
        }
        self.pacer.pause(self.config.item_delay()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_cursor_descends_to_one() {
        let mut cursor = PageCursor::new(Strategy::Bounded, 3);
        let mut pages = Vec::new();
        while let Some(page) = cursor.current() {
            pages.push(page);
            cursor.advance(Some(99));
        }
        assert_eq!(pages, [3, 2, 1]);
    }

    #[test]
    fn test_unbounded_cursor_follows_links_without_loops() {
        let links = [(1, Some(2)), (2, Some(3)), (3, Some(2))];
        let mut cursor = PageCursor::new(Strategy::Unbounded, 1);
        let mut pages = Vec::new();
        while let Some(page) = cursor.current() {
            pages.push(page);
            let next = links.iter().find(|(p, _)| *p == page).and_then(|(_, n)| *n);
            cursor.advance(next);
        }
        assert_eq!(pages, [1, 2, 3]);
    }

    #[test]
    fn test_cursor_start_zero_is_page_one() {
        let cursor = PageCursor::new(Strategy::Unbounded, 0);
        assert_eq!(cursor.current(), Some(1));
    }

    #[test]
    fn test_summary_display() {
        let summary = CrawlSummary {
            pages_visited: 2,
            items_seen: 3,
            items_processed: 2,
            items_skipped: 1,
            ..Default::default()
        };
        assert_eq!(
            summary.to_string(),
            "2 pages visited (0 failed), 3 items: 2 processed, 1 skipped, 0 failed"
        );
    }
}
