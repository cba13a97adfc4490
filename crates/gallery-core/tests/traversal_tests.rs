//! Integration tests for list traversal: page discovery and processing order.

mod common;

use async_trait::async_trait;
use common::*;
use gallery_core::config::CrawlOrder;
use gallery_core::extract::ListingItem;
use gallery_core::pacing::NoPacer;
use gallery_core::{
    CrawlError, CrawlEvent, ItemOutcome, ItemProcessor, ListTraversal, RecordingSink, Strategy,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Records the slug of every item and how many requests had been made by then.
struct RecordingProcessor {
    fetcher: Arc<MapFetcher>,
    seen: Mutex<Vec<(String, usize, Strategy)>>,
}

impl RecordingProcessor {
    fn new(fetcher: Arc<MapFetcher>) -> Self {
        Self {
            fetcher,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn slugs(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(slug, _, _)| slug.clone())
            .collect()
    }

    fn requests_at_first_item(&self) -> usize {
        self.seen.lock().unwrap()[0].1
    }
}

#[async_trait]
impl ItemProcessor for RecordingProcessor {
    async fn process(&self, item: &ListingItem, strategy: Strategy) -> ItemOutcome {
        let slug = gallery_core::extract::extract_slug(&item.detail_url);
        let requests = self.fetcher.requests().len();
        self.seen.lock().unwrap().push((slug, requests, strategy));
        ItemOutcome::Processed
    }
}

/// Cycles through processed, skipped and failed outcomes.
#[derive(Default)]
struct MixedProcessor {
    calls: AtomicUsize,
}

#[async_trait]
impl ItemProcessor for MixedProcessor {
    async fn process(&self, _item: &ListingItem, _strategy: Strategy) -> ItemOutcome {
        match self.calls.fetch_add(1, Ordering::SeqCst) % 3 {
            0 => ItemOutcome::Processed,
            1 => ItemOutcome::Skipped,
            _ => ItemOutcome::Failed,
        }
    }
}

fn two_items(page: u32) -> Vec<String> {
    vec![format!("p{page}-new"), format!("p{page}-old")]
}

/// Page `page` with two entries, newest first as the site lists them.
fn page_html(page: u32, nav: Nav) -> String {
    let slugs = two_items(page);
    let entries: Vec<Entry<'_>> = slugs
        .iter()
        .map(|slug| Entry::new(slug, "Title", "2024-01-01"))
        .collect();
    list_page(&entries, nav)
}

fn run_setup(
    fetcher: MapFetcher,
    order: CrawlOrder,
    start_page: u32,
) -> (
    TempDir,
    Arc<MapFetcher>,
    Arc<RecordingSink>,
    ListTraversal,
    RecordingProcessor,
) {
    let tmp = TempDir::new().unwrap();
    let fetcher = Arc::new(fetcher);
    let sink = Arc::new(RecordingSink::new());
    let traversal = ListTraversal::new(
        Arc::new(config(tmp.path(), order, start_page)),
        fetcher.clone(),
        Arc::new(NoPacer),
        sink.clone(),
    );
    let processor = RecordingProcessor::new(fetcher.clone());
    (tmp, fetcher, sink, traversal, processor)
}

fn five_linked_pages() -> MapFetcher {
    (1..=5).fold(MapFetcher::new(), |fetcher, page| {
        let next = if page < 5 { Some(page + 1) } else { None };
        fetcher.page(list_url(page), page_html(page, Nav::Next(next)))
    })
}

#[tokio::test]
async fn test_unbounded_stops_when_next_link_missing() {
    let (_tmp, fetcher, _sink, traversal, processor) =
        run_setup(five_linked_pages(), CrawlOrder::Streaming, 0);

    let summary = traversal.run(&processor).await.unwrap();

    assert_eq!(summary.pages_visited, 5);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.items_seen, 10);
    assert_eq!(summary.items_processed, 10);
    // Page 1 is fetched once, to classify the listing.
    assert_eq!(fetcher.requests().len(), 5);
    assert_eq!(fetcher.count_requests(&list_url(1)), 1);

    let expected: Vec<String> = (1..=5)
        .flat_map(|page| two_items(page).into_iter().rev())
        .collect();
    assert_eq!(processor.slugs(), expected);
    assert!(processor
        .seen
        .lock()
        .unwrap()
        .iter()
        .all(|(_, _, strategy)| *strategy == Strategy::Unbounded));
}

#[tokio::test]
async fn test_streaming_processes_before_next_page() {
    let (_tmp, _fetcher, _sink, traversal, processor) =
        run_setup(five_linked_pages(), CrawlOrder::Streaming, 0);

    traversal.run(&processor).await.unwrap();
    // Only page 1 has been requested when its first item is processed.
    assert_eq!(processor.requests_at_first_item(), 1);
}

#[tokio::test]
async fn test_unbounded_start_page_override() {
    let (_tmp, fetcher, _sink, traversal, processor) =
        run_setup(five_linked_pages(), CrawlOrder::Streaming, 4);

    let summary = traversal.run(&processor).await.unwrap();
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(
        processor.slugs(),
        vec!["p4-old", "p4-new", "p5-old", "p5-new"]
    );
    // Page 1 is still fetched to classify the listing.
    assert_eq!(fetcher.count_requests(&list_url(1)), 1);
}

#[tokio::test]
async fn test_unbounded_fetch_failure_ends_traversal() {
    // Page 3 is down; page 4 is never reached without its link.
    for order in [CrawlOrder::Streaming, CrawlOrder::CollectThenProcess] {
        let fetcher = MapFetcher::new()
            .page(list_url(1), page_html(1, Nav::Next(Some(2))))
            .page(list_url(2), page_html(2, Nav::Next(Some(3))))
            .page(list_url(4), page_html(4, Nav::Next(None)));
        let (_tmp, _fetcher, sink, traversal, processor) = run_setup(fetcher, order, 0);

        let summary = traversal.run(&processor).await.unwrap();
        assert_eq!(summary.pages_visited, 2);
        assert_eq!(summary.pages_failed, 1);
        assert_eq!(summary.items_seen, 4);
        assert_eq!(
            sink.filtered(|e| matches!(e, CrawlEvent::PageFailed { page: 3, .. }))
                .len(),
            1
        );
    }
}

#[tokio::test]
async fn test_unbounded_link_loop_is_not_followed() {
    let fetcher = MapFetcher::new()
        .page(list_url(1), page_html(1, Nav::Next(Some(2))))
        .page(list_url(2), page_html(2, Nav::Next(Some(1))));
    let (_tmp, fetcher, _sink, traversal, processor) =
        run_setup(fetcher, CrawlOrder::Streaming, 0);

    let summary = traversal.run(&processor).await.unwrap();
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(fetcher.requests().len(), 2);
}

fn three_bounded_pages() -> MapFetcher {
    let nav = || Nav::Bounded { total: 6, last: 3 };
    MapFetcher::new()
        .page(list_url(1), page_html(1, nav()))
        .page(list_url(2), page_html(2, nav()))
        .page(list_url(3), page_html(3, nav()))
}

#[tokio::test]
async fn test_bounded_collect_orders_oldest_first() {
    let (_tmp, fetcher, sink, traversal, processor) =
        run_setup(three_bounded_pages(), CrawlOrder::CollectThenProcess, 0);

    let summary = traversal.run(&processor).await.unwrap();

    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.items_processed, 6);
    assert_eq!(
        processor.slugs(),
        vec!["p3-old", "p3-new", "p2-old", "p2-new", "p1-old", "p1-new"]
    );
    // Every page was fetched before the first item was processed.
    assert_eq!(processor.requests_at_first_item(), 3);
    assert_eq!(fetcher.count_requests(&list_url(1)), 1);

    let events = sink.events();
    assert!(events.contains(&CrawlEvent::TraversalStarted {
        strategy: Strategy::Bounded,
        start_page: 3,
        last_page: Some(3),
        total_items: Some(6),
    }));
    assert!(events.contains(&CrawlEvent::ItemsCollected { count: 6 }));
}

#[tokio::test]
async fn test_bounded_skips_failed_page() {
    let nav = || Nav::Bounded { total: 6, last: 3 };
    for order in [CrawlOrder::Streaming, CrawlOrder::CollectThenProcess] {
        let fetcher = MapFetcher::new()
            .page(list_url(1), page_html(1, nav()))
            .page(list_url(3), page_html(3, nav()));
        let (_tmp, _fetcher, _sink, traversal, processor) = run_setup(fetcher, order, 0);

        let summary = traversal.run(&processor).await.unwrap();
        assert_eq!(summary.pages_visited, 2);
        assert_eq!(summary.pages_failed, 1);
        assert_eq!(processor.slugs(), vec!["p3-old", "p3-new", "p1-old", "p1-new"]);
    }
}

#[tokio::test]
async fn test_bounded_start_page_override() {
    let (_tmp, fetcher, _sink, traversal, processor) =
        run_setup(three_bounded_pages(), CrawlOrder::Streaming, 2);

    let summary = traversal.run(&processor).await.unwrap();
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(processor.slugs(), vec!["p2-old", "p2-new", "p1-old", "p1-new"]);
    assert_eq!(fetcher.count_requests(&list_url(3)), 0);
}

#[tokio::test]
async fn test_missing_list_container_yields_no_items() {
    let fetcher = MapFetcher::new()
        .page(list_url(1), page_html(1, Nav::Next(Some(2))))
        .page(list_url(2), "<html><body>maintenance</body></html>");
    let (_tmp, _fetcher, sink, traversal, processor) =
        run_setup(fetcher, CrawlOrder::Streaming, 0);

    let summary = traversal.run(&processor).await.unwrap();
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.items_seen, 2);
    assert!(sink
        .events()
        .contains(&CrawlEvent::ListContainerMissing { page: 2 }));
}

#[tokio::test]
async fn test_first_page_failure_is_fatal() {
    let (_tmp, _fetcher, _sink, traversal, processor) =
        run_setup(MapFetcher::new(), CrawlOrder::Streaming, 0);

    let result = traversal.run(&processor).await;
    match result {
        Err(CrawlError::FirstPageUnavailable { url }) => assert_eq!(url, list_url(1)),
        other => panic!("expected first page failure, got {:?}", other),
    }
    assert!(processor.slugs().is_empty());
}

#[tokio::test]
async fn test_every_item_is_followed_by_a_pause() {
    let bounded_with_gap = || {
        let nav = || Nav::Bounded { total: 6, last: 3 };
        MapFetcher::new()
            .page(list_url(1), page_html(1, nav()))
            .page(list_url(3), page_html(3, nav()))
    };
    let fixtures: Vec<(&str, fn() -> MapFetcher, usize)> = vec![
        ("unbounded", five_linked_pages, 10),
        ("bounded", three_bounded_pages, 6),
    ];

    for order in [CrawlOrder::CollectThenProcess, CrawlOrder::Streaming] {
        let mut cases: Vec<(&str, MapFetcher, usize)> = fixtures
            .iter()
            .map(|(name, fixture, items)| (*name, fixture(), *items))
            .collect();
        cases.push(("bounded with failed page", bounded_with_gap(), 4));

        for (name, fetcher, items) in cases {
            let tmp = TempDir::new().unwrap();
            let crawl_config = Arc::new(config(tmp.path(), order, 0));
            let pacer = Arc::new(CountingPacer::new());
            let traversal = ListTraversal::new(
                crawl_config.clone(),
                Arc::new(fetcher),
                pacer.clone(),
                Arc::new(RecordingSink::new()),
            );
            let processor = MixedProcessor::default();

            let summary = traversal.run(&processor).await.unwrap();

            let label = format!("{name}, {}", order.as_str());
            assert_eq!(summary.items_seen, items, "{label}");
            assert!(summary.items_skipped > 0, "{label}");
            assert!(summary.items_failed > 0, "{label}");
            assert_eq!(pacer.pauses().len(), summary.items_seen, "{label}");
            assert!(
                pacer.pauses().iter().all(|range| *range == crawl_config.item_delay()),
                "{label}"
            );
        }
    }
}
