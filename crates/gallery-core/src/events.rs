//! Structured crawl events.
//!
//! Business logic reports what it did through an [`EventSink`] instead of
//! logging directly; the binary renders events with [`TracingSink`] and tests
//! inspect them with [`RecordingSink`]. Low-level diagnostics (retries, file
//! moves) still go straight to `tracing`.

use crate::traversal::Strategy;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Why an item was not downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The listing entry had no detail link.
    MissingDetailUrl,
    /// The detail page could not be fetched.
    DetailUnavailable,
    /// The detail page has no story viewer link.
    NoStoryLink,
    /// The story viewer page could not be fetched.
    ViewerUnavailable,
    /// No declared total and no media found.
    NothingToDownload,
    /// Completion count already reached the expected total.
    AlreadyComplete,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::MissingDetailUrl => "no detail link",
            SkipReason::DetailUnavailable => "detail page unavailable",
            SkipReason::NoStoryLink => "no story viewer link",
            SkipReason::ViewerUnavailable => "story viewer unavailable",
            SkipReason::NothingToDownload => "nothing to download",
            SkipReason::AlreadyComplete => "already complete",
        };
        f.write_str(text)
    }
}

/// Something noteworthy that happened during a crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    TraversalStarted {
        strategy: Strategy,
        start_page: u32,
        last_page: Option<u32>,
        total_items: Option<u32>,
    },
    PageVisited {
        page: u32,
        items: usize,
    },
    PageFailed {
        page: u32,
        url: String,
        error: String,
    },
    /// The list container was missing; the page contributed no items.
    ListContainerMissing {
        page: u32,
    },
    ItemsCollected {
        count: usize,
    },
    ItemStarted {
        title: String,
        detail_url: String,
        strategy: Strategy,
    },
    ItemSkipped {
        detail_url: String,
        reason: SkipReason,
    },
    /// A folder with the canonical name already existed.
    CanonicalReused {
        path: PathBuf,
    },
    /// An unfinished legacy folder is kept as the working directory.
    LegacyReused {
        path: PathBuf,
        finished: usize,
        expected: u32,
    },
    DirectoryCreated {
        path: PathBuf,
    },
    LegacyMigrated {
        from: PathBuf,
        to: PathBuf,
        dry_run: bool,
    },
    MigrationFailed {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
    WorkComplete {
        path: PathBuf,
        finished: usize,
        expected: u32,
    },
    WorkIncomplete {
        path: PathBuf,
        finished: usize,
        expected: u32,
    },
    DeadLinkRecorded {
        dir: PathBuf,
        url: String,
    },
    DownloadFailed {
        url: String,
        error: String,
    },
    TranscodeFailed {
        input: PathBuf,
        error: String,
    },
    MetadataWritten {
        path: PathBuf,
    },
    MetadataFailed {
        dir: PathBuf,
        error: String,
    },
    ItemFailed {
        detail_url: String,
        error: String,
    },
}

impl CrawlEvent {
    pub fn level(&self) -> EventLevel {
        match self {
            CrawlEvent::PageVisited { .. }
            | CrawlEvent::DeadLinkRecorded { .. }
            | CrawlEvent::MetadataWritten { .. } => EventLevel::Debug,
            CrawlEvent::TraversalStarted { .. }
            | CrawlEvent::ItemsCollected { .. }
            | CrawlEvent::ItemStarted { .. }
            | CrawlEvent::CanonicalReused { .. }
            | CrawlEvent::LegacyReused { .. }
            | CrawlEvent::DirectoryCreated { .. }
            | CrawlEvent::LegacyMigrated { .. }
            | CrawlEvent::WorkComplete { .. }
            | CrawlEvent::WorkIncomplete { .. } => EventLevel::Info,
            CrawlEvent::ItemSkipped { reason, .. } => match reason {
                SkipReason::AlreadyComplete => EventLevel::Info,
                _ => EventLevel::Warn,
            },
            CrawlEvent::PageFailed { .. }
            | CrawlEvent::ListContainerMissing { .. }
            | CrawlEvent::MigrationFailed { .. }
            | CrawlEvent::DownloadFailed { .. }
            | CrawlEvent::TranscodeFailed { .. }
            | CrawlEvent::MetadataFailed { .. } => EventLevel::Warn,
            CrawlEvent::ItemFailed { .. } => EventLevel::Error,
        }
    }
}

impl fmt::Display for CrawlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlEvent::TraversalStarted {
                strategy,
                start_page,
                last_page,
                total_items,
            } => {
                write!(f, "[{}] starting at page {}", strategy, start_page)?;
                if let (Some(last), Some(total)) = (last_page, total_items) {
                    write!(f, " (last page {}, {} items)", last, total)?;
                }
                Ok(())
            }
            CrawlEvent::PageVisited { page, items } => {
                write!(f, "page {}: {} items", page, items)
            }
            CrawlEvent::PageFailed { page, url, error } => {
                write!(f, "page {} failed ({}): {}", page, url, error)
            }
            CrawlEvent::ListContainerMissing { page } => {
                write!(f, "page {}: list container not found", page)
            }
            CrawlEvent::ItemsCollected { count } => write!(f, "collected {} items", count),
            CrawlEvent::ItemStarted {
                title, strategy, ..
            } => write!(f, "[{}] {}", strategy, title),
            CrawlEvent::ItemSkipped { detail_url, reason } => {
                write!(f, "skipping {}: {}", detail_url, reason)
            }
            CrawlEvent::CanonicalReused { path } => {
                write!(f, "reusing {}", path.display())
            }
            CrawlEvent::LegacyReused {
                path,
                finished,
                expected,
            } => write!(
                f,
                "continuing in legacy folder {} ({}/{})",
                path.display(),
                finished,
                expected
            ),
            CrawlEvent::DirectoryCreated { path } => write!(f, "new folder {}", path.display()),
            CrawlEvent::LegacyMigrated { from, to, dry_run } => {
                let prefix = if *dry_run { "would migrate" } else { "migrated" };
                write!(f, "{} {} -> {}", prefix, from.display(), to.display())
            }
            CrawlEvent::MigrationFailed { from, to, error } => write!(
                f,
                "migration {} -> {} failed: {}",
                from.display(),
                to.display(),
                error
            ),
            CrawlEvent::WorkComplete {
                path,
                finished,
                expected,
            } => write!(f, "complete {}/{}: {}", finished, expected, path.display()),
            CrawlEvent::WorkIncomplete {
                path,
                finished,
                expected,
            } => write!(
                f,
                "downloading {}/{} into {}",
                finished,
                expected,
                path.display()
            ),
            CrawlEvent::DeadLinkRecorded { dir, url } => {
                write!(f, "dead link {} recorded in {}", url, dir.display())
            }
            CrawlEvent::DownloadFailed { url, error } => {
                write!(f, "download {} failed: {}", url, error)
            }
            CrawlEvent::TranscodeFailed { input, error } => {
                write!(f, "transcode {} failed: {}", input.display(), error)
            }
            CrawlEvent::MetadataWritten { path } => write!(f, "wrote {}", path.display()),
            CrawlEvent::MetadataFailed { dir, error } => {
                write!(f, "metadata for {} failed: {}", dir.display(), error)
            }
            CrawlEvent::ItemFailed { detail_url, error } => {
                write!(f, "item {} failed: {}", detail_url, error)
            }
        }
    }
}

/// Receiver of crawl events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CrawlEvent);
}

/// Shared handle to an event sink.
pub type DynEventSink = Arc<dyn EventSink>;

/// Renders events as `tracing` records at their level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &CrawlEvent) {
        match event.level() {
            EventLevel::Debug => debug!("{}", event),
            EventLevel::Info => info!("{}", event),
            EventLevel::Warn => warn!("{}", event),
            EventLevel::Error => error!("{}", event),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CrawlEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events matching a predicate.
    pub fn filtered(&self, predicate: impl Fn(&CrawlEvent) -> bool) -> Vec<CrawlEvent> {
        self.events().into_iter().filter(|e| predicate(e)).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &CrawlEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
