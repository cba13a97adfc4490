//! Gallery Core - Headless library for crawling story galleries.
//!
//! Walks a paginated listing, follows each entry to its story viewer and
//! downloads the images or video into a content-addressed work folder.
//! Folders from earlier runs are found again across listings, counted for
//! completion and migrated from the legacy naming scheme.
//!
//! # Example
//!
//! ```rust,ignore
//! use gallery_core::{CrawlConfig, Crawler, ListMode};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> gallery_core::Result<()> {
//!     let config = CrawlConfig::builder("gallery.example")
//!         .list_mode(ListMode::SearchKeyword)
//!         .keyword("night")
//!         .build()?;
//!
//!     let crawler = Crawler::builder(config).with_http_defaults()?.build()?;
//!     let summary = crawler.run().await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod events;
pub mod extract;
pub mod identity;
pub mod media;
pub mod metadata;
pub mod naming;
pub mod network;
pub mod pacing;
pub mod pipeline;
pub mod traversal;
pub mod workdir;

// Re-export commonly used types
pub use config::{CrawlConfig, CrawlConfigBuilder, CrawlOrder, DelayRange, ListMode};
pub use crawler::{Crawler, CrawlerBuilder};
pub use error::{CrawlError, Result};
pub use events::{CrawlEvent, DynEventSink, EventLevel, EventSink, RecordingSink, SkipReason, TracingSink};
pub use identity::{content_hash, FolderMatch, WorkIdentity};
pub use pipeline::CrawlPipeline;
pub use traversal::{CrawlSummary, ItemOutcome, ItemProcessor, ListTraversal, Strategy};
pub use workdir::{Completion, ResolvedState, WorkDir, WorkDirResolver};
