//! Top-level entry point wiring configuration and collaborators together.

use crate::config::CrawlConfig;
use crate::error::{CrawlError, Result};
use crate::events::{DynEventSink, TracingSink};
use crate::media::{FfmpegTranscoder, Transcoder};
use crate::network::{Downloader, Fetcher, HttpClient, HttpDownloader};
use crate::pacing::{Pacer, TokioPacer};
use crate::pipeline::CrawlPipeline;
use crate::traversal::{CrawlSummary, ListTraversal};
use std::sync::Arc;
use tracing::info;

/// A configured crawl, ready to run.
pub struct Crawler {
    config: Arc<CrawlConfig>,
    traversal: ListTraversal,
    pipeline: CrawlPipeline,
}

impl Crawler {
    pub fn builder(config: CrawlConfig) -> CrawlerBuilder {
        CrawlerBuilder::new(config)
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl the configured listing to the end.
    pub async fn run(&self) -> Result<CrawlSummary> {
        info!(
            "Crawling {} ({}, {}) into {}",
            self.config.list_page_url(1),
            self.config.list_source(),
            self.config.order().as_str(),
            self.config.base_download_dir().display()
        );
        self.traversal.run(&self.pipeline).await
    }
}

/// Collects the collaborators of a [`Crawler`].
///
/// Fetcher, downloader and transcoder have no defaults; use
/// [`CrawlerBuilder::with_http_defaults`] for the real network stack.
pub struct CrawlerBuilder {
    config: CrawlConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    downloader: Option<Arc<dyn Downloader>>,
    transcoder: Option<Arc<dyn Transcoder>>,
    pacer: Option<Arc<dyn Pacer>>,
    events: Option<DynEventSink>,
}

impl CrawlerBuilder {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            fetcher: None,
            downloader: None,
            transcoder: None,
            pacer: None,
            events: None,
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    pub fn pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    pub fn events(mut self, events: DynEventSink) -> Self {
        self.events = Some(events);
        self
    }

    /// Use reqwest for pages and downloads and ffmpeg for playlists.
    pub fn with_http_defaults(self) -> Result<Self> {
        let http = Arc::new(HttpClient::new(&self.config)?);
        let downloader: Arc<dyn Downloader> = Arc::new(HttpDownloader::new(http.clone()));
        let transcoder: Arc<dyn Transcoder> = Arc::new(FfmpegTranscoder::new());
        Ok(self.fetcher(http).downloader(downloader).transcoder(transcoder))
    }

    pub fn build(self) -> Result<Crawler> {
        let fetcher = self
            .fetcher
            .ok_or_else(|| CrawlError::config("no fetcher configured"))?;
        let downloader = self
            .downloader
            .ok_or_else(|| CrawlError::config("no downloader configured"))?;
        let transcoder = self
            .transcoder
            .ok_or_else(|| CrawlError::config("no transcoder configured"))?;
        let pacer: Arc<dyn Pacer> = match self.pacer {
            Some(pacer) => pacer,
            None => Arc::new(TokioPacer),
        };
        let events: DynEventSink = match self.events {
            Some(events) => events,
            None => Arc::new(TracingSink),
        };

        let config = Arc::new(self.config);
        let traversal = ListTraversal::new(config.clone(), fetcher.clone(), pacer, events.clone());
        let pipeline = CrawlPipeline::new(config.clone(), fetcher, downloader, transcoder, events);

        Ok(Crawler {
            config,
            traversal,
            pipeline,
        })
    }
}
