//! Per-item processing: detail page, story viewer, work directory, media,
//! metadata.

use crate::config::CrawlConfig;
use crate::error::Result;
use crate::events::{CrawlEvent, DynEventSink, SkipReason};
use crate::extract::{extract_slug, parse_story_link, parse_story_viewer, ListingItem, StoryViewer};
use crate::identity::WorkIdentity;
use crate::media::{download_images, download_video, DownloadTally, Transcoder};
use crate::metadata::{timestamp_now, write_metadata, WorkMetadata};
use crate::network::{Downloader, Fetcher};
use crate::traversal::{ItemOutcome, ItemProcessor, Strategy};
use crate::workdir::{Completion, WorkDirResolver};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Turns listing items into populated work directories.
pub struct CrawlPipeline {
    config: Arc<CrawlConfig>,
    fetcher: Arc<dyn Fetcher>,
    downloader: Arc<dyn Downloader>,
    transcoder: Arc<dyn Transcoder>,
    events: DynEventSink,
    resolver: Mutex<WorkDirResolver>,
}

impl CrawlPipeline {
    /// Create a pipeline. The download root is indexed here, once.
    pub fn new(
        config: Arc<CrawlConfig>,
        fetcher: Arc<dyn Fetcher>,
        downloader: Arc<dyn Downloader>,
        transcoder: Arc<dyn Transcoder>,
        events: DynEventSink,
    ) -> Self {
        let resolver = WorkDirResolver::from_config(&config, events.clone());
        Self {
            config,
            fetcher,
            downloader,
            transcoder,
            events,
            resolver: Mutex::new(resolver),
        }
    }

    fn skip(&self, item: &ListingItem, reason: SkipReason) -> ItemOutcome {
        self.events.emit(&CrawlEvent::ItemSkipped {
            detail_url: item.detail_url.clone(),
            reason,
        });
        ItemOutcome::Skipped
    }

    /// Follow the detail page to the story viewer and parse it.
    async fn load_viewer(&self, item: &ListingItem) -> std::result::Result<StoryViewer, SkipReason> {
        let detail = self
            .fetcher
            .fetch(&item.detail_url)
            .await
            .map_err(|e| {
                debug!("Detail page {} failed: {}", item.detail_url, e);
                SkipReason::DetailUnavailable
            })?;
        let story_url =
            parse_story_link(&detail.body, &item.detail_url).ok_or(SkipReason::NoStoryLink)?;
        debug!("Story viewer: {}", story_url);

        let viewer = self.fetcher.fetch(&story_url).await.map_err(|e| {
            debug!("Story viewer {} failed: {}", story_url, e);
            SkipReason::ViewerUnavailable
        })?;
        Ok(parse_story_viewer(&viewer.body, &story_url))
    }

    async fn download_media(&self, viewer: &StoryViewer, dir: &Path) -> Result<DownloadTally> {
        let mut tally = DownloadTally::default();
        if !viewer.images.is_empty() {
            tally = download_images(
                self.downloader.as_ref(),
                &viewer.images,
                dir,
                self.events.as_ref(),
            )
            .await?;
        }
        if let Some(plan) = &viewer.video {
            let video = download_video(
                self.downloader.as_ref(),
                self.transcoder.as_ref(),
                plan,
                dir,
                self.events.as_ref(),
            )
            .await?;
            tally.downloaded += video.downloaded;
            tally.already_present += video.already_present;
            tally.dead_links += video.dead_links;
            tally.failed += video.failed;
        }
        Ok(tally)
    }

    fn write_record(
        &self,
        item: &ListingItem,
        identity: &WorkIdentity,
        viewer: &StoryViewer,
        dir: &Path,
    ) {
        let record = WorkMetadata {
            slug: identity.slug.clone(),
            hash: identity.content_hash.clone(),
            title: identity.title.clone(),
            title_truncated: identity.title_clean.clone(),
            date: identity.date.clone(),
            total: identity.total,
            file_type: viewer.file_type(),
            thumb_url: item.thumb_url.clone(),
            list_source: self.config.list_source().to_string(),
            download_time: timestamp_now(),
            source_url: item.detail_url.clone(),
        };
        match write_metadata(dir, &record) {
            Ok(path) => self.events.emit(&CrawlEvent::MetadataWritten { path }),
            Err(e) => self.events.emit(&CrawlEvent::MetadataFailed {
                dir: dir.to_path_buf(),
                error: e.to_string(),
            }),
        }
    }

    async fn finalize(&self, identity: &WorkIdentity, dir: &Path) -> PathBuf {
        self.resolver.lock().await.finalize(identity, dir)
    }
}

#[async_trait]
impl ItemProcessor for CrawlPipeline {
    async fn process(&self, item: &ListingItem, strategy: Strategy) -> ItemOutcome {
        if item.detail_url.is_empty() {
            return self.skip(item, SkipReason::MissingDetailUrl);
        }
        self.events.emit(&CrawlEvent::ItemStarted {
            title: item.title.clone(),
            detail_url: item.detail_url.clone(),
            strategy,
        });

        let viewer = match self.load_viewer(item).await {
            Ok(viewer) => viewer,
            Err(reason) => return self.skip(item, reason),
        };
        let expected = viewer.expected_total();
        if expected == 0 {
            return self.skip(item, SkipReason::NothingToDownload);
        }

        let slug = extract_slug(&item.detail_url);
        let identity = WorkIdentity::from_listing(&item.date, &item.title, expected, &slug);

        let work_dir = self.resolver.lock().await.resolve(&identity);
        if work_dir.skip_download() {
            return self.skip(item, SkipReason::AlreadyComplete);
        }

        let before = Completion::measure(&work_dir.path);
        if before.is_complete(expected) {
            let dir = self.finalize(&identity, &work_dir.path).await;
            self.events.emit(&CrawlEvent::WorkComplete {
                path: dir,
                finished: before.count(),
                expected,
            });
            return self.skip(item, SkipReason::AlreadyComplete);
        }
        self.events.emit(&CrawlEvent::WorkIncomplete {
            path: work_dir.path.clone(),
            finished: before.count(),
            expected,
        });

        match self.download_media(&viewer, &work_dir.path).await {
            Ok(tally) => debug!("{}: {:?}", work_dir.path.display(), tally),
            Err(e) => {
                self.events.emit(&CrawlEvent::ItemFailed {
                    detail_url: item.detail_url.clone(),
                    error: e.to_string(),
                });
                return ItemOutcome::Failed;
            }
        }

        let dir = self.finalize(&identity, &work_dir.path).await;
        let after = Completion::measure(&dir);
        if after.is_complete(expected) {
            self.events.emit(&CrawlEvent::WorkComplete {
                path: dir.clone(),
                finished: after.count(),
                expected,
            });
        }

        self.write_record(item, &identity, &viewer, &dir);
        ItemOutcome::Processed
    }
}
