//! Populating a work directory from a parsed story viewer.

mod transcode;

pub use transcode::{ffmpeg_args, FfmpegTranscoder, Transcoder};

use crate::error::{CrawlError, Result};
use crate::events::{CrawlEvent, EventSink};
use crate::extract::{ImageInfo, VideoPlan};
use crate::network::{DownloadOutcome, Downloader};
use crate::workdir::file_exists_and_nonempty;
use std::path::Path;
use tracing::debug;

/// Per-item download counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadTally {
    pub downloaded: usize,
    pub already_present: usize,
    pub dead_links: usize,
    pub failed: usize,
}

impl DownloadTally {
    fn record(&mut self, outcome: &Result<DownloadOutcome>) {
        match outcome {
            Ok(DownloadOutcome::Downloaded(_)) => self.downloaded += 1,
            Ok(DownloadOutcome::AlreadyPresent) => self.already_present += 1,
            Ok(DownloadOutcome::DeadLink) => self.dead_links += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Download one resource and report failures through `events`.
async fn fetch_one(
    downloader: &dyn Downloader,
    url: &str,
    filename: &str,
    dir: &Path,
    events: &dyn EventSink,
    tally: &mut DownloadTally,
) {
    let outcome = downloader.download(url, filename, dir).await;
    match &outcome {
        Ok(DownloadOutcome::DeadLink) => events.emit(&CrawlEvent::DeadLinkRecorded {
            dir: dir.to_path_buf(),
            url: url.to_string(),
        }),
        Err(e) => events.emit(&CrawlEvent::DownloadFailed {
            url: url.to_string(),
            error: e.to_string(),
        }),
        Ok(_) => {}
    }
    tally.record(&outcome);
}

/// Download every image that is not already on disk, in page order.
pub async fn download_images(
    downloader: &dyn Downloader,
    images: &[ImageInfo],
    dir: &Path,
    events: &dyn EventSink,
) -> Result<DownloadTally> {
    std::fs::create_dir_all(dir).map_err(|e| CrawlError::io_with_path(e, dir))?;

    let mut tally = DownloadTally::default();
    for image in images {
        if file_exists_and_nonempty(&dir.join(&image.filename)) {
            debug!("Skipping existing image {}", image.filename);
            tally.already_present += 1;
            continue;
        }
        fetch_one(downloader, &image.url, &image.filename, dir, events, &mut tally).await;
    }
    Ok(tally)
}

/// Download a video work as `{id}.mp4`.
///
/// A direct mp4 source is downloaded as is. A playlist is downloaded as
/// `{id}.m3u8` and remuxed; a failed remux is reported, not returned.
pub async fn download_video(
    downloader: &dyn Downloader,
    transcoder: &dyn Transcoder,
    plan: &VideoPlan,
    dir: &Path,
    events: &dyn EventSink,
) -> Result<DownloadTally> {
    std::fs::create_dir_all(dir).map_err(|e| CrawlError::io_with_path(e, dir))?;

    let mut tally = DownloadTally::default();
    let mp4_path = dir.join(&plan.mp4_name);
    if file_exists_and_nonempty(&mp4_path) {
        debug!("Skipping existing video {}", mp4_path.display());
        tally.already_present += 1;
        return Ok(tally);
    }

    if plan.is_mp4 {
        fetch_one(downloader, &plan.url, &plan.mp4_name, dir, events, &mut tally).await;
        return Ok(tally);
    }

    let playlist_name = plan.playlist_name();
    let playlist_path = dir.join(&playlist_name);
    if !file_exists_and_nonempty(&playlist_path) {
        fetch_one(downloader, &plan.url, &playlist_name, dir, events, &mut tally).await;
    }

    if !file_exists_and_nonempty(&playlist_path) {
        events.emit(&CrawlEvent::TranscodeFailed {
            input: playlist_path,
            error: "playlist was not downloaded".to_string(),
        });
        return Ok(tally);
    }

    if let Err(e) = transcoder.transcode(&playlist_path, &mp4_path).await {
        events.emit(&CrawlEvent::TranscodeFailed {
            input: playlist_path,
            error: e.to_string(),
        });
    }
    Ok(tally)
}
