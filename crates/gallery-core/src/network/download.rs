//! Media file downloads.
//!
//! Files are streamed into `{name}.part` and renamed into place only once
//! complete, so a file under its final name is always whole. A 404 is
//! recorded in the directory's dead-link record instead of failing.

use super::client::HttpClient;
use super::retry::retry_async;
use crate::config::NetworkConfig;
use crate::error::{CrawlError, Result};
use crate::workdir::{file_exists_and_nonempty, record_dead_link};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// What a download call ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Bytes written.
    Downloaded(u64),
    /// The target already existed and was not empty.
    AlreadyPresent,
    /// The server answered 404; the URL was added to the dead-link record.
    DeadLink,
}

/// Stores remote resources in work directories.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `dir/filename`, creating `dir` if needed.
    async fn download(&self, url: &str, filename: &str, dir: &Path) -> Result<DownloadOutcome>;
}

/// [`Downloader`] over [`HttpClient`].
pub struct HttpDownloader {
    http: Arc<HttpClient>,
    temp_suffix: String,
}

impl HttpDownloader {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            temp_suffix: NetworkConfig::DOWNLOAD_TEMP_SUFFIX.to_string(),
        }
    }

    fn temp_path(&self, destination: &Path) -> PathBuf {
        PathBuf::from(format!("{}{}", destination.display(), self.temp_suffix))
    }

    /// One attempt: stream to the temp file, then rename.
    async fn download_once(&self, url: &str, destination: &Path) -> Result<u64> {
        let temp_path = self.temp_path(destination);
        let result = self.stream_to(url, &temp_path).await;

        match result {
            Ok(bytes) => {
                std::fs::rename(&temp_path, destination).map_err(|e| {
                    let _ = std::fs::remove_file(&temp_path);
                    CrawlError::Io {
                        message: format!("Failed to move download to final destination: {}", e),
                        path: Some(destination.to_path_buf()),
                        source: Some(e),
                    }
                })?;
                info!("Downloaded {} bytes to {}", bytes, destination.display());
                Ok(bytes)
            }
            Err(e) => {
                let _ = std::fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, temp_path: &Path) -> Result<u64> {
        let response = self.http.get_once(url).await?;

        let mut file = std::fs::File::create(temp_path).map_err(|e| CrawlError::Io {
            message: format!("Failed to create temp file: {}", e),
            path: Some(temp_path.to_path_buf()),
            source: Some(e),
        })?;

        let mut bytes_downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| CrawlError::Network {
                message: format!("Error reading download stream: {}", e),
                source: Some(e),
            })?;

            file.write_all(&chunk).map_err(|e| CrawlError::Io {
                message: format!("Failed to write to temp file: {}", e),
                path: Some(temp_path.to_path_buf()),
                source: Some(e),
            })?;
            bytes_downloaded += chunk.len() as u64;
        }

        file.flush().map_err(|e| CrawlError::Io {
            message: format!("Failed to flush temp file: {}", e),
            path: Some(temp_path.to_path_buf()),
            source: Some(e),
        })?;

        Ok(bytes_downloaded)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, filename: &str, dir: &Path) -> Result<DownloadOutcome> {
        std::fs::create_dir_all(dir).map_err(|e| CrawlError::io_with_path(e, dir))?;
        let destination = dir.join(filename);
        if file_exists_and_nonempty(&destination) {
            debug!("Already present: {}", destination.display());
            return Ok(DownloadOutcome::AlreadyPresent);
        }

        let (result, stats) = retry_async(
            self.http.retry_config(),
            || self.download_once(url, &destination),
            CrawlError::is_retryable,
        )
        .await;

        if stats.attempts > 1 {
            debug!(
                "Download of {} finished after {} attempts (total delay: {:?})",
                url, stats.attempts, stats.total_delay
            );
        }

        match result {
            Ok(bytes) => Ok(DownloadOutcome::Downloaded(bytes)),
            Err(CrawlError::NotFound { .. }) => {
                record_dead_link(dir, url)?;
                Ok(DownloadOutcome::DeadLink)
            }
            Err(e) => Err(e),
        }
    }
}
