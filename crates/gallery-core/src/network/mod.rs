//! Network collaborators: page fetching and media downloads.
//!
//! This module provides:
//! - A bounded retry loop with randomized pauses
//! - The [`Fetcher`] seam and its reqwest implementation
//! - The [`Downloader`] seam with temp-file-then-rename downloads

mod client;
mod download;
mod retry;

pub use client::{build_headers, check_status, FetchedPage, Fetcher, HttpClient};
pub use download::{DownloadOutcome, Downloader, HttpDownloader};
pub use retry::{retry_async, RetryConfig, RetryStats};
