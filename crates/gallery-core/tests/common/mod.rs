//! Shared fakes and HTML fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use gallery_core::config::{CrawlConfig, CrawlOrder, DelayRange, ListMode};
use gallery_core::media::Transcoder;
use gallery_core::network::{DownloadOutcome, Downloader, FetchedPage, Fetcher};
use gallery_core::pacing::Pacer;
use gallery_core::workdir::record_dead_link;
use gallery_core::{CrawlError, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

pub const DOMAIN: &str = "gallery.test";
pub const ORIGIN: &str = "https://gallery.test";

/// Listing URL of `page` for the keyword listing used in these tests.
pub fn list_url(page: u32) -> String {
    if page <= 1 {
        format!("{ORIGIN}/search/keyword/night/")
    } else {
        format!("{ORIGIN}/search/keyword/night/page/{page}/")
    }
}

pub fn detail_url(slug: &str) -> String {
    format!("{ORIGIN}/image/{slug}/")
}

pub fn story_url(slug: &str) -> String {
    format!("{ORIGIN}/story/{slug}/")
}

pub fn config(root: &Path, order: CrawlOrder, start_page: u32) -> CrawlConfig {
    CrawlConfig::builder(DOMAIN)
        .list_mode(ListMode::SearchKeyword)
        .keyword("night")
        .order(order)
        .start_page(start_page)
        .download_root(root)
        .build()
        .unwrap()
}

/// One entry of a list page fixture.
pub struct Entry<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub date: &'a str,
}

impl<'a> Entry<'a> {
    pub fn new(slug: &'a str, title: &'a str, date: &'a str) -> Self {
        Self { slug, title, date }
    }
}

/// Pagination block of a list page.
pub enum Nav {
    Bounded { total: u32, last: u32 },
    Next(Option<u32>),
}

pub fn list_page(entries: &[Entry<'_>], nav: Nav) -> String {
    let mut html = String::from("<html><body>");
    if let Nav::Bounded { total, .. } = nav {
        html.push_str(&format!(
            r#"<div id="articles_number"><span class="immoral_all_items">{total}</span></div>"#
        ));
    }
    html.push_str(r#"<ul id="image-list">"#);
    for entry in entries {
        html.push_str(&format!(
            r#"<li>
                 <div class="image-list-item-image"><a href="/image/{slug}/"><img src="https://cdn.gallery.test/thumb/{slug}.jpg"></a></div>
                 <div class="image-list-item-title"><a href="/image/{slug}/">{title}</a></div>
                 <div class="image-list-item-regist-date"><span>{date}</span></div>
               </li>"#,
            slug = entry.slug,
            title = entry.title,
            date = entry.date
        ));
    }
    html.push_str("</ul><div class=\"wp-pagenavi\">");
    match nav {
        Nav::Bounded { last, .. } => html.push_str(&format!(
            r#"<a class="last" href="{}">Last</a>"#,
            list_url(last)
        )),
        Nav::Next(Some(next)) => html.push_str(&format!(
            r#"<a class="nextpostslink" href="{}">»</a>"#,
            list_url(next)
        )),
        Nav::Next(None) => {}
    }
    html.push_str("</div></body></html>");
    html
}

pub fn detail_page(slug: &str) -> String {
    format!(
        r#"<html><body>
             <div id="paginator"><a href="/story/{slug}/">View in Story Viewer</a></div>
           </body></html>"#
    )
}

/// Story viewer with `count` images named `001.jpg`, `002.jpg`, ...
pub fn image_viewer(slug: &str, count: u32) -> String {
    let mut html = String::from("<html><body><amp-story>");
    for i in 1..=count {
        html.push_str(&format!(
            r#"<amp-story-page id="p{i}">
                 <amp-img src="https://cdn.gallery.test/{slug}/s/{i:03}.jpg"></amp-img>
                 <amp-story-cta-layer><a class="left" href="{}">SOURCE {i}/{count}</a></amp-story-cta-layer>
               </amp-story-page>"#,
            image_url(slug, i)
        ));
    }
    html.push_str("</amp-story></body></html>");
    html
}

pub fn image_url(slug: &str, index: u32) -> String {
    format!("https://cdn.gallery.test/{slug}/full/{index:03}.jpg")
}

pub fn video_viewer(playlist_url: &str) -> String {
    format!(
        r#"<html><body><amp-story>
             <amp-story-page id="cover">
               <amp-video><source src="{playlist_url}" type="application/x-mpegURL"></amp-video>
             </amp-story-page>
           </amp-story></body></html>"#
    )
}

/// Serves pages from a map and remembers every request.
#[derive(Default)]
pub struct MapFetcher {
    pages: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.lock().unwrap().insert(url.into(), body.into());
        self
    }

    /// Add a work: its detail page and an image story viewer.
    pub fn work(self, slug: &str, images: u32) -> Self {
        self.page(detail_url(slug), detail_page(slug))
            .page(story_url(slug), image_viewer(slug, images))
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count_requests(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| *r == url).count()
    }
}

#[async_trait]
impl Fetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.lock().unwrap().get(url) {
            Some(body) => Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                body: body.clone(),
            }),
            None => Err(CrawlError::NotFound {
                url: url.to_string(),
            }),
        }
    }
}

/// Writes a small file per download; URLs marked dead behave like a 404.
#[derive(Default)]
pub struct FakeDownloader {
    dead: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dead(mut self, url: impl Into<String>) -> Self {
        self.dead.insert(url.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, filename: &str, dir: &Path) -> Result<DownloadOutcome> {
        self.calls.lock().unwrap().push(url.to_string());
        std::fs::create_dir_all(dir)?;
        if self.dead.contains(url) {
            record_dead_link(dir, url)?;
            return Ok(DownloadOutcome::DeadLink);
        }
        let path = dir.join(filename);
        if path.is_file() {
            return Ok(DownloadOutcome::AlreadyPresent);
        }
        std::fs::write(&path, b"media")?;
        Ok(DownloadOutcome::Downloaded(5))
    }
}

/// Copies the playlist to the output instead of remuxing.
#[derive(Default)]
pub struct CopyTranscoder;

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, playlist: &Path, output: &Path) -> Result<()> {
        std::fs::copy(playlist, output)?;
        Ok(())
    }
}

/// Records every pause instead of sleeping.
#[derive(Default)]
pub struct CountingPacer {
    pauses: Mutex<Vec<DelayRange>>,
}

impl CountingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<DelayRange> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn pause(&self, range: DelayRange) {
        self.pauses.lock().unwrap().push(range);
    }
}
