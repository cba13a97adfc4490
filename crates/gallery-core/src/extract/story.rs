//! The story viewer page: what to download and how many entries to expect.

use super::{element_text, last_path_segment, resolve_url, url_path};
use crate::metadata::FileType;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Identifier used when a video URL has no usable directory segment.
pub const DEFAULT_VIDEO_ID: &str = "video";

/// Story page holding the end-of-story links, never media.
const BOOKEND_PAGE_ID: &str = "custom-bookend-scrollable";

static COVER_VIDEO_SOURCE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("amp-story-page#cover amp-video source[src]").unwrap());
static STORY_PAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("amp-story-page").unwrap());
static PAGE_IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("amp-img").unwrap());
static DOWNLOAD_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("amp-story-cta-layer a.left").unwrap());

/// `n/m` position label; captures `m`.
static DECLARED_TOTAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/(\d+)").unwrap());

/// One image to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub url: String,
    pub filename: String,
}

/// How to fetch the video of a video work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPlan {
    pub url: String,
    /// Direct mp4 file; otherwise an HLS playlist that needs remuxing.
    pub is_mp4: bool,
    /// Second-to-last path segment of the URL.
    pub id: String,
    /// Final file name, `{id}.mp4`.
    pub mp4_name: String,
}

impl VideoPlan {
    pub fn from_source_url(url: &str) -> Self {
        let path = url_path(url);
        let segments: Vec<&str> = path.split('/').collect();
        let id = segments
            .len()
            .checked_sub(2)
            .map(|i| segments[i])
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_VIDEO_ID)
            .to_string();

        Self {
            url: url.to_string(),
            is_mp4: url.to_lowercase().ends_with(".mp4"),
            mp4_name: format!("{}.mp4", id),
            id,
        }
    }

    /// Local name of the downloaded playlist.
    pub fn playlist_name(&self) -> String {
        format!("{}.m3u8", self.id)
    }
}

/// Where [`StoryViewer::total`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalSource {
    /// Parsed from the `n/m` label.
    Declared,
    /// A video work always holds one entry.
    Video,
    /// Fallback to the number of images found.
    ImageCount,
    /// Nothing found at all.
    Missing,
}

/// Parsed story viewer page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryViewer {
    pub images: Vec<ImageInfo>,
    pub video: Option<VideoPlan>,
    pub total: u32,
    pub total_source: TotalSource,
}

impl StoryViewer {
    /// Entries the work directory should end up with.
    pub fn expected_total(&self) -> u32 {
        if self.total > 0 {
            self.total
        } else {
            self.images.len() as u32 + u32::from(self.video.is_some())
        }
    }

    pub fn file_type(&self) -> FileType {
        if self.video.is_some() {
            FileType::Video
        } else {
            FileType::Image
        }
    }
}

/// Parse a story viewer page fetched from `page_url`.
///
/// A cover page with a video source makes this a video work; otherwise
/// every story page except the bookend contributes its first image,
/// preferring the explicit download link over the inline source.
pub fn parse_story_viewer(html: &str, page_url: &str) -> StoryViewer {
    let document = Html::parse_document(html);

    let video_src = document
        .select(&COVER_VIDEO_SOURCE)
        .filter_map(|source| source.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty());
    if let Some(src) = video_src {
        return StoryViewer {
            images: Vec::new(),
            video: Some(VideoPlan::from_source_url(&resolve_url(page_url, src))),
            total: 1,
            total_source: TotalSource::Video,
        };
    }

    let mut images = Vec::new();
    for page in document
        .select(&STORY_PAGE)
        .filter(|page| page.value().id() != Some(BOOKEND_PAGE_ID))
    {
        let Some(src) = page
            .select(&PAGE_IMAGE)
            .next()
            .and_then(|img| img.value().attr("src"))
            .filter(|src| !src.trim().is_empty())
        else {
            continue;
        };

        let url = page
            .select(&DOWNLOAD_LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .filter(|href| !href.trim().is_empty())
            .unwrap_or(src);
        let url = resolve_url(page_url, url.trim());

        let mut filename = last_path_segment(&url);
        if filename.is_empty() {
            filename = format!("{:03}", images.len() + 1);
        }
        images.push(ImageInfo { url, filename });
    }

    let declared = document
        .select(&DOWNLOAD_LINK)
        .last()
        .and_then(|a| {
            DECLARED_TOTAL
                .captures(&element_text(&a))
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        })
        .unwrap_or(0);

    let (total, total_source) = if declared > 0 {
        (declared, TotalSource::Declared)
    } else if !images.is_empty() {
        (images.len() as u32, TotalSource::ImageCount)
    } else {
        (0, TotalSource::Missing)
    };

    StoryViewer {
        images,
        video: None,
        total,
        total_source,
    }
}
