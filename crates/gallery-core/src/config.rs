//! Centralized configuration for the crawler.
//!
//! Fixed parameters live in the constant groups below. Everything chosen per
//! run is captured once in an immutable [`CrawlConfig`] that is shared by the
//! traversal engine and the item pipeline.

use crate::error::{CrawlError, Result};
use crate::naming::sanitize_segment;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
    pub const MAX_ATTEMPTS: u32 = 30;
    pub const RETRY_DELAY_MIN: Duration = Duration::from_secs(2);
    pub const RETRY_DELAY_MAX: Duration = Duration::from_secs(10);
    pub const ITEM_DELAY_MIN: Duration = Duration::from_secs(2);
    pub const ITEM_DELAY_MAX: Duration = Duration::from_secs(10);
    pub const DOWNLOAD_TEMP_SUFFIX: &'static str = ".part";
    pub const DEFAULT_USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";
    pub const DEFAULT_ACCEPT: &'static str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
}

/// On-disk layout of work directories.
pub struct StorageConfig;

impl StorageConfig {
    pub const DEAD_LINKS_FILENAME: &'static str = "文件不存在的链接.txt";
    pub const METADATA_FILENAME: &'static str = "meta.json";
    pub const OS_ARTIFACTS: &'static [&'static str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];
    pub const TEMP_SUFFIXES: &'static [&'static str] = &[".part", ".tmp", ".partial", ".download"];
    pub const TITLE_MAX_CHARS: usize = 100;
    pub const SEGMENT_SEPARATOR: char = '丨';
    pub const DEFAULT_DOWNLOAD_ROOT: &'static str = "download";
    pub const LOGS_DIR_NAME: &'static str = "logs";
}

/// Which listing the crawl walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    SearchKeyword,
    SearchTag,
    Ranking,
    RankingVideo,
    RankingDownload,
    RankingBookmark,
    RankingLike,
    SearchVideo,
}

impl ListMode {
    pub const ALL: [ListMode; 8] = [
        ListMode::SearchKeyword,
        ListMode::SearchTag,
        ListMode::Ranking,
        ListMode::RankingVideo,
        ListMode::RankingDownload,
        ListMode::RankingBookmark,
        ListMode::RankingLike,
        ListMode::SearchVideo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListMode::SearchKeyword => "search_keyword",
            ListMode::SearchTag => "search_tag",
            ListMode::Ranking => "ranking",
            ListMode::RankingVideo => "ranking_video",
            ListMode::RankingDownload => "ranking_download",
            ListMode::RankingBookmark => "ranking_bookmark",
            ListMode::RankingLike => "ranking_like",
            ListMode::SearchVideo => "search_video",
        }
    }

    /// Path template of the first list page, with a trailing slash.
    pub fn base_path(&self, keyword: &str, tag: &str) -> String {
        match self {
            ListMode::SearchKeyword => {
                format!("/search/keyword/{}/", urlencoding::encode(keyword))
            }
            ListMode::SearchTag => format!("/search/tag/{}/", urlencoding::encode(tag)),
            ListMode::Ranking => "/ranking/".to_string(),
            ListMode::RankingVideo => "/ranking-video/".to_string(),
            ListMode::RankingDownload => "/ranking-download/".to_string(),
            ListMode::RankingBookmark => "/ranking-bookmark/".to_string(),
            ListMode::RankingLike => "/ranking-like/".to_string(),
            ListMode::SearchVideo => "/search-video/".to_string(),
        }
    }
}

impl FromStr for ListMode {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        ListMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| CrawlError::config(format!("unknown list mode: {s}")))
    }
}

impl std::fmt::Display for ListMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When listed items are handed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrawlOrder {
    /// Gather every page first, then process the whole oldest-first sequence.
    #[serde(rename = "collect")]
    CollectThenProcess,
    /// Process each page's items as soon as the page is parsed.
    #[default]
    #[serde(rename = "stream")]
    Streaming,
}

impl CrawlOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlOrder::CollectThenProcess => "collect",
            CrawlOrder::Streaming => "stream",
        }
    }
}

impl FromStr for CrawlOrder {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "collect" | "1" => Ok(CrawlOrder::CollectThenProcess),
            "stream" | "streaming" | "2" => Ok(CrawlOrder::Streaming),
            _ => Err(CrawlError::config(format!("unknown crawl order: {s}"))),
        }
    }
}

impl std::fmt::Display for CrawlOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed range a random pause is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Pick a uniformly random duration inside the range.
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let mut rng = rand::rng();
        let secs = rng.random_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Immutable settings for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    domain: String,
    list_mode: ListMode,
    keyword: String,
    tag: String,
    start_page: u32,
    order: CrawlOrder,
    dry_run: bool,
    download_root: PathBuf,
    headers: Vec<(String, String)>,
    item_delay: DelayRange,
    retry_delay: DelayRange,
    max_attempts: u32,
    request_timeout: Duration,
}

impl CrawlConfig {
    /// Start building a configuration for the given site domain.
    pub fn builder(domain: impl Into<String>) -> CrawlConfigBuilder {
        CrawlConfigBuilder::new(domain)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn list_mode(&self) -> ListMode {
        self.list_mode
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Configured start page; 0 means "pick automatically".
    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    pub fn order(&self) -> CrawlOrder {
        self.order
    }

    /// Whether legacy directory migration only reports what it would do.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn item_delay(&self) -> DelayRange {
        self.item_delay
    }

    pub fn retry_delay(&self) -> DelayRange {
        self.retry_delay
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// `https://{domain}` without a trailing slash.
    pub fn origin(&self) -> String {
        format!("https://{}", self.domain)
    }

    /// URL of a list page. Page 1 has no `page/N/` suffix.
    pub fn list_page_url(&self, page: u32) -> String {
        let base = self.list_mode.base_path(&self.keyword, &self.tag);
        if page <= 1 {
            format!("{}{}", self.origin(), base)
        } else {
            format!("{}{}page/{}/", self.origin(), base, page)
        }
    }

    /// Subdirectory of the download root this listing writes into.
    pub fn mode_subdir(&self) -> String {
        match self.list_mode {
            ListMode::SearchKeyword => format!("kw_{}", sanitize_segment(&self.keyword)),
            ListMode::SearchTag => format!("tag_{}", sanitize_segment(&self.tag)),
            other => other.as_str().to_string(),
        }
    }

    /// `{download_root}/{mode_subdir}`, the parent of new work directories.
    pub fn base_download_dir(&self) -> PathBuf {
        self.download_root.join(self.mode_subdir())
    }

    /// Label recorded in metadata as the listing an item came from.
    pub fn list_source(&self) -> &'static str {
        self.list_mode.as_str()
    }
}

/// Builder for [`CrawlConfig`].
///
/// # Example
///
/// ```rust,ignore
/// let config = CrawlConfig::builder("example.com")
///     .list_mode(ListMode::SearchTag)
///     .tag("landscape")
///     .order(CrawlOrder::CollectThenProcess)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct CrawlConfigBuilder {
    domain: String,
    list_mode: ListMode,
    keyword: String,
    tag: String,
    start_page: u32,
    order: CrawlOrder,
    dry_run: bool,
    download_root: PathBuf,
    user_agent: String,
    cookie: Option<String>,
    extra_headers: Vec<(String, String)>,
    item_delay: DelayRange,
    retry_delay: DelayRange,
    max_attempts: u32,
    request_timeout: Duration,
}

impl CrawlConfigBuilder {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            list_mode: ListMode::SearchKeyword,
            keyword: String::new(),
            tag: String::new(),
            start_page: 0,
            order: CrawlOrder::default(),
            dry_run: false,
            download_root: PathBuf::from(StorageConfig::DEFAULT_DOWNLOAD_ROOT),
            user_agent: NetworkConfig::DEFAULT_USER_AGENT.to_string(),
            cookie: None,
            extra_headers: Vec::new(),
            item_delay: DelayRange::new(NetworkConfig::ITEM_DELAY_MIN, NetworkConfig::ITEM_DELAY_MAX),
            retry_delay: DelayRange::new(
                NetworkConfig::RETRY_DELAY_MIN,
                NetworkConfig::RETRY_DELAY_MAX,
            ),
            max_attempts: NetworkConfig::MAX_ATTEMPTS,
            request_timeout: NetworkConfig::REQUEST_TIMEOUT,
        }
    }

    pub fn list_mode(mut self, mode: ListMode) -> Self {
        self.list_mode = mode;
        self
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Page to start from; 0 picks the last page (bounded) or page 1 (unbounded).
    pub fn start_page(mut self, page: u32) -> Self {
        self.start_page = page;
        self
    }

    pub fn order(mut self, order: CrawlOrder) -> Self {
        self.order = order;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn download_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.download_root = root.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Authentication cookie sent with every request.
    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        self.cookie = if cookie.trim().is_empty() { None } else { Some(cookie) };
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    pub fn item_delay(mut self, delay: DelayRange) -> Self {
        self.item_delay = delay;
        self
    }

    pub fn retry_delay(mut self, delay: DelayRange) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<CrawlConfig> {
        let domain = self
            .domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        if domain.is_empty() {
            return Err(CrawlError::config("domain must not be empty"));
        }
        if self.list_mode == ListMode::SearchKeyword && self.keyword.trim().is_empty() {
            return Err(CrawlError::config("search_keyword mode needs a keyword"));
        }
        if self.list_mode == ListMode::SearchTag && self.tag.trim().is_empty() {
            return Err(CrawlError::config("search_tag mode needs a tag"));
        }
        for (name, range) in [("item", self.item_delay), ("retry", self.retry_delay)] {
            if range.min > range.max {
                return Err(CrawlError::config(format!(
                    "{name} delay minimum {:?} exceeds maximum {:?}",
                    range.min, range.max
                )));
            }
        }
        if self.max_attempts == 0 {
            return Err(CrawlError::config("max_attempts must be at least 1"));
        }

        let mut headers = vec![
            ("User-Agent".to_string(), self.user_agent),
            ("Accept".to_string(), NetworkConfig::DEFAULT_ACCEPT.to_string()),
        ];
        if let Some(cookie) = self.cookie {
            headers.push(("Cookie".to_string(), cookie));
        }
        headers.extend(self.extra_headers);

        Ok(CrawlConfig {
            domain,
            list_mode: self.list_mode,
            keyword: self.keyword.trim().to_string(),
            tag: self.tag.trim().to_string(),
            start_page: self.start_page,
            order: self.order,
            dry_run: self.dry_run,
            download_root: self.download_root,
            headers,
            item_delay: self.item_delay,
            retry_delay: self.retry_delay,
            max_attempts: self.max_attempts,
            request_timeout: self.request_timeout,
        })
    }
}
