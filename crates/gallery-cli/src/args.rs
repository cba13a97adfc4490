//! Command-line arguments and the optional JSON settings file.
//!
//! Every setting can come from the file; a flag given on the command line
//! wins over the file.

use anyhow::{Context, Result};
use clap::Parser;
use gallery_core::metadata::atomic_read_json;
use gallery_core::{CrawlConfig, CrawlOrder, DelayRange, ListMode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Default)]
#[command(name = "gallery-crawl")]
#[command(about = "Crawl a story gallery listing into content-addressed work folders")]
pub struct Args {
    /// Site domain, e.g. gallery.example
    #[arg(long)]
    pub domain: Option<String>,

    /// List mode: search_keyword, search_tag, ranking, ranking_video,
    /// ranking_download, ranking_bookmark, ranking_like or search_video
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Keyword for search_keyword mode
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Tag for search_tag mode
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Page to start from (0 = automatic)
    #[arg(long)]
    pub start_page: Option<u32>,

    /// Processing order: collect or stream
    #[arg(long)]
    pub order: Option<String>,

    /// Report legacy folder migrations without moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Root directory of all downloads
    #[arg(long)]
    pub download_root: Option<PathBuf>,

    /// Cookie header sent with every request
    #[arg(long)]
    pub cookie: Option<String>,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// JSON file with default settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Also write a timestamped log file into this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Minimum pause after each item, in seconds
    #[arg(long)]
    pub min_delay: Option<f64>,

    /// Maximum pause after each item, in seconds
    #[arg(long)]
    pub max_delay: Option<f64>,
}

/// Settings file layout. Missing keys fall back to the built-in defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub domain: Option<String>,
    pub mode: Option<String>,
    pub keyword: Option<String>,
    pub tag: Option<String>,
    pub start_page: Option<u32>,
    pub order: Option<String>,
    pub dry_run: Option<bool>,
    pub download_root: Option<PathBuf>,
    pub cookie: Option<String>,
    pub user_agent: Option<String>,
    pub min_delay: Option<f64>,
    pub max_delay: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        atomic_read_json(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?
            .with_context(|| format!("Config file not found: {}", path.display()))
    }
}

fn seconds(value: f64, name: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("Invalid {name}: {value}"))
}

impl Args {
    /// Merge flags over the settings file into a validated configuration.
    pub fn to_config(&self) -> Result<CrawlConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let domain = self
            .domain
            .clone()
            .or(file.domain)
            .context("No domain given (use --domain or the config file)")?;
        let mut builder = CrawlConfig::builder(domain)
            .dry_run(self.dry_run || file.dry_run.unwrap_or(false));

        if let Some(mode) = self.mode.as_ref().or(file.mode.as_ref()) {
            builder = builder.list_mode(mode.parse::<ListMode>()?);
        }
        if let Some(keyword) = self.keyword.as_ref().or(file.keyword.as_ref()) {
            builder = builder.keyword(keyword.as_str());
        }
        if let Some(tag) = self.tag.as_ref().or(file.tag.as_ref()) {
            builder = builder.tag(tag.as_str());
        }
        if let Some(page) = self.start_page.or(file.start_page) {
            builder = builder.start_page(page);
        }
        if let Some(order) = self.order.as_ref().or(file.order.as_ref()) {
            builder = builder.order(order.parse::<CrawlOrder>()?);
        }
        if let Some(root) = self.download_root.as_ref().or(file.download_root.as_ref()) {
            builder = builder.download_root(root.clone());
        }
        if let Some(cookie) = self.cookie.as_ref().or(file.cookie.as_ref()) {
            builder = builder.cookie(cookie.as_str());
        }
        if let Some(agent) = self.user_agent.as_ref().or(file.user_agent.as_ref()) {
            builder = builder.user_agent(agent.as_str());
        }

        let min = self.min_delay.or(file.min_delay);
        let max = self.max_delay.or(file.max_delay);
        if min.is_some() || max.is_some() {
            let min = seconds(min.unwrap_or(0.0), "min delay")?;
            let max = match max {
                Some(max) => seconds(max, "max delay")?,
                None => min,
            };
            builder = builder.item_delay(DelayRange::new(min, max));
        }

        Ok(builder.build()?)
    }
}
