//! Gallery Crawl - command-line front end for gallery-core.
//!
//! Parses arguments, sets up logging and runs one crawl with the real HTTP
//! and ffmpeg collaborators.

mod args;
mod logging;

use anyhow::{Context, Result};
use args::Args;
use clap::Parser;
use gallery_core::Crawler;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = logging::init_logging(args.debug, args.log_dir.as_deref())?;

    let config = args.to_config()?;
    info!("Starting gallery crawl of {}", config.domain());

    let crawler = Crawler::builder(config)
        .with_http_defaults()
        .context("Failed to set up the HTTP client")?
        .build()?;
    let summary = crawler.run().await.context("Crawl aborted")?;

    info!("Finished: {}", summary);
    Ok(())
}
