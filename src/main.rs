//! # Opinion Scraper
//!
//! Harvests legal opinions from Google Scholar case law and saves each one
//! as a text file, routing requests through a rotating pool of proxies
//! when Scholar starts blocking.
//!
//! ## Usage
//!
//! ```sh
//! opinion_scraper "qualified immunity" 4,10 ./opinions
//! ```
//!
//! ## Architecture
//!
//! 1. **Indexing**: walk the search result pages and collect opinion links
//! 2. **Fetching**: download each case page and extract the opinion
//! 3. **Output**: write one `.txt` per opinion plus a `links.json` manifest
//!
//! Every page load goes through [`egress::RotationManager`]. It starts on
//! the local connection. When a page comes back blocked or does not load,
//! it drops the proxy in use, picks a live one from `proxies.cfg` (or from a
//! free proxy list once the file is exhausted), and retries the same page.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod egress;
mod error;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::Cli;
use config::Config;
use egress::{FileStore, FreeProxyList, HttpClientFactory, HttpProber, HttpRotationManager, RotationManager};
use models::LinkManifest;
use outputs::json;
use scrapers::scholar;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("opinion_scraper starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref()).await?;
    config.apply_cli(&args);
    debug!(?config, "Effective configuration");

    if let Err(e) = ensure_writable_dir(&args.save_dir).await {
        error!(
            path = %args.save_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let mut manager = build_manager(&config).await?;
    manager.start_direct()?;

    let result = run(&mut manager, &args).await;

    // Release the client and write the pool back whether or not the run succeeded.
    manager.shutdown().await;

    let elapsed = start_time.elapsed();
    match &result {
        Ok(written) => info!(?elapsed, secs = elapsed.as_secs(), opinions = written, "Execution complete"),
        Err(e) => error!(?elapsed, error = %e, "Execution failed"),
    }
    result.map(|_| ())
}

async fn build_manager(config: &Config) -> Result<HttpRotationManager, Box<dyn Error>> {
    let store = FileStore::new(&config.pool_file);
    let prober = HttpProber::new(&config.probe_url, config.probe_timeout());
    let discovery = FreeProxyList::new(
        &config.discovery_url,
        config.discovery_timeout(),
        config.discovery_https_only,
    )?;
    let factory = HttpClientFactory::new(config.content_timeout(), &config.user_agent);

    let manager = RotationManager::load(store, prober, discovery, factory)
        .await?
        .with_limits(config.limits())
        .with_backoff(config.discovery_backoff());
    Ok(manager)
}

#[instrument(level = "info", skip_all, fields(phrase = %args.search_phrase, court = %args.court))]
async fn run(manager: &mut HttpRotationManager, args: &Cli) -> Result<usize, Box<dyn Error>> {
    // ---- Index ----
    let start_url = scholar::search_url(&args.search_phrase, &args.court);
    let links = scholar::harvest_links(manager, &start_url, args.max_pages).await?;
    info!(count = links.len(), "Number of opinions");

    let manifest = LinkManifest {
        search_phrase: args.search_phrase.clone(),
        court: args.court.clone(),
        harvested_at: Utc::now().to_rfc3339(),
        links,
    };
    if let Err(e) = json::write_manifest(&args.save_dir, &manifest).await {
        warn!(error = %e, "Failed to write link manifest; continuing");
    }

    if manifest.links.is_empty() {
        warn!("No opinion links found");
        return Ok(0);
    }

    // ---- Fetch ----
    // Opinion pages start again from the local connection.
    manager.start_direct()?;
    let written = scholar::harvest_opinions(manager, &manifest.links, &args.save_dir).await?;
    info!(written, total = manifest.links.len(), "Saved opinions");

    Ok(written)
}
