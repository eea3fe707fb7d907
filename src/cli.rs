//! Command-line interface definitions for the opinion scraper.
//!
//! Flags override the values loaded from the optional YAML config file.

use clap::Parser;
use std::num::NonZeroUsize;

/// Harvest legal opinions from Google Scholar case law.
///
/// # Examples
///
/// ```sh
/// # Florida state courts, opinions saved under ./opinions
/// opinion_scraper "qualified immunity" 4,10 ./opinions
///
/// # Stop after three result pages and give up on a page after 40 attempts
/// opinion_scraper "qualified immunity" 4,10 ./opinions --max-pages 3 --max-attempts 40
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Search phrase
    pub search_phrase: String,

    /// Court selector, passed to Scholar as `as_sdt` (e.g. `4,10`)
    pub court: String,

    /// Directory the opinion text files are written to
    pub save_dir: String,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Proxy pool file, one address per line
    #[arg(short, long, env = "OPINION_POOL_FILE")]
    pub pool_file: Option<String>,

    /// Stop after this many search result pages (at least 1)
    #[arg(long)]
    pub max_pages: Option<NonZeroUsize>,

    /// Give up on a page after this many fetch attempts (unbounded by default)
    #[arg(long)]
    pub max_attempts: Option<usize>,

    /// Endpoint used to check that a proxy is alive
    #[arg(long)]
    pub probe_url: Option<String>,

    /// Free proxy list consulted when the pool is exhausted
    #[arg(long)]
    pub discovery_url: Option<String>,
}
