//! Fallback source of fresh candidates when the known pool is exhausted.
//!
//! [`FreeProxyList`] scrapes a public free-proxy table (sslproxies.org and
//! its sister sites share the same layout) and hands out one previously
//! unseen address per call.

use super::candidate::Candidate;
use crate::error::DiscoveryError;
use once_cell::sync::Lazy;
use rand::rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("table tbody tr").unwrap());
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// Yields one fresh candidate per call, `Ok(None)` when it has nothing new.
pub trait Discovery {
    async fn next_candidate(&mut self) -> Result<Option<Candidate>, DiscoveryError>;
}

#[derive(Debug)]
pub struct FreeProxyList {
    client: Client,
    url: String,
    https_only: bool,
    queue: VecDeque<Candidate>,
    handed_out: HashSet<Candidate>,
}

impl FreeProxyList {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        https_only: bool,
    ) -> Result<Self, DiscoveryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            https_only,
            queue: VecDeque::new(),
            handed_out: HashSet::new(),
        })
    }

    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn refill(&mut self) -> Result<(), DiscoveryError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status(status.as_u16()));
        }
        let html = response.text().await?;

        let mut fresh: Vec<Candidate> = parse_proxy_table(&html, self.https_only)
            .into_iter()
            .filter(|c| !self.handed_out.contains(c))
            .collect();
        fresh.shuffle(&mut rng());

        info!(count = fresh.len(), "Refilled discovery queue");
        self.queue = fresh.into();
        Ok(())
    }
}

impl Discovery for FreeProxyList {
    async fn next_candidate(&mut self) -> Result<Option<Candidate>, DiscoveryError> {
        if self.queue.is_empty() {
            self.refill().await?;
        }
        while let Some(candidate) = self.queue.pop_front() {
            if self.handed_out.insert(candidate.clone()) {
                debug!(candidate = %candidate, "Discovered candidate");
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

/// Parse the `IP | Port | Code | Country | Anonymity | Google | Https | ...`
/// table into candidates.
pub fn parse_proxy_table(html: &str, https_only: bool) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let mut candidates = Vec::new();

    for row in document.select(&ROW_SELECTOR) {
        let cells: Vec<String> = row
            .select(&CELL_SELECTOR)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() < 7 {
            continue;
        }
        if https_only && !cells[6].eq_ignore_ascii_case("yes") {
            continue;
        }
        match Candidate::parse(&format!("{}:{}", cells[0], cells[1])) {
            Ok(candidate) => {
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
            Err(e) => warn!(error = %e, "Skipping unparsable proxy table row"),
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        <html><body>
        <table class="table table-striped table-bordered">
          <thead><tr><th>IP Address</th><th>Port</th><th>Code</th><th>Country</th>
            <th>Anonymity</th><th>Google</th><th>Https</th><th>Last Checked</th></tr></thead>
          <tbody>
            <tr><td>1.2.3.4</td><td>8080</td><td>US</td><td>United States</td><td>elite proxy</td><td>no</td><td>yes</td><td>1 min ago</td></tr>
            <tr><td>5.6.7.8</td><td>3128</td><td>DE</td><td>Germany</td><td>anonymous</td><td>no</td><td>no</td><td>2 mins ago</td></tr>
            <tr><td>9.9.9.9</td><td>80</td><td>FR</td><td>France</td><td>elite proxy</td><td>yes</td><td>YES</td><td>3 mins ago</td></tr>
            <tr><td>1.2.3.4</td><td>8080</td><td>US</td><td>United States</td><td>elite proxy</td><td>no</td><td>yes</td><td>4 mins ago</td></tr>
            <tr><td colspan="8">advert</td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_proxy_table_https_only() {
        let found = parse_proxy_table(TABLE, true);
        let addrs: Vec<&str> = found.iter().map(Candidate::address).collect();
        assert_eq!(addrs, vec!["http://1.2.3.4:8080", "http://9.9.9.9:80"]);
    }

    #[test]
    fn test_parse_proxy_table_all_rows() {
        let found = parse_proxy_table(TABLE, false);
        assert_eq!(found.len(), 3);
        assert!(found.contains(&Candidate::parse("5.6.7.8:3128").unwrap()));
    }

    #[test]
    fn test_parse_proxy_table_empty_page() {
        assert!(parse_proxy_table("<html><body>blocked</body></html>", true).is_empty());
    }
}
