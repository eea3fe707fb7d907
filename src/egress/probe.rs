//! Liveness probing of egress candidates.

use super::candidate::Candidate;
use crate::error::ProbeError;
use reqwest::{Client, Proxy, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Tests whether a candidate can currently carry traffic.
pub trait Prober {
    async fn probe(&self, candidate: &Candidate) -> Result<(), ProbeError>;
}

/// Probes by fetching an endpoint that echoes the caller's IP
/// (`http://httpbin.org/ip` by default) through the candidate.
#[derive(Debug, Clone)]
pub struct HttpProber {
    url: String,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl Prober for HttpProber {
    #[instrument(level = "debug", skip_all, fields(candidate = %candidate, url = %self.url))]
    async fn probe(&self, candidate: &Candidate) -> Result<(), ProbeError> {
        let t0 = Instant::now();
        let client = Client::builder()
            .proxy(Proxy::all(candidate.address())?)
            .timeout(self.timeout)
            .build()?;

        let status = client.get(&self.url).send().await?.status();
        debug!(%status, elapsed_ms = t0.elapsed().as_millis() as u64, "Probe answered");

        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }
}
