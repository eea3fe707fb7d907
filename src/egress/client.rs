//! Fetch clients bound to an egress point, and the sessions that own them.

use super::candidate::Candidate;
use crate::error::FetchError;
use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// A client that fetches pages through one fixed egress point.
pub trait FetchClient {
    async fn get(&self, url: &str) -> Result<String, FetchError>;

    /// Close the underlying resources. Called exactly once, before a
    /// replacement client is acquired.
    fn release(self)
    where
        Self: Sized,
    {
    }
}

/// Builds fetch clients that egress through a candidate, or directly when
/// given `None`.
pub trait ClientFactory {
    type Client: FetchClient;

    fn connect(&self, candidate: Option<&Candidate>) -> Result<Self::Client, FetchError>;
}

/// The active `(client, candidate)` pair. `candidate` is `None` for a
/// direct connection.
#[derive(Debug)]
pub struct Session<C> {
    client: C,
    candidate: Option<Candidate>,
}

impl<C: FetchClient> Session<C> {
    pub fn new(client: C, candidate: Option<Candidate>) -> Self {
        Self { client, candidate }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        self.candidate.as_ref()
    }

    /// Label for log lines.
    pub fn label(&self) -> String {
        self.candidate
            .as_ref()
            .map_or_else(|| "local connection".to_string(), |c| c.to_string())
    }

    /// Release the client and hand back the candidate it was bound to.
    pub fn release(self) -> Option<Candidate> {
        self.client.release();
        self.candidate
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    content_timeout: Duration,
    user_agent: String,
}

impl HttpClientFactory {
    pub fn new(content_timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            content_timeout,
            user_agent: user_agent.into(),
        }
    }
}

impl ClientFactory for HttpClientFactory {
    type Client = HttpFetchClient;

    fn connect(&self, candidate: Option<&Candidate>) -> Result<Self::Client, FetchError> {
        let mut builder = Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.content_timeout);

        if let Some(candidate) = candidate {
            let proxy = Proxy::all(candidate.address()).map_err(|e| FetchError::from_reqwest(&e))?;
            builder = builder.proxy(proxy);
        } else {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|e| FetchError::from_reqwest(&e))?;
        Ok(HttpFetchClient { client })
    }
}

/// `reqwest` client with a whole-request timeout, so a stuck response
/// spends at most `content_timeout` before it counts as a failure.
#[derive(Debug)]
pub struct HttpFetchClient {
    client: Client,
}

impl FetchClient for HttpFetchClient {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;
        debug!(%status, bytes = body.len(), "Fetched page");
        Ok(body)
    }

    fn release(self) {
        // Dropping the client closes its idle pooled connections.
        drop(self.client);
    }
}
