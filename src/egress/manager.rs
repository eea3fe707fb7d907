//! The rotation state machine.
//!
//! [`RotationManager::run_with_rotation`] drives
//!
//! ```text
//!   Probing ──session──▶ Fetching ──ok──▶ Done
//!      ▲                    │
//!      │              recoverable
//!      │                    ▼
//!      └─────────────── Rotating
//! ```
//!
//! Fatal fetch failures leave the machine immediately. Neither the fetch
//! loop nor the discovery loop is bounded unless [`RotationLimits`] says so.

use super::backoff::Backoff;
use super::candidate::{Candidate, CandidatePool};
use super::client::{ClientFactory, FetchClient, Session};
use super::discovery::Discovery;
use super::probe::Prober;
use super::store::PoolStore;
use crate::error::{FetchError, RotationError, StoreError};
use crate::utils::truncate_for_log;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Optional ceilings on the otherwise unbounded loops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationLimits {
    /// Fetch attempts per `run_with_rotation` call.
    pub max_fetch_attempts: Option<usize>,
    /// Discovery calls per `acquire_session` fallback.
    pub max_discovery_attempts: Option<usize>,
}

#[derive(Debug)]
enum State {
    Probing,
    Fetching,
    Rotating { reason: String },
    Done(String),
}

/// Issue one request with `client` and classify the outcome. A body that
/// fails `accept` is a recoverable failure even though the transport
/// succeeded.
pub async fn fetch<C, A>(client: &C, url: &str, accept: A) -> Result<String, FetchError>
where
    C: FetchClient,
    A: Fn(&str) -> bool,
{
    let body = client.get(url).await?;
    if accept(&body) {
        Ok(body)
    } else {
        debug!(%url, preview = %truncate_for_log(&body, 200), "Response rejected by success predicate");
        Err(FetchError::recoverable(
            "response did not contain the expected content",
        ))
    }
}

/// Owns the candidate pool and the single active session.
pub struct RotationManager<S, P, D, F>
where
    F: ClientFactory,
{
    pool: CandidatePool,
    store: S,
    prober: P,
    discovery: D,
    factory: F,
    session: Option<Session<F::Client>>,
    limits: RotationLimits,
    backoff: Backoff,
}

impl<S, P, D, F> RotationManager<S, P, D, F>
where
    S: PoolStore,
    P: Prober,
    D: Discovery,
    F: ClientFactory,
{
    pub fn new(pool: CandidatePool, store: S, prober: P, discovery: D, factory: F) -> Self {
        Self {
            pool,
            store,
            prober,
            discovery,
            factory,
            session: None,
            limits: RotationLimits::default(),
            backoff: Backoff::none(),
        }
    }

    /// Build a manager around the pool currently held by `store`.
    pub async fn load(store: S, prober: P, discovery: D, factory: F) -> Result<Self, StoreError> {
        let pool = store.load().await?;
        info!(count = pool.len(), "Loaded egress candidate pool");
        Ok(Self::new(pool, store, prober, discovery, factory))
    }

    pub fn with_limits(mut self, limits: RotationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    pub fn active_candidate(&self) -> Option<&Candidate> {
        self.session.as_ref().and_then(Session::candidate)
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Install a direct (proxy-less) session. Any current session is
    /// released before the new client is built.
    pub fn start_direct(&mut self) -> Result<(), FetchError> {
        if let Some(old) = self.session.take() {
            old.release();
        }
        let client = self.factory.connect(None)?;
        self.session = Some(Session::new(client, None));
        info!("Using local connection");
        Ok(())
    }

    /// Release the active session and persist the pool.
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(candidate = %session.label(), "Releasing session on shutdown");
            session.release();
        }
        self.persist().await;
    }

    /// Find a live candidate and bind a new client to it.
    ///
    /// Candidates are drawn from the pool in random order. Each one is taken
    /// out of the pool before probing; only the live one is put back, and
    /// the pool is saved only after a dead one is dropped. Once the pool is
    /// empty the discovery source is asked for fresh candidates until one of
    /// them is live.
    #[instrument(level = "info", skip_all, fields(pool = self.pool.len()))]
    pub async fn acquire_session(&mut self) -> Result<Session<F::Client>, RotationError> {
        while let Some(candidate) = self.pool.take_random() {
            match self.bind(&candidate).await {
                Some(session) => {
                    self.pool.insert(candidate);
                    info!(candidate = %session.label(), "Using proxy");
                    return Ok(session);
                }
                None => self.persist().await,
            }
        }

        info!("No valid proxy in the pool; falling back to discovery");
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match self.discovery.next_candidate().await {
                Ok(Some(candidate)) => {
                    if let Some(session) = self.bind(&candidate).await {
                        if self.pool.insert(candidate) {
                            self.persist().await;
                        }
                        info!(candidate = %session.label(), attempt, "Using discovered proxy");
                        return Ok(session);
                    }
                }
                Ok(None) => warn!(attempt, "Discovery yielded no candidate"),
                Err(e) => warn!(attempt, error = %e, "Discovery failed"),
            }

            if let Some(max) = self.limits.max_discovery_attempts {
                if attempt >= max {
                    error!(attempts = attempt, "Giving up on discovery");
                    return Err(RotationError::DiscoveryExhausted { attempts: attempt });
                }
            }

            let delay = self.backoff.jittered(attempt);
            debug!(?delay, "Pausing before the next discovery attempt");
            sleep(delay).await;
        }
    }

    /// Fetch `url` until a response satisfies `accept`, rotating the egress
    /// point after every recoverable failure. The same URL is retried each
    /// time.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn run_with_rotation<A>(&mut self, url: &str, accept: A) -> Result<String, RotationError>
    where
        A: Fn(&str) -> bool,
    {
        let t0 = Instant::now();
        let mut attempts = 0usize;
        let mut last_reason = String::new();
        let mut state = if self.session.is_some() {
            State::Fetching
        } else {
            State::Probing
        };

        loop {
            state = match state {
                State::Probing => {
                    if let Some(max) = self.limits.max_fetch_attempts {
                        if attempts >= max {
                            error!(attempts, last_reason = %last_reason, "Fetch attempt ceiling reached");
                            return Err(RotationError::AttemptsExhausted {
                                attempts,
                                last_reason,
                            });
                        }
                    }
                    let session = self.acquire_session().await?;
                    self.session = Some(session);
                    State::Fetching
                }
                State::Fetching => match self.session.as_ref() {
                    None => State::Probing,
                    Some(session) => {
                        attempts += 1;
                        match fetch(session.client(), url, &accept).await {
                            Ok(content) => State::Done(content),
                            Err(e) if !e.is_recoverable() => {
                                error!(candidate = %session.label(), error = %e, "Fatal fetch failure");
                                return Err(RotationError::Fatal(e));
                            }
                            Err(e) => {
                                warn!(
                                    attempt = attempts,
                                    candidate = %session.label(),
                                    error = %e,
                                    "Fetch failed; rotating egress point"
                                );
                                State::Rotating {
                                    reason: e.to_string(),
                                }
                            }
                        }
                    }
                },
                State::Rotating { reason } => {
                    self.rotate_out().await;
                    last_reason = reason;
                    State::Probing
                }
                State::Done(content) => {
                    info!(
                        attempts,
                        candidate = %self.session.as_ref().map_or_else(String::new, Session::label),
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "Fetched"
                    );
                    return Ok(content);
                }
            };
        }
    }

    /// Drop the active candidate from the pool, persist, and release its client.
    async fn rotate_out(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Some(candidate) = session.candidate() {
            if self.pool.remove(candidate) {
                debug!(candidate = %candidate, "Removed failed candidate from pool");
            }
        }
        self.persist().await;
        session.release();
    }

    /// Probe `candidate` and, if live, bind a client to it.
    async fn bind(&self, candidate: &Candidate) -> Option<Session<F::Client>> {
        if let Err(e) = self.prober.probe(candidate).await {
            warn!(candidate = %candidate, error = %e, "Proxy failed probe, trying another one");
            return None;
        }
        match self.factory.connect(Some(candidate)) {
            Ok(client) => Some(Session::new(client, Some(candidate.clone()))),
            Err(e) => {
                warn!(candidate = %candidate, error = %e, "Could not build a client for proxy");
                None
            }
        }
    }

    /// Write the pool through to the store. A failed save is logged and the
    /// in-memory pool stays authoritative for the rest of the run.
    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.pool).await {
            error!(error = %e, count = self.pool.len(), "Failed to persist candidate pool");
        }
    }
}
