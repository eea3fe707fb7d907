//! Resilient fetching through a rotating pool of egress points (proxies).
//!
//! The pieces, from the bottom up:
//!
//! | Piece | Module | Role |
//! |-------|--------|------|
//! | [`Candidate`](candidate::Candidate), [`CandidatePool`](candidate::CandidatePool) | [`candidate`] | Deduplicated set of proxy addresses |
//! | [`PoolStore`], [`FileStore`] | [`store`] | Load/save the pool (`proxies.cfg`) |
//! | [`Prober`], [`HttpProber`] | [`probe`] | Cheap liveness check through a candidate |
//! | [`Discovery`], [`FreeProxyList`] | [`discovery`] | Fresh candidates when the pool runs dry |
//! | [`ClientFactory`], [`FetchClient`](client::FetchClient), [`Session`](client::Session) | [`client`] | Fetch clients bound to one egress point |
//! | [`RotationManager`] | [`manager`] | Probe → fetch → rotate state machine |
//!
//! Everything runs sequentially on the caller's task: one request in flight,
//! one active session, and the pool is written through to storage after
//! every change.

pub mod backoff;
pub mod candidate;
pub mod client;
pub mod discovery;
pub mod manager;
pub mod probe;
pub mod store;

pub use backoff::Backoff;
pub use client::{ClientFactory, HttpClientFactory};
pub use discovery::{Discovery, FreeProxyList};
pub use manager::{RotationLimits, RotationManager};
pub use probe::{HttpProber, Prober};
pub use store::{FileStore, PoolStore};

/// The manager wired to its production collaborators.
pub type HttpRotationManager = RotationManager<FileStore, HttpProber, FreeProxyList, HttpClientFactory>;
