//! Error types for the egress rotation core.
//!
//! The application layer (scrapers, outputs, `main`) propagates
//! `Box<dyn Error>`; the rotation core uses the typed errors below so the
//! state machine can tell a recoverable fetch failure from a fatal one.

use thiserror::Error;

/// Outcome of a failed fetch attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Timeout, connection error, or content that failed the success
    /// predicate. Triggers a rotation.
    #[error("recoverable fetch failure: {reason}")]
    Recoverable { reason: String },

    /// The request can never succeed, whatever egress point is used.
    #[error("fatal fetch failure: {reason}")]
    Fatal { reason: String },
}

impl FetchError {
    pub fn recoverable(reason: impl Into<String>) -> Self {
        Self::Recoverable {
            reason: reason.into(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal {
            reason: reason.into(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable { .. })
    }

    /// Classify a reqwest error. Only a request that could not be built is
    /// fatal; every network-level failure is recoverable.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            Self::fatal(err.to_string())
        } else if err.is_timeout() {
            Self::recoverable(format!("timed out: {err}"))
        } else if err.is_connect() {
            Self::recoverable(format!("connection failed: {err}"))
        } else {
            Self::recoverable(err.to_string())
        }
    }
}

/// A liveness probe did not succeed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe returned status {0}")]
    Status(u16),

    #[error("probe request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("pool storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("discovery request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("discovery source returned status {0}")]
    Status(u16),
}

/// Terminal errors of the rotation loop.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error(transparent)]
    Fatal(FetchError),

    #[error("gave up after {attempts} fetch attempts (last failure: {last_reason})")]
    AttemptsExhausted { attempts: usize, last_reason: String },

    #[error("discovery yielded no live candidate after {attempts} attempts")]
    DiscoveryExhausted { attempts: usize },
}

/// Invalid egress candidate address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CandidateError {
    #[error("invalid candidate address {address:?}: {reason}")]
    Invalid { address: String, reason: String },
}
