//! Egress candidates and the candidate pool.

use crate::error::CandidateError;
use rand::{Rng, rng};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use url::Url;

const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// A proxy address through which outbound requests may be routed.
///
/// Addresses are normalized to `scheme://host:port`; a bare `host:port`
/// is treated as `http`. The port must be written out, and credentials are
/// rejected since the normalized form cannot carry them. Two candidates are
/// equal when their normalized addresses are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    address: String,
}

impl Candidate {
    pub fn parse(raw: &str) -> Result<Self, CandidateError> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| CandidateError::Invalid {
            address: trimmed.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty address"));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let url = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
        let scheme = url.scheme().to_ascii_lowercase();
        if !SUPPORTED_SCHEMES.contains(&scheme.as_str()) {
            return Err(invalid("unsupported scheme"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("credentials not supported"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        if !has_explicit_port(&with_scheme) {
            return Err(invalid("missing port"));
        }
        // `port()` is None when the written port is the scheme default.
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;
        if url.path() != "/" && !url.path().is_empty() {
            return Err(invalid("unexpected path"));
        }

        Ok(Self {
            address: format!("{scheme}://{}:{port}", host.to_ascii_lowercase()),
        })
    }

    /// Normalized `scheme://host:port` form.
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Whether the authority of `scheme://authority/...` ends in `:<digits>`.
fn has_explicit_port(with_scheme: &str) -> bool {
    let rest = with_scheme.split_once("://").map_or(with_scheme, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    authority
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl FromStr for Candidate {
    type Err = CandidateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Set of known egress candidates, persisted across runs.
///
/// Keeps insertion order so the persisted file is stable between saves.
/// Never holds two candidates with the same address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a pool from newline-separated addresses. Blank lines are
    /// ignored; malformed lines are logged and skipped.
    pub fn from_lines(text: &str) -> Self {
        let mut pool = Self::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match Candidate::parse(line) {
                Ok(candidate) => {
                    pool.insert(candidate);
                }
                Err(e) => warn!(line, error = %e, "Skipping malformed pool entry"),
            }
        }
        pool
    }

    /// One address per line, no trailing newline.
    pub fn to_lines(&self) -> String {
        self.candidates
            .iter()
            .map(Candidate::address)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns `false` if the candidate was already present.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        if self.contains(&candidate) {
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    pub fn remove(&mut self, candidate: &Candidate) -> bool {
        match self.candidates.iter().position(|c| c == candidate) {
            Some(idx) => {
                self.candidates.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, candidate: &Candidate) -> bool {
        self.candidates.iter().any(|c| c == candidate)
    }

    /// Remove and return a uniformly random candidate.
    pub fn take_random(&mut self) -> Option<Candidate> {
        if self.candidates.is_empty() {
            return None;
        }
        let idx = rng().random_range(0..self.candidates.len());
        Some(self.candidates.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }
}

impl FromIterator<Candidate> for CandidatePool {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut pool = Self::new();
        for candidate in iter {
            pool.insert(candidate);
        }
        pool
    }
}
