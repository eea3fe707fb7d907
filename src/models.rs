//! Data models for harvested opinions.

use serde::{Deserialize, Serialize};

/// A single opinion as extracted from its Scholar case page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opinion {
    /// The case page the opinion was read from.
    pub source: String,
    /// Case title, used to name the output file.
    pub title: String,
    /// Opinion body, one text node per line.
    pub text: String,
}

/// Record of one search run, written next to the opinions as `links.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkManifest {
    pub search_phrase: String,
    pub court: String,
    /// RFC 3339 timestamp of when the harvest finished.
    pub harvested_at: String,
    pub links: Vec<String>,
}
