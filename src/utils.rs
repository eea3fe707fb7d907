//! Helpers for log output, output file naming, and output directories.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Longest file stem that still leaves room for `.txt` within 255 bytes.
pub const MAX_STEM_LEN: usize = 251;

static INVALID_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\*?:"<>|,]"#).unwrap());

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes (backed off to a char boundary)
/// with `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Turn a case title into a file stem.
///
/// Slashes become `-`, whitespace runs become `_`, and characters that are
/// unsafe in filenames (including commas and colons) are dropped. The
/// result is capped at [`MAX_STEM_LEN`] bytes.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_title("Miranda v. Arizona, 384 U.S. 436"), "Miranda_v._Arizona_384_U.S._436");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let slashed = title.trim().replace('/', "-");
    let cleaned = INVALID_FILENAME_CHARS.replace_all(&slashed, "");
    let mut stem = cleaned.split_whitespace().collect::<Vec<_>>().join("_");

    if stem.len() > MAX_STEM_LEN {
        let mut cut = MAX_STEM_LEN;
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }
        stem.truncate(cut);
    }
    stem
}

/// Name for an opinion that has no usable title: `opinion_<case>` from the
/// source URL's `case` parameter, or plain `opinion`.
pub fn case_stem(source: &str) -> String {
    Url::parse(source)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "case")
                .map(|(_, v)| format!("opinion_{v}"))
        })
        .unwrap_or_else(|| "opinion".to_string())
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
