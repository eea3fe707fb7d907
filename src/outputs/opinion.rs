//! Plain-text opinion files.

use crate::models::Opinion;
use crate::utils::{case_stem, sanitize_title};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

/// Write `opinion.text` to `<save_dir>/<sanitized title>.txt`, replacing any
/// earlier file of the same name. A title that sanitizes to nothing falls
/// back to `opinion_<case>`. Returns the path written.
#[instrument(level = "info", skip_all, fields(%save_dir, title = %opinion.title))]
pub async fn write_opinion(save_dir: &str, opinion: &Opinion) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(save_dir).await?;

    let mut stem = sanitize_title(&opinion.title);
    if stem.is_empty() {
        stem = sanitize_title(&case_stem(&opinion.source));
    }
    let path = Path::new(save_dir).join(format!("{stem}.txt"));
    fs::write(&path, &opinion.text).await?;
    debug!(path = %path.display(), bytes = opinion.text.len(), "Wrote opinion file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_opinion() {
        let dir = std::env::temp_dir().join(format!("opinion_scraper_opinion_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let save_dir = dir.display().to_string();
        let opinion = Opinion {
            source: "https://scholar.google.com/scholar_case?case=111".to_string(),
            title: "Miranda v. Arizona, 384 U.S. 436".to_string(),
            text: "MR. CHIEF JUSTICE WARREN delivered the opinion of the Court.".to_string(),
        };

        let path = write_opinion(&save_dir, &opinion).await.unwrap();

        assert_eq!(path, dir.join("Miranda_v._Arizona_384_U.S._436.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), opinion.text);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_write_opinion_with_unusable_title_uses_case_stem() {
        let dir = std::env::temp_dir().join(format!("opinion_scraper_untitled_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let save_dir = dir.display().to_string();
        let opinion = Opinion {
            source: "https://scholar.google.com/scholar_case?case=111".to_string(),
            title: "???".to_string(),
            text: "Per curiam.".to_string(),
        };

        let path = write_opinion(&save_dir, &opinion).await.unwrap();

        assert_eq!(path, dir.join("opinion_111.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Per curiam.");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
