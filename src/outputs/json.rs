//! JSON manifest of a search run.
//!
//! Written to `<save_dir>/links.json` once the search pages have been
//! walked, so a later run can see what was harvested and when.

use crate::models::LinkManifest;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const MANIFEST_FILE: &str = "links.json";

#[instrument(level = "info", skip_all, fields(%save_dir, links = manifest.links.len()))]
pub async fn write_manifest(save_dir: &str, manifest: &LinkManifest) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(manifest)?;

    if let Err(e) = fs::create_dir_all(save_dir).await {
        error!(error = %e, "Failed to create manifest dir");
        return Err(e.into());
    }

    let path = Path::new(save_dir).join(MANIFEST_FILE);
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote link manifest");

    Ok(path)
}
