//! Durable storage for the candidate pool.
//!
//! The on-disk format is plain text, one normalized address per line.
//! Every save rewrites the whole file; nothing is appended.

use super::candidate::CandidatePool;
use crate::error::StoreError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

/// Storage port for the candidate pool.
pub trait PoolStore {
    /// Load the persisted pool. A store that has never been written loads
    /// as an empty pool.
    async fn load(&self) -> Result<CandidatePool, StoreError>;

    /// Persist `pool`, replacing whatever was stored before. Returns only
    /// once the write is complete.
    async fn save(&self, pool: &CandidatePool) -> Result<(), StoreError>;
}

/// Pool file on the local filesystem (`proxies.cfg` by default).
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PoolStore for FileStore {
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn load(&self) -> Result<CandidatePool, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => {
                let pool = CandidatePool::from_lines(&text);
                debug!(count = pool.len(), "Loaded candidate pool");
                Ok(pool)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No pool file yet; starting empty");
                Ok(CandidatePool::new())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    #[instrument(level = "debug", skip_all, fields(path = %self.path.display(), count = pool.len()))]
    async fn save(&self, pool: &CandidatePool) -> Result<(), StoreError> {
        // Write a sibling file and rename it into place so a concurrent
        // reader never observes a half-written pool.
        let tmp = self.temp_path();
        fs::write(&tmp, pool.to_lines())
            .await
            .map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        debug!("Saved candidate pool");
        Ok(())
    }
}

/// In-memory store; `snapshot` exposes what was last saved.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    saves: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_lines(lines: &[&str]) -> Self {
        let store = Self::default();
        *store.saved.lock().unwrap() = CandidatePool::from_lines(&lines.join("\n"))
            .iter()
            .map(|c| c.address().to_string())
            .collect();
        store
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl PoolStore for MemoryStore {
    async fn load(&self) -> Result<CandidatePool, StoreError> {
        Ok(CandidatePool::from_lines(&self.snapshot().join("\n")))
    }

    async fn save(&self, pool: &CandidatePool) -> Result<(), StoreError> {
        *self.saved.lock().unwrap() = pool.iter().map(|c| c.address().to_string()).collect();
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}
