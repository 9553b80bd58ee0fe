//! Download cache for JRE repository indexes and archives.
//!
//! Artifacts are fetched from `http(s)://`, `file://` or plain filesystem
//! locations and kept under a shared cache root so repeated staging runs do
//! not download the same JRE twice.

mod application_cache;
mod cache_dir;
mod error;
mod lock;
mod metadata;
mod store;
mod util;

use std::path::{Path, PathBuf};

pub use application_cache::ApplicationCache;
pub use cache_dir::{CacheConfig, CACHE_DIR_ENV_VAR};
pub use error::{CacheError, Result};
pub use lock::CacheLock;
pub use metadata::EntryMetadata;
pub use store::{
    sanitize_fetch_url, store_for_url, CacheStore, FetchOutcome, HttpStore, LocalStore, Validators,
};
pub use util::now_millis;

/// A cached file, locked against concurrent refresh until dropped.
#[derive(Debug)]
pub struct CachedArtifact {
    path: PathBuf,
    _lock: Option<CacheLock>,
}

impl CachedArtifact {
    pub(crate) fn locked(path: PathBuf, lock: CacheLock) -> Self {
        Self {
            path,
            _lock: Some(lock),
        }
    }

    /// A handle to a file that is not managed by a cache.
    pub fn unlocked(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _lock: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolves a URI to a local file holding its content.
///
/// Holding two handles for the same URI from one thread deadlocks; drop the
/// first before asking again.
pub trait ArtifactCache {
    fn get(&self, uri: &str) -> Result<CachedArtifact>;
}

impl<T: ArtifactCache + ?Sized> ArtifactCache for &T {
    fn get(&self, uri: &str) -> Result<CachedArtifact> {
        (**self).get(uri)
    }
}
