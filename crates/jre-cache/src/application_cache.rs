use std::path::{Path, PathBuf};

use crate::cache_dir::CacheConfig;
use crate::error::{CacheError, Result};
use crate::lock::CacheLock;
use crate::metadata::EntryMetadata;
use crate::store::{sanitize_fetch_url, store_for_url, FetchOutcome, Validators};
use crate::util::{now_millis, remove_file_best_effort, sha256_file, sha256_hex};
use crate::{ArtifactCache, CachedArtifact};

/// A download cache keyed by source URI.
///
/// Each entry lives under the cache root as `<sha256(uri)>.cached`, with a
/// `.json` metadata sidecar and a `.lock` file serializing concurrent fetches.
/// Entries are revalidated with conditional requests on every lookup; if the
/// store cannot be reached, a verified cached copy is served instead.
#[derive(Clone, Debug)]
pub struct ApplicationCache {
    root: PathBuf,
    offline: bool,
}

struct EntryPaths {
    artifact: PathBuf,
    metadata: PathBuf,
    lock: PathBuf,
}

impl ApplicationCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            offline: false,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Ok(Self {
            root: config.root()?,
            offline: config.offline,
        })
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_paths(&self, uri: &str) -> EntryPaths {
        let key = sha256_hex(uri.as_bytes());
        EntryPaths {
            artifact: self.root.join(format!("{key}.cached")),
            metadata: self.root.join(format!("{key}.json")),
            lock: self.root.join(format!("{key}.lock")),
        }
    }

    /// The path of the cached copy of `uri`, fetching or revalidating it first.
    pub fn get(&self, uri: &str) -> Result<CachedArtifact> {
        let safe_url = sanitize_fetch_url(uri);
        let paths = self.entry_paths(uri);
        let lock = CacheLock::lock_exclusive(&paths.lock)?;

        let cached = verified_entry(&paths);

        if self.offline {
            return match cached {
                Some(_) => {
                    tracing::debug!(target: "jre.cache", url = %safe_url, "offline; serving cached copy");
                    Ok(CachedArtifact::locked(paths.artifact, lock))
                }
                None => Err(CacheError::NotCached { url: safe_url }),
            };
        }

        let validators = cached
            .as_ref()
            .map(|metadata| metadata.validators.clone())
            .unwrap_or_default();

        let outcome = store_for_url(uri)
            .and_then(|store| store.fetch(uri, &paths.artifact, &validators));

        match (outcome, cached) {
            (Ok(FetchOutcome::Fetched(validators)), _) => {
                let metadata = EntryMetadata {
                    uri: safe_url.clone(),
                    validators,
                    sha256: sha256_file(&paths.artifact)?,
                    size: std::fs::metadata(&paths.artifact)?.len(),
                    fetched_at_millis: now_millis(),
                };
                metadata.save(&paths.metadata)?;
                tracing::info!(
                    target: "jre.cache",
                    url = %safe_url,
                    size = metadata.size,
                    "downloaded artifact"
                );
                Ok(CachedArtifact::locked(paths.artifact, lock))
            }
            (Ok(FetchOutcome::NotModified), Some(_)) => {
                tracing::debug!(target: "jre.cache", url = %safe_url, "cached copy is current");
                Ok(CachedArtifact::locked(paths.artifact, lock))
            }
            (Ok(FetchOutcome::NotModified), None) => Err(CacheError::Http {
                message: format!("{safe_url} reported not modified but nothing is cached"),
            }),
            (Err(err), Some(_)) => {
                tracing::warn!(
                    target: "jre.cache",
                    url = %safe_url,
                    error = %err,
                    "fetch failed; using cached copy"
                );
                Ok(CachedArtifact::locked(paths.artifact, lock))
            }
            (Err(err), None) => Err(err),
        }
    }

    /// Remove any cached copy of `uri`.
    pub fn evict(&self, uri: &str) -> Result<()> {
        let paths = self.entry_paths(uri);
        let _lock = CacheLock::lock_exclusive(&paths.lock)?;
        remove_file_best_effort(&paths.artifact, "evict.artifact");
        remove_file_best_effort(&paths.metadata, "evict.metadata");
        Ok(())
    }
}

impl ArtifactCache for ApplicationCache {
    fn get(&self, uri: &str) -> Result<CachedArtifact> {
        ApplicationCache::get(self, uri)
    }
}

/// The entry's metadata, if the cached artifact exists and matches its recorded digest.
fn verified_entry(paths: &EntryPaths) -> Option<EntryMetadata> {
    let metadata = EntryMetadata::load_best_effort(&paths.metadata)?;
    match sha256_file(&paths.artifact) {
        Ok(digest) if digest == metadata.sha256 => Some(metadata),
        Ok(_) => {
            tracing::debug!(
                target: "jre.cache",
                path = %paths.artifact.display(),
                "cached artifact does not match its digest; discarding"
            );
            remove_file_best_effort(&paths.artifact, "verify.digest_mismatch");
            remove_file_best_effort(&paths.metadata, "verify.digest_mismatch");
            None
        }
        Err(_) => {
            remove_file_best_effort(&paths.metadata, "verify.missing_artifact");
            None
        }
    }
}
