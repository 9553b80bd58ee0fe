use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::Validators;
use crate::util::{atomic_write_with, remove_file_best_effort};

/// Sidecar record stored next to each cached artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Sanitized source URI, for humans inspecting the cache.
    pub uri: String,
    #[serde(flatten)]
    pub validators: Validators,
    pub sha256: String,
    pub size: u64,
    pub fetched_at_millis: u64,
}

impl EntryMetadata {
    /// Load metadata, treating unreadable or corrupt sidecars as a cache miss.
    pub(crate) fn load_best_effort(path: &Path) -> Option<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(
                        target: "jre.cache",
                        path = %path.display(),
                        error = %err,
                        "failed to read cache metadata"
                    );
                }
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                tracing::debug!(
                    target: "jre.cache",
                    path = %path.display(),
                    error = %err,
                    "discarding corrupt cache metadata"
                );
                remove_file_best_effort(path, "metadata.corrupt");
                None
            }
        }
    }

    pub(crate) fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        atomic_write_with(path, |file| {
            std::io::Write::write_all(file, &bytes)?;
            Ok(())
        })
    }
}
