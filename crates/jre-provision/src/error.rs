use std::io;
use std::path::PathBuf;

use jre_archive::ArchiveError;
use jre_cache::CacheError;
use jre_memory::MemorySizeError;
use jre_repository::RepositoryError;

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Failures that abort staging.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("unable to select an IBM JRE: {source}")]
    RuntimeSelection {
        #[source]
        source: RepositoryError,
    },

    #[error("failed to fetch IBM JRE from {uri}: {source}")]
    ArtifactFetch {
        uri: String,
        #[source]
        source: CacheError,
    },

    #[error("failed to prepare {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to expand IBM JRE from {archive}: {source}")]
    Extraction {
        archive: String,
        #[source]
        source: ArchiveError,
    },

    #[error("failed to read killjava template {}: {source}", .path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("release was given the compile result for {}, which another provisioner produced", .java_home.display())]
    ForeignCompileToken { java_home: PathBuf },

    #[error("invalid memory limit: {source}")]
    MemoryLimit {
        #[source]
        source: MemorySizeError,
    },

    #[error("unable to open artifact cache: {source}")]
    CacheSetup {
        #[source]
        source: CacheError,
    },
}

impl ProvisionError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Filesystem { path, source }
    }
}
