use jre_cache::CacheError;
use jre_version::VersionError;

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("no repository_root is configured")]
    MissingRepositoryRoot,

    #[error("invalid version pattern `{pattern}`: {source}")]
    InvalidVersionPattern {
        pattern: String,
        #[source]
        source: VersionError,
    },

    #[error("failed to fetch repository index {uri}: {source}")]
    IndexFetch {
        uri: String,
        #[source]
        source: CacheError,
    },

    #[error("failed to parse repository index {uri}: {message}")]
    IndexParse { uri: String, message: String },

    #[error("no version matching `{pattern}` (available: {})", .available.join(", "))]
    NoMatchingVersion {
        pattern: String,
        available: Vec<String>,
    },
}
