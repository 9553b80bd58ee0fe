pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced while fetching or reusing cached artifacts.
///
/// URLs carried by these errors are always sanitized (see
/// [`sanitize_fetch_url`](crate::sanitize_fetch_url)).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to determine home directory for default cache path")]
    MissingHomeDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {message}")]
    Json { message: String },

    #[error("http fetch failed: {message}")]
    Http { message: String },

    #[error("unsupported fetch URL {url}")]
    UnsupportedFetchUrl { url: String },

    #[error("{url} is not cached and the cache is offline")]
    NotCached { url: String },
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        // Metadata only holds sanitized URLs and digests; line/column info is what matters.
        Self::Json {
            message: err.to_string(),
        }
    }
}
