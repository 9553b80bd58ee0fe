use crate::error::CacheError;
use std::path::PathBuf;

/// Environment variable overriding the artifact cache root.
pub const CACHE_DIR_ENV_VAR: &str = "JRE_CACHE_DIR";

/// Configuration for selecting the on-disk cache root.
#[derive(Clone, Debug, Default)]
pub struct CacheConfig {
    /// Override the cache directory.
    pub cache_root_override: Option<PathBuf>,
    /// Serve only what is already cached; never contact a store.
    pub offline: bool,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            cache_root_override: std::env::var_os(CACHE_DIR_ENV_VAR).map(PathBuf::from),
            offline: false,
        }
    }

    /// The directory artifacts are cached in.
    ///
    /// By default this is `~/.jre-buildpack/cache`.
    pub fn root(&self) -> Result<PathBuf, CacheError> {
        match &self.cache_root_override {
            Some(root) => Ok(root.clone()),
            None => default_cache_root(),
        }
    }
}

pub(crate) fn default_cache_root() -> Result<PathBuf, CacheError> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or(CacheError::MissingHomeDir)?;

    Ok(home.join(".jre-buildpack").join("cache"))
}
