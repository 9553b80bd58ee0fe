use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;

use jre_cache::{sanitize_fetch_url, ArtifactCache};
use jre_config::JreConfig;
use jre_version::{Version, VersionPattern};

use crate::error::{RepositoryError, Result};
use crate::{ArtifactResolver, ResolvedArtifact};

/// File name of the index under a repository root.
pub const INDEX_FILE_NAME: &str = "index.json";

/// An in-memory version → artifact URI index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticIndex {
    entries: BTreeMap<Version, String>,
}

impl StaticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any entry whose version compares equal
    /// (`1.8` and `1.8.0`). The stored key and URI always come from this call.
    pub fn insert(&mut self, version: Version, uri: impl Into<String>) -> &mut Self {
        self.entries.remove(&version);
        self.entries.insert(version, uri.into());
        self
    }

    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The newest entry matching `pattern`.
    pub fn resolve(&self, pattern: &VersionPattern) -> Result<ResolvedArtifact> {
        let version = pattern
            .resolve(self.entries.keys())
            .ok_or_else(|| RepositoryError::NoMatchingVersion {
                pattern: pattern.to_string(),
                available: self.entries.keys().map(ToString::to_string).collect(),
            })?;

        Ok(ResolvedArtifact {
            version: version.clone(),
            uri: self.entries[version].clone(),
        })
    }

    /// Like [`StaticIndex::resolve`], parsing `pattern` first.
    pub fn resolve_str(&self, pattern: &str) -> Result<ResolvedArtifact> {
        let parsed = pattern
            .parse::<VersionPattern>()
            .map_err(|source| RepositoryError::InvalidVersionPattern {
                pattern: pattern.to_owned(),
                source,
            })?;
        self.resolve(&parsed)
    }

    /// Parse an index document: a JSON object mapping version strings to URIs.
    ///
    /// Keys that are not versions are skipped, as are keys equal to an earlier
    /// key in lexical order. Relative URIs are resolved against `base`.
    pub fn from_json(text: &str, base: &str) -> Result<Self> {
        let raw: BTreeMap<String, String> =
            serde_json::from_str(text).map_err(|err| RepositoryError::IndexParse {
                uri: sanitize_fetch_url(base),
                message: err.to_string(),
            })?;
        Self::from_raw(raw, base)
    }

    fn from_reader(reader: impl std::io::Read, base: &str) -> Result<Self> {
        let raw: BTreeMap<String, String> =
            serde_json::from_reader(reader).map_err(|err| RepositoryError::IndexParse {
                uri: sanitize_fetch_url(base),
                message: err.to_string(),
            })?;
        Self::from_raw(raw, base)
    }

    fn from_raw(raw: BTreeMap<String, String>, base: &str) -> Result<Self> {
        let mut index = Self::new();
        for (key, uri) in raw {
            match key.parse::<Version>() {
                Ok(version) => {
                    if let Some((kept, _)) = index.entries.get_key_value(&version) {
                        tracing::warn!(
                            target: "jre.repository",
                            key = %key,
                            kept = %kept,
                            "skipping index entry equal to an earlier version"
                        );
                        continue;
                    }
                    index.insert(version, join_uri(base, &uri));
                }
                Err(err) => {
                    tracing::debug!(
                        target: "jre.repository",
                        key = %key,
                        error = %err,
                        "skipping index entry with invalid version"
                    );
                }
            }
        }
        Ok(index)
    }
}

impl ArtifactResolver for StaticIndex {
    fn find(&self, config: &JreConfig) -> Result<ResolvedArtifact> {
        self.resolve(&config.version)
    }
}

fn join_uri(base: &str, uri: &str) -> String {
    if uri.contains("://") || uri.starts_with('/') {
        uri.to_owned()
    } else {
        format!("{}/{uri}", base.trim_end_matches('/'))
    }
}

/// A repository index fetched from `<repository_root>/index.json`.
#[derive(Debug)]
pub struct RepositoryIndex<C> {
    cache: C,
    platform: String,
    architecture: String,
}

impl<C: ArtifactCache> RepositoryIndex<C> {
    /// An index for the host platform and architecture.
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            platform: std::env::consts::OS.to_owned(),
            architecture: std::env::consts::ARCH.to_owned(),
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>, architecture: impl Into<String>) -> Self {
        self.platform = platform.into();
        self.architecture = architecture.into();
        self
    }

    /// `repository_root` with `{platform}` and `{architecture}` substituted.
    pub fn expand_root(&self, repository_root: &str) -> String {
        repository_root
            .replace("{platform}", &self.platform)
            .replace("{architecture}", &self.architecture)
    }

    /// Fetch and parse the index under `repository_root`.
    pub fn load(&self, repository_root: &str) -> Result<StaticIndex> {
        let root = self.expand_root(repository_root);
        let uri = format!("{}/{INDEX_FILE_NAME}", root.trim_end_matches('/'));

        let artifact = self
            .cache
            .get(&uri)
            .map_err(|source| RepositoryError::IndexFetch {
                uri: sanitize_fetch_url(&uri),
                source,
            })?;
        let file = File::open(artifact.path()).map_err(|err| RepositoryError::IndexFetch {
            uri: sanitize_fetch_url(&uri),
            source: err.into(),
        })?;

        let index = StaticIndex::from_reader(BufReader::new(file), &root)?;
        tracing::debug!(
            target: "jre.repository",
            uri = %sanitize_fetch_url(&uri),
            entries = index.len(),
            "loaded repository index"
        );
        Ok(index)
    }
}

impl<C: ArtifactCache> ArtifactResolver for RepositoryIndex<C> {
    fn find(&self, config: &JreConfig) -> Result<ResolvedArtifact> {
        let root = config
            .repository_root
            .as_deref()
            .ok_or(RepositoryError::MissingRepositoryRoot)?;
        let resolved = self.load(root)?.resolve(&config.version)?;
        tracing::info!(
            target: "jre.repository",
            version = %resolved.version,
            uri = %sanitize_fetch_url(&resolved.uri),
            "resolved JRE"
        );
        Ok(resolved)
    }
}
