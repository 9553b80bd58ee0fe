//! Resolution of a configured JRE version to a downloadable artifact.

mod error;
mod index;

use jre_config::JreConfig;
use jre_version::Version;

pub use error::{RepositoryError, Result};
pub use index::{RepositoryIndex, StaticIndex, INDEX_FILE_NAME};

/// A concrete JRE selected from a repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub version: Version,
    pub uri: String,
}

/// Selects the JRE artifact satisfying a configuration.
pub trait ArtifactResolver {
    fn find(&self, config: &JreConfig) -> Result<ResolvedArtifact>;
}

impl<T: ArtifactResolver + ?Sized> ArtifactResolver for &T {
    fn find(&self, config: &JreConfig) -> Result<ResolvedArtifact> {
        (**self).find(config)
    }
}

impl<T: ArtifactResolver + ?Sized> ArtifactResolver for Box<T> {
    fn find(&self, config: &JreConfig) -> Result<ResolvedArtifact> {
        (**self).find(config)
    }
}
