use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use jre_cache::{sanitize_fetch_url, ApplicationCache, ArtifactCache, CacheConfig};
use jre_config::JreConfig;
use jre_memory::{detect_memory_limit, MemoryLimit};
use jre_repository::{ArtifactResolver, RepositoryIndex};
use jre_version::Version;

use crate::diagnostics::{install_killjava, killjava_relative_path};
use crate::error::{ProvisionError, Result};
use crate::heuristics::memory_opts;

/// Runtime family reported by [`IbmJdk::detect`].
pub const FAMILY: &str = "ibmjdk";

/// Runtime home, relative to the application directory.
pub const JAVA_HOME: &str = ".java";

/// State shared by every component staging one application.
#[derive(Clone, Debug, Default)]
pub struct ProvisionContext {
    pub app_dir: PathBuf,
    /// Runtime home relative to `app_dir`, filled in once a runtime is selected.
    pub java_home: String,
    /// Launch options; components only ever append.
    pub java_opts: Vec<String>,
    pub configuration: JreConfig,
}

impl ProvisionContext {
    pub fn new(app_dir: impl Into<PathBuf>, configuration: JreConfig) -> Self {
        Self {
            app_dir: app_dir.into(),
            java_home: String::new(),
            java_opts: Vec::new(),
            configuration,
        }
    }
}

/// Services the provisioner depends on.
pub struct Collaborators {
    pub resolver: Box<dyn ArtifactResolver>,
    pub cache: Box<dyn ArtifactCache>,
    pub memory_limit: Box<dyn MemoryLimit>,
}

impl Collaborators {
    /// The production wiring: a repository index and downloads through the
    /// on-disk application cache, with the budget from `MEMORY_LIMIT` or cgroups.
    pub fn from_config(config: &JreConfig) -> Result<Self> {
        let cache_config = CacheConfig {
            cache_root_override: config
                .cache
                .root
                .clone()
                .or_else(|| CacheConfig::from_env().cache_root_override),
            offline: config.cache.offline,
        };
        let cache = ApplicationCache::from_config(&cache_config)
            .map_err(|source| ProvisionError::CacheSetup { source })?;
        let memory_limit =
            detect_memory_limit().map_err(|source| ProvisionError::MemoryLimit { source })?;

        Ok(Self {
            resolver: Box::new(RepositoryIndex::new(cache.clone())),
            cache: Box::new(cache),
            memory_limit: Box::new(memory_limit),
        })
    }
}

/// Proof that [`IbmJdk::compile`] finished; required by [`IbmJdk::release`].
#[derive(Debug)]
#[must_use = "pass the compile token to `release`"]
pub struct Compiled {
    issuer: u64,
    java_home: PathBuf,
    killjava: PathBuf,
}

impl Compiled {
    pub fn java_home(&self) -> &Path {
        &self.java_home
    }

    pub fn killjava(&self) -> &Path {
        &self.killjava
    }
}

/// Provisions an IBM JRE into an application.
///
/// The runtime is selected once, at construction; `detect`, `compile` and
/// `release` all observe that selection.
pub struct IbmJdk<'ctx> {
    context: &'ctx mut ProvisionContext,
    version: Version,
    uri: String,
    cache: Box<dyn ArtifactCache>,
    memory_limit: Box<dyn MemoryLimit>,
    /// Identifies the [`Compiled`] tokens this instance issued.
    id: u64,
}

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(0);

impl<'ctx> IbmJdk<'ctx> {
    /// Selects the runtime for `context`.
    ///
    /// On failure the context is left untouched.
    pub fn new(context: &'ctx mut ProvisionContext, collaborators: Collaborators) -> Result<Self> {
        let Collaborators {
            resolver,
            cache,
            memory_limit,
        } = collaborators;

        let resolved = resolver
            .find(&context.configuration)
            .map_err(|source| ProvisionError::RuntimeSelection { source })?;

        context.java_home.push_str(JAVA_HOME);

        Ok(Self {
            context,
            version: resolved.version,
            uri: resolved.uri,
            cache,
            memory_limit,
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Absolute path of the runtime home.
    pub fn java_home(&self) -> PathBuf {
        self.context.app_dir.join(JAVA_HOME)
    }

    /// `ibmjdk-<version>`.
    pub fn detect(&self) -> String {
        format!("{FAMILY}-{}", self.version)
    }

    /// Downloads and expands the runtime into a fresh `.java` directory and
    /// installs the out-of-memory recovery script.
    pub fn compile(&self) -> Result<Compiled> {
        let safe_uri = sanitize_fetch_url(&self.uri);

        let started = Instant::now();
        let artifact = self
            .cache
            .get(&self.uri)
            .map_err(|source| ProvisionError::ArtifactFetch {
                uri: safe_uri.clone(),
                source,
            })?;
        tracing::info!(
            target: "jre.provision",
            version = %self.version,
            uri = %safe_uri,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "downloaded IBM JRE"
        );

        let java_home = self.java_home();
        reset_directory(&java_home)?;

        let started = Instant::now();
        let summary = jre_archive::extract(artifact.path(), &java_home, 1).map_err(|source| {
            ProvisionError::Extraction {
                archive: safe_uri.clone(),
                source,
            }
        })?;
        drop(artifact);
        tracing::info!(
            target: "jre.provision",
            java_home = %java_home.display(),
            files = summary.files,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "expanded IBM JRE"
        );

        let killjava = install_killjava(&self.context.app_dir, &self.context.configuration.diagnostics)?;

        Ok(Compiled {
            issuer: self.id,
            java_home,
            killjava,
        })
    }

    /// Appends the out-of-memory hook and the memory flags to the launch options.
    ///
    /// `compiled` must come from this instance's [`IbmJdk::compile`]; a token
    /// issued by another instance is rejected and nothing is appended.
    pub fn release(&mut self, compiled: Compiled) -> Result<()> {
        if compiled.issuer != self.id {
            return Err(ProvisionError::ForeignCompileToken {
                java_home: compiled.java_home,
            });
        }

        let budget = self.memory_limit.current();
        let mut opts = vec![oom_dump_option()];
        opts.extend(memory_opts(budget));

        tracing::debug!(
            target: "jre.provision",
            killjava = %compiled.killjava.display(),
            budget = ?budget.map(|budget| budget.to_string()),
            opts = ?opts,
            "appending launch options"
        );
        self.context.java_opts.extend(opts);
        Ok(())
    }
}

/// The `-Xdump` agent running the recovery script on `OutOfMemoryError`.
pub fn oom_dump_option() -> String {
    format!(
        "-Xdump:tool:events=systhrow,filter=java/lang/OutOfMemoryError,request=serial+exclusive,exec={}",
        killjava_relative_path()
    )
}

/// Removes whatever is at `dir` and recreates it empty.
fn reset_directory(dir: &Path) -> Result<()> {
    match fs::symlink_metadata(dir) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(dir).map_err(ProvisionError::filesystem(dir))?;
        }
        Ok(_) => fs::remove_file(dir).map_err(ProvisionError::filesystem(dir))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ProvisionError::filesystem(dir)(err)),
    }
    fs::create_dir_all(dir).map_err(ProvisionError::filesystem(dir))
}
