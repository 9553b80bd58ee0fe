//! Configuration for the JRE provisioning component.
//!
//! The configuration is a TOML document, typically shipped alongside the
//! buildpack and optionally overridden per application:
//!
//! ```toml
//! version = "1.8.+"
//! repository_root = "https://repo.example.com/ibm-jre/{platform}/{architecture}"
//!
//! [cache]
//! offline = false
//!
//! [diagnostics]
//! log_file_name = "buildpack.log"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use jre_version::VersionPattern;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod logging;

pub use logging::{init_tracing, LoggingConfig};

/// Default name of the buildpack diagnostics log referenced by the OOM script.
pub const DEFAULT_LOG_FILE_NAME: &str = "buildpack.log";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Override the artifact cache directory.
    ///
    /// When unset, `JRE_CACHE_DIR` is consulted, then `$HOME/.jre-buildpack/cache`.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Never contact remote stores; only artifacts already in the cache are served.
    #[serde(default)]
    pub offline: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Log file name substituted into the out-of-memory recovery script.
    #[serde(default = "DiagnosticsConfig::default_log_file_name")]
    pub log_file_name: String,

    /// Replace the bundled `killjava.sh` template with the file at this path.
    #[serde(default)]
    pub killjava_template: Option<PathBuf>,
}

impl DiagnosticsConfig {
    fn default_log_file_name() -> String {
        DEFAULT_LOG_FILE_NAME.to_owned()
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_file_name: Self::default_log_file_name(),
            killjava_template: None,
        }
    }
}

/// Resolved configuration for one JRE provider.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JreConfig {
    /// Version requirement, e.g. `1.8.+`. Defaults to the newest indexed version.
    #[serde(default)]
    pub version: VersionPattern,

    /// Root URI of the artifact repository; `{platform}` and `{architecture}`
    /// are substituted before use.
    #[serde(default)]
    pub repository_root: Option<String>,

    /// Memory heuristics shared with other JRE providers.
    ///
    /// Accepted so one configuration can serve every provider; the IBM JRE
    /// heuristics are fixed and do not read it.
    #[serde(default)]
    pub memory_heuristics: Option<toml::Table>,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` includes a source snippet, which can leak credentials embedded in
        // `repository_root`. Keep the message only.
        ConfigError::Toml(sanitize_toml_error_message(err.message()))
    }
}

fn sanitize_toml_error_message(message: &str) -> String {
    // Messages can still quote scalar values, e.g. `invalid type: string "secret"`.
    static QUOTED_STRING_RE: OnceLock<regex::Regex> = OnceLock::new();

    let re = QUOTED_STRING_RE.get_or_init(|| {
        regex::Regex::new(r#""(?:\\.|[^"\\])*""#).expect("quoted-string regex should compile")
    });
    re.replace_all(message, r#""<redacted>""#).into_owned()
}

impl JreConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// Load a config from a TOML string.
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: JreConfig = toml::from_str(text)?;
        if let Some(heuristics) = &config.memory_heuristics {
            tracing::debug!(
                target: "jre.config",
                keys = ?heuristics.keys().collect::<Vec<_>>(),
                "memory_heuristics present; IBM JRE heuristics are fixed and ignore it"
            );
        }
        Ok(config)
    }
}
