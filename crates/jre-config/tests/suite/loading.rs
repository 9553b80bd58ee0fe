use std::path::PathBuf;

use jre_config::{ConfigError, JreConfig, LoggingConfig, DEFAULT_LOG_FILE_NAME};
use jre_version::VersionPattern;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[test]
fn empty_config_uses_defaults() {
    let config = JreConfig::load_from_str("").expect("empty config should parse");

    assert_eq!(config.version, VersionPattern::any());
    assert_eq!(config.repository_root, None);
    assert_eq!(config.memory_heuristics, None);
    assert!(!config.cache.offline);
    assert_eq!(config.diagnostics.log_file_name, DEFAULT_LOG_FILE_NAME);
    assert_eq!(config.diagnostics.killjava_template, None);
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn full_config_round_trips_every_section() {
    let text = r#"
version = "1.8.+"
repository_root = "https://repo.example.com/ibm-jre/{platform}/{architecture}"

[memory_heuristics]
heap = 75
stack = 5

[cache]
root = "/tmp/jre-cache"
offline = true

[diagnostics]
log_file_name = "staging.log"
killjava_template = "/opt/templates/killjava.sh"

[logging]
level = "debug"
json = true
stderr = false
"#;

    let config = JreConfig::load_from_str(text).expect("config should parse");

    assert_eq!(config.version, "1.8.+".parse::<VersionPattern>().unwrap());
    assert_eq!(
        config.repository_root.as_deref(),
        Some("https://repo.example.com/ibm-jre/{platform}/{architecture}")
    );
    let heuristics = config.memory_heuristics.expect("memory_heuristics table");
    assert_eq!(heuristics.len(), 2);
    assert_eq!(config.cache.root, Some(PathBuf::from("/tmp/jre-cache")));
    assert!(config.cache.offline);
    assert_eq!(config.diagnostics.log_file_name, "staging.log");
    assert_eq!(
        config.diagnostics.killjava_template,
        Some(PathBuf::from("/opt/templates/killjava.sh"))
    );
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert!(!config.logging.stderr);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = JreConfig::load_from_str("[cache]\nretention = 3\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err}");
}

#[test]
fn invalid_version_pattern_is_rejected() {
    let err = JreConfig::load_from_str("version = \"1.+.0\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err}");
}

#[test]
fn loads_from_path_and_reports_missing_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ibmjdk.toml");
    std::fs::write(&path, "version = \"1.7.1\"\n").unwrap();

    let config = JreConfig::load_from_path(&path).expect("config file should load");
    assert_eq!(config.version.to_string(), "1.7.1");

    let err = JreConfig::load_from_path(dir.path().join("missing.toml")).unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert!(path.ends_with("missing.toml")),
        other => panic!("unexpected error: {other:?}"),
    }
}
