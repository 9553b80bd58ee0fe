use std::ffi::OsString;
use std::fs;
use std::sync::Mutex;

use jre_config::JreConfig;
use jre_memory::MEMORY_LIMIT_ENV_VAR;
use jre_provision::{provision, ProvisionContext, ProvisionError};
use pretty_assertions::assert_eq;

use crate::suite::fixtures::Staging;

static ENV_LOCK: Mutex<()> = Mutex::new(());

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &str) -> Self {
        let prev = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

fn configure(staging: &Staging) -> JreConfig {
    fs::write(
        staging.repo.path().join("index.json"),
        r#"{"1.8.0_sr5fp10": "ibm-java-jre-8.0-5.10-x86_64.tgz", "1.7.1_sr3": "missing.tgz"}"#,
    )
    .unwrap();

    let text = format!(
        r#"
version = "1.8.+"
repository_root = "file://{repo}"

[cache]
root = "{cache}"

[diagnostics]
log_file_name = "staging.log"
"#,
        repo = staging.repo.path().display(),
        cache = staging.cache.path().display(),
    );
    JreConfig::load_from_str(&text).unwrap()
}

#[test]
fn provisions_from_a_repository_with_the_platform_budget() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let _memory = EnvVarGuard::set(MEMORY_LIMIT_ENV_VAR, "1G");

    let staging = Staging::new();
    let mut context = ProvisionContext::new(staging.app.path(), configure(&staging));

    let id = provision(&mut context).unwrap();

    assert_eq!(id, "ibmjdk-1.8.0_sr5fp10");
    assert_eq!(context.java_home, ".java");
    assert!(staging.app.path().join(".java/bin/java").is_file());
    let script =
        fs::read_to_string(staging.app.path().join(".buildpack-diagnostics/killjava.sh")).unwrap();
    assert!(script.contains("staging.log"), "{script}");
    assert_eq!(
        &context.java_opts[1..],
        &["-Xtune:virtualized".to_owned(), "-Xmx768M".to_owned()]
    );
}

#[test]
fn malformed_platform_budget_aborts_before_staging() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let _memory = EnvVarGuard::set(MEMORY_LIMIT_ENV_VAR, "-512m");

    let staging = Staging::new();
    let mut context = ProvisionContext::new(staging.app.path(), configure(&staging));

    let err = provision(&mut context).unwrap_err();
    assert!(matches!(err, ProvisionError::MemoryLimit { .. }), "{err}");
    assert!(context.java_home.is_empty());
    assert!(!staging.app.path().join(".java").exists());
}
