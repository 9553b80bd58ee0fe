use std::ffi::OsString;
use std::sync::Mutex;

use jre_memory::{
    EnvMemoryLimit, FixedMemoryLimit, MemoryLimit, MemorySize, MemorySizeError,
    MEMORY_LIMIT_ENV_VAR,
};

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

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        std::env::remove_var(key);
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

#[test]
fn reads_platform_memory_limit_from_env() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");
    let _env = EnvVarGuard::set(MEMORY_LIMIT_ENV_VAR, "256m");

    let limit = EnvMemoryLimit::from_env().expect("valid MEMORY_LIMIT");
    assert_eq!(limit.current(), Some(MemorySize::from_mib(256)));
}

#[test]
fn unset_env_means_no_limit() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");
    let _env = EnvVarGuard::unset(MEMORY_LIMIT_ENV_VAR);

    let limit = EnvMemoryLimit::from_env().expect("unset MEMORY_LIMIT is valid");
    assert_eq!(limit.current(), None);
}

#[test]
fn malformed_limit_fails_fast() {
    assert!(matches!(
        EnvMemoryLimit::from_value(Some("-512m")),
        Err(MemorySizeError::Negative { .. })
    ));
    assert!(matches!(
        EnvMemoryLimit::from_value(Some("lots")),
        Err(MemorySizeError::InvalidNumber { .. })
    ));
    assert_eq!(
        EnvMemoryLimit::from_value(Some("   ")).unwrap().current(),
        None
    );
}

#[test]
fn fixed_limit_reports_what_it_was_given() {
    assert_eq!(FixedMemoryLimit::unlimited().current(), None);
    assert_eq!(
        FixedMemoryLimit::of(MemorySize::from_mib(512)).current(),
        Some(MemorySize::from_mib(512))
    );

    let boxed: Box<dyn MemoryLimit> = Box::new(FixedMemoryLimit::of(MemorySize::ZERO));
    assert_eq!(boxed.current(), Some(MemorySize::ZERO));
}

#[test]
fn sizes_deserialize_from_bytes_or_human_strings() {
    let from_int: MemorySize = serde_json::from_value(serde_json::json!(1024)).unwrap();
    assert_eq!(from_int, MemorySize::from_bytes(1024));

    let from_str: MemorySize = serde_json::from_value(serde_json::json!("1G")).unwrap();
    assert_eq!(from_str, MemorySize::from_mib(1024));

    assert!(serde_json::from_value::<MemorySize>(serde_json::json!("1Q")).is_err());
}
