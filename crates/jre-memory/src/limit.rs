use std::path::PathBuf;

use crate::cgroup::cgroup_memory_limit_bytes;
use crate::size::{MemorySize, MemorySizeError};

/// Environment variable the platform uses to publish the application's memory limit.
pub const MEMORY_LIMIT_ENV_VAR: &str = "MEMORY_LIMIT";

/// Source of the memory ceiling imposed on the application process.
pub trait MemoryLimit {
    /// The current limit, or `None` when the platform imposes no ceiling.
    fn current(&self) -> Option<MemorySize>;
}

/// A limit pinned at construction time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedMemoryLimit(pub Option<MemorySize>);

impl FixedMemoryLimit {
    #[must_use]
    pub const fn unlimited() -> Self {
        Self(None)
    }

    #[must_use]
    pub const fn of(limit: MemorySize) -> Self {
        Self(Some(limit))
    }
}

impl MemoryLimit for FixedMemoryLimit {
    fn current(&self) -> Option<MemorySize> {
        self.0
    }
}

/// The limit published through [`MEMORY_LIMIT_ENV_VAR`] (e.g. `MEMORY_LIMIT=512m`).
///
/// The variable is read once; a malformed value is rejected up front rather
/// than silently treated as "no limit".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvMemoryLimit {
    limit: Option<MemorySize>,
}

impl EnvMemoryLimit {
    pub fn from_env() -> Result<Self, MemorySizeError> {
        Self::from_value(std::env::var(MEMORY_LIMIT_ENV_VAR).ok().as_deref())
    }

    /// Builds the limit from a raw variable value; `None` and blank values mean "unset".
    pub fn from_value(raw: Option<&str>) -> Result<Self, MemorySizeError> {
        let limit = match raw.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<MemorySize>()?),
        };
        Ok(Self { limit })
    }
}

impl MemoryLimit for EnvMemoryLimit {
    fn current(&self) -> Option<MemorySize> {
        self.limit
    }
}

/// The limit enforced by the process' memory cgroup, re-read on every call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CgroupMemoryLimit {
    proc_self_cgroup: PathBuf,
    sysfs_root: PathBuf,
}

impl CgroupMemoryLimit {
    #[must_use]
    pub fn system() -> Self {
        Self::with_roots("/proc/self/cgroup", "/sys/fs/cgroup")
    }

    #[must_use]
    pub fn with_roots(proc_self_cgroup: impl Into<PathBuf>, sysfs_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_self_cgroup: proc_self_cgroup.into(),
            sysfs_root: sysfs_root.into(),
        }
    }
}

impl Default for CgroupMemoryLimit {
    fn default() -> Self {
        Self::system()
    }
}

impl MemoryLimit for CgroupMemoryLimit {
    fn current(&self) -> Option<MemorySize> {
        cgroup_memory_limit_bytes(&self.proc_self_cgroup, &self.sysfs_root)
            .map(MemorySize::from_bytes)
    }
}

/// Resolve the effective limit for this process: `MEMORY_LIMIT` first, then cgroups.
pub fn detect_memory_limit() -> Result<FixedMemoryLimit, MemorySizeError> {
    let env = EnvMemoryLimit::from_env()?;
    if let Some(limit) = env.current() {
        tracing::debug!(target: "jre.memory", %limit, "memory limit from environment");
        return Ok(FixedMemoryLimit::of(limit));
    }

    let cgroup = CgroupMemoryLimit::system().current();
    match cgroup {
        Some(limit) => tracing::debug!(target: "jre.memory", %limit, "memory limit from cgroup"),
        None => tracing::debug!(target: "jre.memory", "no memory limit detected"),
    }
    Ok(FixedMemoryLimit(cgroup))
}

impl<T: MemoryLimit + ?Sized> MemoryLimit for &T {
    fn current(&self) -> Option<MemorySize> {
        (**self).current()
    }
}

impl<T: MemoryLimit + ?Sized> MemoryLimit for Box<T> {
    fn current(&self) -> Option<MemorySize> {
        (**self).current()
    }
}
