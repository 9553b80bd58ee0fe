use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Parsed cgroup paths from `/proc/self/cgroup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcSelfCgroup {
    /// cgroup v2 unified hierarchy entry (e.g. `0::/some/path`).
    pub v2_path: Option<String>,
    /// cgroup v1 memory controller entry (e.g. `5:memory:/some/path`).
    pub v1_memory_path: Option<String>,
}

/// Parse `/proc/self/cgroup` contents and extract the memory-relevant paths.
pub fn parse_proc_self_cgroup(contents: &str) -> ProcSelfCgroup {
    let mut v2_path = None;
    let mut v1_memory_path = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(3, ':');
        let (Some(hierarchy_id), Some(controllers), Some(path)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let path = path.trim();

        if v2_path.is_none() && hierarchy_id == "0" && controllers.is_empty() && !path.is_empty() {
            v2_path = Some(path.to_string());
        }

        if v1_memory_path.is_none()
            && controllers
                .split(',')
                .any(|controller| controller.trim() == "memory")
        {
            v1_memory_path = Some(path.to_string());
        }
    }

    ProcSelfCgroup {
        v2_path,
        v1_memory_path,
    }
}

const UNLIMITED_THRESHOLD_BYTES: u64 = 1 << 60; // 1 EiB; above this is treated as "unlimited".

/// Parse a cgroup memory limit value.
///
/// - cgroup v2: `memory.max` is either `max` or a byte count.
/// - cgroup v1: `memory.limit_in_bytes` is a byte count, with very large values
///   commonly used to represent "no limit".
///
/// Returns `None` for unlimited/unknown values.
pub fn parse_cgroup_memory_limit_bytes(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "max" {
        return None;
    }

    let value = match raw.parse::<u64>() {
        Ok(value) => value,
        Err(err) => {
            static REPORTED_PARSE_ERROR: OnceLock<()> = OnceLock::new();
            if REPORTED_PARSE_ERROR.set(()).is_ok() {
                tracing::debug!(
                    target: "jre.memory",
                    raw,
                    error = %err,
                    "failed to parse cgroup memory limit value"
                );
            }
            return None;
        }
    };
    if value >= UNLIMITED_THRESHOLD_BYTES {
        return None;
    }

    Some(value)
}

fn read_trimmed(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text.trim().to_string()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            static REPORTED_READ_ERROR: OnceLock<()> = OnceLock::new();
            if REPORTED_READ_ERROR.set(()).is_ok() {
                tracing::debug!(
                    target: "jre.memory",
                    path = %path.display(),
                    error = %err,
                    "failed to read cgroup file"
                );
            }
            None
        }
    }
}

/// The tightest limit configured on `cgroup_path` or any of its ancestors.
fn effective_limit_from_ancestors(
    mount: &Path,
    cgroup_path: &str,
    limit_filename: &str,
) -> Option<u64> {
    let mut rel = PathBuf::from(cgroup_path.trim_start_matches('/'));
    let mut best: Option<u64> = None;

    loop {
        let candidate = mount.join(&rel).join(limit_filename);
        if let Some(limit) = read_trimmed(&candidate)
            .as_deref()
            .and_then(parse_cgroup_memory_limit_bytes)
        {
            best = Some(best.map_or(limit, |best| best.min(limit)));
        }

        if !rel.pop() {
            break;
        }
    }

    best
}

/// Read the memory limit of the current process from cgroup files.
///
/// `proc_self_cgroup` is normally `/proc/self/cgroup` and `sysfs_root`
/// `/sys/fs/cgroup`; both are parameters so detection can run against a fake
/// hierarchy.
pub(crate) fn cgroup_memory_limit_bytes(proc_self_cgroup: &Path, sysfs_root: &Path) -> Option<u64> {
    let contents = match std::fs::read_to_string(proc_self_cgroup) {
        Ok(contents) => contents,
        Err(err) => {
            // `/proc` is missing on non-Linux hosts and in some sandboxes.
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target: "jre.memory",
                    path = %proc_self_cgroup.display(),
                    error = %err,
                    "failed to read cgroup membership while probing memory limit"
                );
            }
            return None;
        }
    };
    let parsed = parse_proc_self_cgroup(&contents);

    if let Some(path) = &parsed.v2_path {
        if let Some(limit) = effective_limit_from_ancestors(sysfs_root, path, "memory.max") {
            return Some(limit);
        }
    }

    if let Some(path) = &parsed.v1_memory_path {
        if let Some(limit) = effective_limit_from_ancestors(
            &sysfs_root.join("memory"),
            path,
            "memory.limit_in_bytes",
        ) {
            return Some(limit);
        }
    }

    None
}
