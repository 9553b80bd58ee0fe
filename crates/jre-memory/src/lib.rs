//! Memory quantities and platform memory limits for JRE provisioning.
//!
//! - [`MemorySize`] is an immutable byte count that parses and formats the
//!   `<integer><unit>` grammar accepted by JVM `-X` options.
//! - [`MemoryLimit`] reports the optional memory ceiling the platform imposes on
//!   the application process. It is injected into the provisioner rather than
//!   looked up globally, so tests can pin an exact budget.

mod cgroup;
mod limit;
mod size;

pub use cgroup::{parse_cgroup_memory_limit_bytes, parse_proc_self_cgroup, ProcSelfCgroup};
pub use limit::{
    detect_memory_limit, CgroupMemoryLimit, EnvMemoryLimit, FixedMemoryLimit, MemoryLimit,
    MEMORY_LIMIT_ENV_VAR,
};
pub use size::{MemorySize, MemorySizeError, GB, KB, MB, TB};
