use std::path::Path;

use jre_memory::{CgroupMemoryLimit, MemoryLimit, MemorySize};
use tempfile::tempdir;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn v2_limit_is_minimum_over_ancestors() {
    let dir = tempdir().unwrap();
    let proc_cgroup = dir.path().join("proc-self-cgroup");
    let sysfs = dir.path().join("sys-fs-cgroup");

    write(&proc_cgroup, "0::/outer/inner\n");
    write(&sysfs.join("outer/memory.max"), "536870912\n");
    write(&sysfs.join("outer/inner/memory.max"), "max\n");

    let limit = CgroupMemoryLimit::with_roots(&proc_cgroup, &sysfs);
    assert_eq!(limit.current(), Some(MemorySize::from_mib(512)));
}

#[test]
fn falls_back_to_v1_memory_controller() {
    let dir = tempdir().unwrap();
    let proc_cgroup = dir.path().join("proc-self-cgroup");
    let sysfs = dir.path().join("sys-fs-cgroup");

    write(&proc_cgroup, "4:memory:/garden/app\n3:cpu:/garden/app\n");
    write(
        &sysfs.join("memory/garden/app/memory.limit_in_bytes"),
        "1073741824\n",
    );

    let limit = CgroupMemoryLimit::with_roots(&proc_cgroup, &sysfs);
    assert_eq!(limit.current(), Some(MemorySize::from_mib(1024)));
}

#[test]
fn unlimited_or_missing_hierarchy_reports_no_limit() {
    let dir = tempdir().unwrap();
    let sysfs = dir.path().join("sys-fs-cgroup");

    let missing = CgroupMemoryLimit::with_roots(dir.path().join("does-not-exist"), &sysfs);
    assert_eq!(missing.current(), None);

    let proc_cgroup = dir.path().join("proc-self-cgroup");
    write(&proc_cgroup, "0::/\n");
    write(&sysfs.join("memory.max"), "max\n");
    let unlimited = CgroupMemoryLimit::with_roots(&proc_cgroup, &sysfs);
    assert_eq!(unlimited.current(), None);
}
