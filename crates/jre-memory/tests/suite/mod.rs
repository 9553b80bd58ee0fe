mod cgroup_limit;
mod env_limit;
