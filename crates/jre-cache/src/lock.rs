use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use fs2::FileExt as _;

use crate::error::CacheError;

/// Exclusive ownership of one cache entry, across threads and processes.
///
/// Staging processes sharing a cache root coordinate through an `fs2` lock on
/// the entry's `.lock` file. `flock`-style locks do not exclude threads of the
/// same process, so a per-path in-process mutex is held as well.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    _thread_guard: MutexGuard<'static, ()>,
}

impl CacheLock {
    /// Blocks until the lock at `path` is held, creating the lockfile if needed.
    pub fn lock_exclusive(path: &Path) -> Result<Self, CacheError> {
        let thread_guard = in_process_lock(path)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;

        Ok(Self {
            file,
            _thread_guard: thread_guard,
        })
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// One mutex per lockfile path, alive for the rest of the process.
fn in_process_lock(path: &Path) -> &'static Mutex<()> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();

    let mut locks = LOCKS
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *locks
        .entry(path.to_path_buf())
        .or_insert_with(|| &*Box::leak(Box::new(Mutex::new(()))))
}
