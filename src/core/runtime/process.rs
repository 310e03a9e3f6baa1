use std::{
    fs::{self, File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use fs2::FileExt;

use crate::core::git::state_dir;

/// Lock file guarding a repository against a second autocommit process.
#[must_use]
pub fn lock_file(git_dir: &Path) -> PathBuf {
    state_dir(git_dir).join("autocommit.lock")
}

/// Holds the repository lock; releases it and clears the PID on drop.
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = FileExt::unlock(&self.file);
    }
}

/// Take the per-repository lock and record the current PID in it.
///
/// # Errors
/// Returns an error if another process holds the lock or the file cannot be written.
pub fn acquire_lock(git_dir: &Path) -> Result<LockGuard> {
    let path = lock_file(git_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to open lock file {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
        let mut holder = String::new();
        let _ = file.read_to_string(&mut holder);
        let holder = holder.trim();
        if holder.is_empty() {
            bail!("autocommit is already running for this repository");
        }
        bail!("autocommit is already running for this repository (pid {holder})");
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.flush()?;

    Ok(LockGuard { file })
}
