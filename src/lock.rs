//! Per-repository mutual exclusion.
//!
//! Every git-mutating operation on a repository runs while holding a
//! [`RepoLock`]: an advisory exclusive lock on
//! `<repos_root>/.locks/<id>.lock`. The lock file lives outside the working
//! directory so it can be taken before a clone creates that directory.
//!
//! Locks are per open file description, so two threads of one process and
//! two separate `lime-dev` invocations exclude each other alike. The lock is
//! released when the guard is dropped.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::debug;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct RepoLock {
    file: File,
    path: PathBuf,
}

impl RepoLock {
    /// Take the lock for `id` without waiting.
    ///
    /// Returns `Error::RepositoryLocked` when another holder exists.
    pub fn acquire(locks_dir: &Path, id: &str) -> Result<Self> {
        fs::create_dir_all(locks_dir)?;
        let path = locks_dir.join(format!("{}.lock", id));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Locked {}", path.display());
                Ok(Self { file, path })
            }
            Err(e) if is_contended(&e) => Err(Error::RepositoryLocked {
                id: id.to_string(),
                path: path.display().to_string(),
            }),
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!("Unlocked {}", self.path.display());
    }
}
