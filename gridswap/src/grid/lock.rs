//! Exclusive lock on a grid directory.

use super::path::lock_path;
use crate::error::GridError;
use crate::log::Logger;
use crate::log_debug;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Holds the `lock` file of a grid directory; removes it on drop.
pub struct DirectoryLock {
    path: PathBuf,
    logger: Arc<dyn Logger>,
}

impl DirectoryLock {
    /// Create the lock file, failing with [`GridError::DirectoryLocked`]
    /// when it already exists.
    pub fn acquire(dir: &Path, logger: Arc<dyn Logger>) -> Result<Self, GridError> {
        Self::acquire_with(dir, logger, |file| writeln!(file, "{}", std::process::id()))
    }

    /// Create the lock file and let `write_owner` fill it in.
    ///
    /// The file is removed again if `write_owner` fails.
    fn acquire_with(
        dir: &Path,
        logger: Arc<dyn Logger>,
        write_owner: impl FnOnce(&mut File) -> io::Result<()>,
    ) -> Result<Self, GridError> {
        let path = lock_path(dir);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(GridError::DirectoryLocked(dir.to_path_buf()));
            }
            Err(e) => return Err(GridError::io(&path, e)),
        };
        let lock = Self { path, logger };
        write_owner(&mut file).map_err(|e| GridError::io(&lock.path, e))?;

        log_debug!(lock.logger, "Locked {}", dir.display());
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log_debug!(self.logger, "Released {}", self.path.display()),
            Err(e) => log_debug!(self.logger, "Lock {} not removed: {}", self.path.display(), e),
        }
    }
}
