//! Advisory file lock for cross-process exclusion

use fs2::FileExt;
use std::fs::File;
use std::io;

/// Exclusive advisory lock on the backing file, released on drop
///
/// Locks belong to the open file description, so two threads sharing one
/// `File` do not exclude each other. Callers hold the in-process lock first.
pub(crate) struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    /// Block until the exclusive lock is held
    pub fn acquire(file: &'a File) -> io::Result<Self> {
        FileExt::lock_exclusive(file)?;
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.file);
    }
}
