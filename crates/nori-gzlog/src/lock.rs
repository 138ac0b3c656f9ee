//! Exclusive advisory file locks.

use fs2::FileExt;
use std::fs::File;
use std::io;

/// Holds an exclusive advisory lock on a file until dropped (`flock` on unix).
///
/// Acquisition blocks with no timeout. The lock belongs to the open file
/// description, so two independent opens of the same path contend even
/// within one process.
pub struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    /// Blocks until the exclusive lock on `file` is granted.
    pub fn acquire(file: &'a File) -> io::Result<Self> {
        FileExt::lock_exclusive(file)?;
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock anyway.
        let _ = FileExt::unlock(self.file);
    }
}
