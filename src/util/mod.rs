//! Internal utility functions and helpers.
//!
//! Small filesystem helpers. Not part of the public API.

use std::fs::File;
use std::io;
use std::path::Path;

/// Flushes a directory entry table so a preceding rename survives a crash.
pub(crate) fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fsync_dir() {
        let dir = tempfile::tempdir().unwrap();
        fsync_dir(dir.path()).unwrap();
        assert!(fsync_dir(&dir.path().join("missing")).is_err());
    }
}
