// ABOUTME: Filesystem capability used by snapshots and the artifact applier.
// ABOUTME: Abstracted behind a trait so failures can be injected in tests.

mod error;
mod local;

pub use error::{CopySnafu, FsError, FsErrorKind, WriteSnafu};
pub use local::LocalFs;

use std::path::Path;

/// Filesystem operations needed to snapshot, restore and overlay a site tree.
pub trait FileSystem: Send + Sync {
    /// Recursively copy the directory `from` into `to`, creating `to`.
    fn copy_tree(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Remove a file or a whole directory tree.
    fn remove_tree(&self, path: &Path) -> Result<(), FsError>;

    /// Write a file, replacing any existing content.
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FsError>;

    /// Create a directory and all missing parents.
    fn make_dirs(&self, path: &Path) -> Result<(), FsError>;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` itself is a symbolic link. Absent paths are not.
    fn is_symlink(&self, path: &Path) -> bool;

    /// Rename within the same filesystem.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;
}
